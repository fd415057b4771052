//! The explicit configuration layers, lowest precedence first: file,
//! environment, caller overrides.
//!
//! Each layer writes through a [`Writer`], which records the layer's
//! [`ValueSource`] for every field it touches.

pub mod environment;
pub mod file;
pub mod overrides;

use crate::source::{Field, Metadata, ValueSource};
use crate::types::RuntimeConfig;

/// Writes values into a [`RuntimeConfig`] and records their provenance.
pub(crate) struct Writer<'a> {
    config: &'a mut RuntimeConfig,
    meta: &'a mut Metadata,
    source: ValueSource,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(
        config: &'a mut RuntimeConfig,
        meta: &'a mut Metadata,
        source: ValueSource,
    ) -> Self {
        Self {
            config,
            meta,
            source,
        }
    }

    /// Store `value` in the slot chosen by `slot`. `None` is a no-op and
    /// leaves provenance untouched.
    pub(crate) fn set<T>(
        &mut self,
        field: Field,
        value: Option<T>,
        slot: fn(&mut RuntimeConfig) -> &mut T,
    ) {
        if let Some(value) = value {
            *slot(self.config) = value;
            self.meta.record(field, self.source);
        }
    }

    /// `temperature` carries a companion flag that says it was set at all.
    pub(crate) fn set_temperature(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.config.temperature = value;
            self.config.temperature_provided = true;
            self.meta.record(Field::Temperature, self.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_records_only_written_fields() {
        let mut config = RuntimeConfig::default();
        let mut meta = Metadata::default();
        {
            let mut w = Writer::new(&mut config, &mut meta, ValueSource::File);
            w.set(Field::LlmModel, Some("m".to_string()), |c| &mut c.llm_model);
            w.set(Field::MaxTokens, None, |c| &mut c.max_tokens);
            w.set_temperature(Some(0.1));
        }
        assert_eq!(config.llm_model, "m");
        assert_eq!(config.max_tokens, 8192);
        assert!(config.temperature_provided);
        assert_eq!(meta.source(Field::LlmModel), ValueSource::File);
        assert_eq!(meta.source(Field::MaxTokens), ValueSource::Default);
        assert_eq!(meta.source(Field::Temperature), ValueSource::File);
    }
}
