//! Show command - resolved configuration with provenance.

use anyhow::Result;
use chrono::{DateTime, Utc};
use console::{Style, style};
use ferry_config::{Field, Metadata, RuntimeConfig, ValueSource};
use serde::Serialize;
use serde_json::Value;

use super::{Context, redact};

const SECRET_FIELDS: [Field; 2] = [Field::ApiKey, Field::TavilyApiKey];

/// One config field for display.
#[derive(Debug, Serialize)]
struct FieldRow {
    field: &'static str,
    value: Value,
    source: ValueSource,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    loaded_at: DateTime<Utc>,
    fields: Vec<FieldRow>,
}

/// Run `show`, or `sources` when `changed_only` is set.
pub async fn run(ctx: &Context, changed_only: bool) -> Result<()> {
    let (config, metadata) = ctx.load().await?;
    let rows = field_rows(&config, &metadata, changed_only)?;

    if ctx.json_output {
        let output = ShowOutput {
            loaded_at: metadata.loaded_at(),
            fields: rows,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let title = if changed_only {
        "Configuration Sources"
    } else {
        "Resolved Configuration"
    };

    println!();
    println!("{}", style(title).bold());
    println!("{}", dim.apply_to("─".repeat(60)));
    if rows.is_empty() {
        println!("  {}", dim.apply_to("every value is a default"));
    }
    for row in &rows {
        println!(
            "  {:<44} {} {}",
            row.field,
            source_style(row.source).apply_to(format!("{:<16}", row.source.as_str())),
            display_value(&row.value)
        );
    }
    if ctx.verbose {
        println!();
        println!("  {} {}", dim.apply_to("Loaded at:"), metadata.loaded_at());
    }
    println!();

    Ok(())
}

/// Every tracked field in declaration order, with secrets redacted.
fn field_rows(
    config: &RuntimeConfig,
    metadata: &Metadata,
    changed_only: bool,
) -> Result<Vec<FieldRow>> {
    let tree = serde_json::to_value(config)?;
    let rows = Field::ALL
        .iter()
        .copied()
        .map(|field| (field, metadata.source(field)))
        .filter(|(_, source)| !changed_only || *source != ValueSource::Default)
        .map(|(field, source)| {
            let mut value = lookup(&tree, field.as_str()).cloned().unwrap_or(Value::Null);
            if SECRET_FIELDS.contains(&field)
                && let Value::String(secret) = &value
            {
                value = Value::String(redact(secret));
            }
            FieldRow {
                field: field.as_str(),
                value,
                source,
            }
        })
        .collect();
    Ok(rows)
}

/// Walk a dotted field name through the serialized config.
fn lookup<'a>(tree: &'a Value, name: &str) -> Option<&'a Value> {
    name.split('.').try_fold(tree, |node, key| node.get(key))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => "\"\"".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn source_style(source: ValueSource) -> Style {
    match source {
        ValueSource::Default => Style::new().dim(),
        ValueSource::File => Style::new().cyan(),
        ValueSource::Environment => Style::new().yellow(),
        ValueSource::Override => Style::new().magenta(),
        _ => Style::new().green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_nested() {
        let tree = serde_json::json!({"browser": {"connector": "cdp"}, "max_tokens": 10});
        assert_eq!(lookup(&tree, "browser.connector"), Some(&Value::from("cdp")));
        assert_eq!(lookup(&tree, "max_tokens"), Some(&Value::from(10)));
        assert_eq!(lookup(&tree, "browser.missing"), None);
    }

    #[test]
    fn test_rows_cover_every_field_and_redact() {
        let config = RuntimeConfig {
            api_key: "sk-live-0123456789".to_string(),
            ..RuntimeConfig::default()
        };
        let rows = field_rows(&config, &Metadata::default(), false).unwrap();
        assert_eq!(rows.len(), Field::ALL.len());
        assert!(rows.iter().all(|row| row.value != Value::Null));

        let key = rows.iter().find(|row| row.field == "api_key").unwrap();
        assert_eq!(key.value, Value::from("sk-l…(18 chars)"));

        let changed = field_rows(&config, &Metadata::default(), true).unwrap();
        assert!(changed.is_empty());
    }
}
