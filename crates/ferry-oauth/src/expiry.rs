//! Token expiry classification.

use chrono::{DateTime, TimeDelta, Utc};

/// How long before expiry a token is proactively refreshed.
pub const REFRESH_SKEW_SECS: i64 = 5 * 60;

/// Where a token sits relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Expires later than the skew window.
    Valid,
    /// Still usable but inside the skew window.
    ExpiringSoon,
    /// Expiry is in the past.
    Expired,
    /// No expiry information; treated as not needing refresh.
    Unknown,
}

impl TokenState {
    /// Classify `expires_at` against `now` with the given skew.
    pub fn classify(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, skew: TimeDelta) -> Self {
        match expires_at {
            None => TokenState::Unknown,
            Some(at) if at < now => TokenState::Expired,
            Some(at) if at < now + skew => TokenState::ExpiringSoon,
            Some(_) => TokenState::Valid,
        }
    }

    pub fn needs_refresh(self) -> bool {
        matches!(self, TokenState::ExpiringSoon | TokenState::Expired)
    }

    pub fn is_expired(self) -> bool {
        self == TokenState::Expired
    }
}

/// The default skew as a `TimeDelta`.
pub fn default_skew() -> TimeDelta {
    TimeDelta::seconds(REFRESH_SKEW_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let now = Utc::now();
        let skew = default_skew();

        assert_eq!(TokenState::classify(None, now, skew), TokenState::Unknown);
        assert_eq!(
            TokenState::classify(Some(now - TimeDelta::seconds(1)), now, skew),
            TokenState::Expired
        );
        assert_eq!(
            TokenState::classify(Some(now + TimeDelta::seconds(60)), now, skew),
            TokenState::ExpiringSoon
        );
        assert_eq!(
            TokenState::classify(Some(now + TimeDelta::minutes(10)), now, skew),
            TokenState::Valid
        );
    }

    #[test]
    fn test_needs_refresh() {
        assert!(TokenState::Expired.needs_refresh());
        assert!(TokenState::ExpiringSoon.needs_refresh());
        assert!(!TokenState::Valid.needs_refresh());
        assert!(!TokenState::Unknown.needs_refresh());
        assert!(TokenState::Expired.is_expired());
        assert!(!TokenState::ExpiringSoon.is_expired());
    }
}
