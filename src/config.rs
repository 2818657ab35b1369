//! Session configuration

use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Currency all cart prices are denominated in.
    pub currency: String,
    /// Quiet period before local changes are written back. A new change
    /// within the window restarts it.
    pub debounce: Duration,
    /// Read the snapshot back after each save and log a mismatch.
    pub verify_writes: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            verify_writes: false,
        }
    }
}

impl SyncConfig {
    /// Build from `CART_CURRENCY`, `CART_SYNC_DEBOUNCE_MS` and
    /// `CART_SYNC_VERIFY`, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            currency: std::env::var("CART_CURRENCY").unwrap_or(defaults.currency),
            debounce: std::env::var("CART_SYNC_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            verify_writes: std::env::var("CART_SYNC_VERIFY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.verify_writes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SyncConfig::default();
        assert_eq!(config.currency, "USD");
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert!(!config.verify_writes);
    }
}
