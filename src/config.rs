//! Facilitator service configuration.
//!
//! All options come from the environment, loaded after `.env`:
//! - `HOST`, `PORT` — bind address (default `0.0.0.0:8402`),
//! - `WAIT_FOR_FINALIZATION` — settle synchronously until the transfer's
//!   block is finalized (default `false`, fire-and-forget),
//! - `SETTLE_TIMEOUT_SECONDS` — upper bound on the finalization watch
//!   (default `60`).
//!
//! RPC endpoint overrides are read separately by
//! [`crate::provider_cache::ChainClientCache::from_env`].

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use crate::facilitator_local::SettleOptions;

const ENV_HOST: &str = "HOST";
const ENV_PORT: &str = "PORT";
const ENV_WAIT_FOR_FINALIZATION: &str = "WAIT_FOR_FINALIZATION";
const ENV_SETTLE_TIMEOUT_SECONDS: &str = "SETTLE_TIMEOUT_SECONDS";

const DEFAULT_PORT: u16 = 8402;

/// Errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Runtime configuration of the facilitator service.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub settle: SettleOptions,
}

impl Config {
    /// Load configuration from the environment, using defaults for anything
    /// unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match env::var(ENV_HOST) {
            Ok(value) => value.parse::<IpAddr>().map_err(|_| ConfigError {
                var: ENV_HOST,
                value,
            })?,
            Err(_) => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match env::var(ENV_PORT) {
            Ok(value) => value.parse::<u16>().map_err(|_| ConfigError {
                var: ENV_PORT,
                value,
            })?,
            Err(_) => DEFAULT_PORT,
        };
        let wait_for_finalization = match env::var(ENV_WAIT_FOR_FINALIZATION) {
            Ok(value) => match value.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError {
                        var: ENV_WAIT_FOR_FINALIZATION,
                        value,
                    });
                }
            },
            Err(_) => false,
        };
        let timeout = match env::var(ENV_SETTLE_TIMEOUT_SECONDS) {
            Ok(value) => {
                let seconds = value.parse::<u64>().map_err(|_| ConfigError {
                    var: ENV_SETTLE_TIMEOUT_SECONDS,
                    value,
                })?;
                Duration::from_secs(seconds)
            }
            Err(_) => SettleOptions::default().timeout,
        };
        Ok(Config {
            host,
            port,
            settle: SettleOptions {
                wait_for_finalization,
                timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn restore_env(key: &str, original: Option<String>) {
        if let Some(value) = original {
            // Safety: guarded by `ENV_LOCK`, so no concurrent environment
            // mutation occurs.
            unsafe { env::set_var(key, value) };
        } else {
            // Safety: guarded by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let saved: Vec<(&str, Option<String>)> = [
            ENV_HOST,
            ENV_PORT,
            ENV_WAIT_FOR_FINALIZATION,
            ENV_SETTLE_TIMEOUT_SECONDS,
        ]
        .iter()
        .map(|key| (*key, env::var(key).ok()))
        .collect();
        for (key, _) in &saved {
            // Safety: guarded by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }

        let config = Config::from_env().expect("defaults are valid");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.settle.wait_for_finalization);
        assert_eq!(config.settle.timeout, Duration::from_secs(60));

        for (key, value) in saved {
            restore_env(key, value);
        }
    }

    #[test]
    fn finalization_settings_are_read() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let saved_wait = env::var(ENV_WAIT_FOR_FINALIZATION).ok();
        let saved_timeout = env::var(ENV_SETTLE_TIMEOUT_SECONDS).ok();
        // Safety: guarded by `ENV_LOCK`.
        unsafe {
            env::set_var(ENV_WAIT_FOR_FINALIZATION, "true");
            env::set_var(ENV_SETTLE_TIMEOUT_SECONDS, "90");
        }

        let config = Config::from_env().expect("valid settings");
        assert!(config.settle.wait_for_finalization);
        assert_eq!(config.settle.timeout, Duration::from_secs(90));

        restore_env(ENV_WAIT_FOR_FINALIZATION, saved_wait);
        restore_env(ENV_SETTLE_TIMEOUT_SECONDS, saved_timeout);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let saved = env::var(ENV_PORT).ok();
        // Safety: guarded by `ENV_LOCK`.
        unsafe { env::set_var(ENV_PORT, "not-a-port") };

        let err = Config::from_env().expect_err("port must be numeric");
        assert_eq!(err.var, ENV_PORT);

        restore_env(ENV_PORT, saved);
    }
}
