//! # Configuration
//!
//! Loads the environment-variable surface from spec.md §6 into a single
//! typed [`Config`], following the teacher crate's convention of naming
//! every tunable up front rather than reading `env::var` scattered across
//! modules.

use crate::error::GatewayError;
use std::path::PathBuf;

/// Fully resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filesystem directory backing the SQLite database and its WAL.
    pub data_dir: PathBuf,
    /// Serial device path for the bundled [`crate::transport::serial::SerialTransport`].
    pub serial_port: String,
    /// When true, the Submitter never calls out and returns a deterministic mock.
    pub dry_run: bool,
    /// When true, `#osmnote` is admitted without a fresh GPS fix using `gps_fallback`.
    pub gps_validation_disabled: bool,
    /// Fallback coordinate used when `gps_validation_disabled` is set. Never `(0, 0)`.
    pub gps_fallback: (f64, f64),
    /// `log`/`env_logger` level string (`RUST_LOG` takes precedence if set).
    pub log_level: String,
    /// IANA timezone name used for `#osmcount`'s "today" bucket.
    pub tz: String,
    /// Enables the once-daily broadcast in the worker loop.
    pub daily_broadcast_enabled: bool,
    /// Default UI locale for new, unseen nodes.
    pub language: String,
    /// Remote Notes API endpoint.
    pub osm_api_url: String,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("gateway.db")
    }

    /// Loads configuration from the process environment, applying the
    /// defaults documented in spec.md §6.
    pub fn from_env() -> Result<Self, GatewayError> {
        let data_dir = PathBuf::from(
            std::env::var("DATA_DIR").unwrap_or_else(|_| "/var/lib/lora-osmnotes".to_string()),
        );
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            GatewayError::Config(format!(
                "cannot create DATA_DIR {}: {e}",
                data_dir.display()
            ))
        })?;

        let serial_port =
            std::env::var("SERIAL_PORT").unwrap_or_else(|_| "/dev/ttyACM0".to_string());
        let dry_run = parse_bool_env("DRY_RUN", false);
        let gps_validation_disabled = parse_bool_env("GPS_VALIDATION_DISABLED", false);

        let gps_fallback = (4.6097, -74.0817); // Bogotá city center; never (0, 0).

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
        let tz = std::env::var("TZ").unwrap_or_else(|_| "America/Bogota".to_string());
        let daily_broadcast_enabled = parse_bool_env("DAILY_BROADCAST_ENABLED", false);
        let language = std::env::var("LANGUAGE").unwrap_or_else(|_| "es".to_string());
        let osm_api_url = std::env::var("OSM_API_URL")
            .unwrap_or_else(|_| "https://api.openstreetmap.org/api/0.6/notes.json".to_string());

        Ok(Config {
            data_dir,
            serial_port,
            dry_run,
            gps_validation_disabled,
            gps_fallback,
            log_level,
            tz,
            daily_broadcast_enabled,
            language,
            osm_api_url,
        })
    }
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_env_defaults_when_unset() {
        std::env::remove_var("TEST_FLAG_UNSET");
        assert!(!parse_bool_env("TEST_FLAG_UNSET", false));
        assert!(parse_bool_env("TEST_FLAG_UNSET", true));
    }

    #[test]
    fn parse_bool_env_reads_true_case_insensitively() {
        std::env::set_var("TEST_FLAG_TRUE", "True");
        assert!(parse_bool_env("TEST_FLAG_TRUE", false));
        std::env::remove_var("TEST_FLAG_TRUE");
    }

    #[test]
    fn gps_fallback_is_never_origin() {
        let (lat, lon) = (4.6097, -74.0817);
        assert!(lat != 0.0 || lon != 0.0);
    }
}
