//! Runtime configuration from environment variables.
//! Defaults reproduce the reference dataset: 75 devices, 250 events, seed 42.

use crate::models::fleet::TIMESTAMP_FORMAT;
use chrono::{DateTime, Local, NaiveDateTime, SubsecRound};
use std::path::PathBuf;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_DEVICE_COUNT: usize = 75;
pub const DEFAULT_EVENT_COUNT: usize = 250;
pub const MAX_DEVICE_COUNT: usize = 999;
pub const DEFAULT_UPLOAD_BUCKET: &str = "coding_evaluation";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://storage.googleapis.com/upload/storage/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seed: u64,
    pub device_count: usize,
    pub event_count: usize,
    /// Injected "now"; every wall-clock-relative field is computed from it.
    pub reference_time: NaiveDateTime,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Root holding the `data`, `outputs` and `scripts` folders to upload.
    pub base_dir: PathBuf,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub bucket: String,
    /// Object name prefix (data row id); asked for interactively when unset.
    pub prefix: Option<String>,
    /// Bearer token for the storage API. Never compiled into the binary.
    pub token: Option<String>,
    /// File holding the bearer token; only read when an upload needs it.
    pub token_file: Option<PathBuf>,
    pub endpoint: String,
    /// Copy into this directory instead of calling the storage API.
    pub local_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let seed = match var("FLEET_SEED") {
            Some(s) => s.parse::<u64>().map_err(|_| format!("FLEET_SEED must be an unsigned integer, got {:?}", s))?,
            None => DEFAULT_SEED,
        };

        let device_count = match var("FLEET_DEVICE_COUNT") {
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| format!("FLEET_DEVICE_COUNT must be an unsigned integer, got {:?}", s))?,
            None => DEFAULT_DEVICE_COUNT,
        };
        // device ids are D + three digits
        if device_count == 0 || device_count > MAX_DEVICE_COUNT {
            return Err(format!("FLEET_DEVICE_COUNT must be between 1 and {}", MAX_DEVICE_COUNT));
        }

        let event_count = match var("FLEET_EVENT_COUNT") {
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| format!("FLEET_EVENT_COUNT must be an unsigned integer, got {:?}", s))?,
            None => DEFAULT_EVENT_COUNT,
        };

        let reference_time = match var("FLEET_REFERENCE_TIME") {
            Some(s) => parse_reference_time(&s)?,
            None => Local::now().naive_local().trunc_subsecs(0),
        };

        Ok(Config {
            seed,
            device_count,
            event_count,
            reference_time,
            data_dir: PathBuf::from(var("FLEET_DATA_DIR").unwrap_or_else(|| "data".to_string())),
            output_dir: PathBuf::from(var("FLEET_OUTPUT_DIR").unwrap_or_else(|| "outputs".to_string())),
            base_dir: PathBuf::from(var("FLEET_BASE_DIR").unwrap_or_else(|| ".".to_string())),
            upload: UploadConfig {
                bucket: var("FLEET_UPLOAD_BUCKET").unwrap_or_else(|| DEFAULT_UPLOAD_BUCKET.to_string()),
                prefix: var("FLEET_UPLOAD_PREFIX"),
                token: var("FLEET_UPLOAD_TOKEN"),
                token_file: var("FLEET_UPLOAD_TOKEN_FILE").map(PathBuf::from),
                endpoint: var("FLEET_UPLOAD_ENDPOINT").unwrap_or_else(|| DEFAULT_UPLOAD_ENDPOINT.to_string()),
                local_dir: var("FLEET_UPLOAD_LOCAL_DIR").map(PathBuf::from),
            },
        })
    }
}

impl UploadConfig {
    /// `FLEET_UPLOAD_TOKEN` wins over the contents of `FLEET_UPLOAD_TOKEN_FILE`.
    pub fn resolve_token(&self) -> Result<Option<String>, String> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.token_file {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| format!("unable to read FLEET_UPLOAD_TOKEN_FILE {}: {}", path.display(), e))?;
                Ok(Some(contents.trim().to_string()).filter(|t| !t.is_empty()))
            }
            None => Ok(None),
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` (local) or RFC 3339 (converted to its local wall time).
pub fn parse_reference_time(raw: &str) -> Result<NaiveDateTime, String> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.naive_local().trunc_subsecs(0))
        .map_err(|_| format!("FLEET_REFERENCE_TIME must be 'YYYY-MM-DD HH:MM:SS' or RFC 3339, got {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_dataset() {
        let cfg = config_with(&[("FLEET_REFERENCE_TIME", "2025-03-14 09:30:00")]).expect("config");
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.device_count, 75);
        assert_eq!(cfg.event_count, 250);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.output_dir, PathBuf::from("outputs"));
        assert_eq!(cfg.upload.bucket, "coding_evaluation");
        assert_eq!(cfg.upload.token, None);
    }

    #[test]
    fn parses_both_reference_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid");
        assert_eq!(parse_reference_time("2025-03-14 09:30:00"), Ok(expected));
        assert_eq!(parse_reference_time("2025-03-14T09:30:00.250+01:00"), Ok(expected));
        assert!(parse_reference_time("yesterday").is_err());
    }

    #[test]
    fn rejects_out_of_range_device_count() {
        assert!(config_with(&[("FLEET_DEVICE_COUNT", "0")]).is_err());
        assert!(config_with(&[("FLEET_DEVICE_COUNT", "1000")]).is_err());
        assert!(config_with(&[("FLEET_DEVICE_COUNT", "many")]).is_err());
        assert_eq!(config_with(&[("FLEET_DEVICE_COUNT", "999")]).expect("config").device_count, 999);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config_with(&[("FLEET_SEED", "  "), ("FLEET_UPLOAD_TOKEN", "")]).expect("config");
        assert_eq!(cfg.seed, DEFAULT_SEED);
        assert_eq!(cfg.upload.token, None);
    }

    #[test]
    fn token_file_is_read_and_trimmed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "ya29.secret\n").expect("write token");
        let path_str = path.to_string_lossy().into_owned();
        let cfg = config_with(&[("FLEET_UPLOAD_TOKEN_FILE", path_str.as_str())]).expect("config");
        assert_eq!(cfg.upload.resolve_token(), Ok(Some("ya29.secret".to_string())));
    }

    #[test]
    fn stale_token_file_only_fails_when_resolved() {
        let cfg = config_with(&[
            ("FLEET_REFERENCE_TIME", "2025-03-14 09:30:00"),
            ("FLEET_UPLOAD_TOKEN_FILE", "/nonexistent/fleet-token"),
        ])
        .expect("config loads without reading the token file");
        assert!(cfg.upload.resolve_token().is_err());
    }

    #[test]
    fn inline_token_wins_over_token_file() {
        let cfg = config_with(&[
            ("FLEET_UPLOAD_TOKEN", "inline"),
            ("FLEET_UPLOAD_TOKEN_FILE", "/nonexistent/fleet-token"),
        ])
        .expect("config");
        assert_eq!(cfg.upload.resolve_token(), Ok(Some("inline".to_string())));
    }
}
