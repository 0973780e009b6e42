// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

use crate::store::history::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bank_path: PathBuf,
    pub pack_paths: Vec<PathBuf>,
    pub drill_weights_path: Option<PathBuf>,
    pub history_limit: usize,
    pub review_session_size: usize,
    pub bind_addr: String,
    pub rust_log: String,
}

/// Parses `raw`, falling back to `default`. A value that does not parse is
/// reported in `warnings`; logging is not initialised yet when this runs.
fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T, warnings: &mut Vec<String>) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid {}={:?}", key, raw));
            default
        }),
        None => default,
    }
}

/// Comma separated list; blank segments are dropped.
pub fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl Config {
    /// Reads the environment. The second value holds warnings for the caller
    /// to log once tracing is initialised.
    pub fn from_env() -> (Self, Vec<String>) {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://exam_engine.db?mode=rwc".to_string());

        let bank_path = env::var("BANK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/exam_bank.json"));

        let pack_paths = env::var("PACK_PATHS")
            .map(|raw| split_paths(&raw))
            .unwrap_or_default();

        let drill_weights_path = env::var("DRILL_WEIGHTS_PATH").ok().map(PathBuf::from);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let mut warnings = Vec::new();
        let history_limit = parse_or(
            "HISTORY_LIMIT",
            env::var("HISTORY_LIMIT").ok(),
            DEFAULT_HISTORY_LIMIT,
            &mut warnings,
        );
        let review_session_size = parse_or(
            "REVIEW_SESSION_SIZE",
            env::var("REVIEW_SESSION_SIZE").ok(),
            10,
            &mut warnings,
        );

        let config = Self {
            database_url,
            bank_path,
            pack_paths,
            drill_weights_path,
            history_limit,
            review_session_size,
            bind_addr,
            rust_log,
        };
        (config, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paths_drops_blanks() {
        assert_eq!(
            split_paths(" packs/a.json, ,packs/b.json,"),
            vec![PathBuf::from("packs/a.json"), PathBuf::from("packs/b.json")]
        );
        assert!(split_paths("").is_empty());
    }

    #[test]
    fn test_invalid_numbers_fall_back_with_warning() {
        let mut warnings = Vec::new();
        assert_eq!(parse_or("HISTORY_LIMIT", Some(" 7 ".to_string()), 20usize, &mut warnings), 7);
        assert_eq!(parse_or("HISTORY_LIMIT", None, 20usize, &mut warnings), 20);
        assert!(warnings.is_empty());

        assert_eq!(parse_or("HISTORY_LIMIT", Some("lots".to_string()), 20usize, &mut warnings), 20);
        assert_eq!(warnings, vec![r#"Ignoring invalid HISTORY_LIMIT="lots""#.to_string()]);
    }
}
