//! Settings read from the process environment
//!
//! The environment is read once, here, and turned into plain values that are
//! handed to the core. Parsing goes through a lookup function so it can be
//! exercised without touching the real environment.
//!
//! - `CLOUDFLARE_API_TOKEN`: API token (required for sync)
//! - `REDIRECT_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//! - `REDIRECT_MODE`: `dry-run` to skip mutations
//! - `REDIRECT_OBJECT_MODEL`: `ruleset` (default) or `dns`
//! - `REDIRECT_RULESET_CAP`: redirect rulesets per zone before reuse (default: 10)
//! - `REDIRECT_LEGACY_CLEANUP`: `true` (default) or `false`

use anyhow::{Context, Result};
use redirect_core::{ObjectModel, ReconcilerConfig};
use tracing::Level;

pub const API_TOKEN_VAR: &str = "CLOUDFLARE_API_TOKEN";

/// Diagnostic printed when the token is missing
pub const MISSING_TOKEN_MESSAGE: &str = "CLOUDFLARE_API_TOKEN environment variable is required";

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: Level,
    pub dry_run: bool,
    pub reconciler: ReconcilerConfig,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = log_level_from_lookup(&lookup)?;

        let dry_run = lookup("REDIRECT_MODE")
            .map(|mode| mode.trim().eq_ignore_ascii_case("dry-run"))
            .unwrap_or(false);

        let mut reconciler = ReconcilerConfig::default();

        if let Some(model) = lookup("REDIRECT_OBJECT_MODEL") {
            reconciler.object_model = model.parse::<ObjectModel>()?;
        }

        if let Some(cap) = lookup("REDIRECT_RULESET_CAP") {
            reconciler.ruleset_cap = cap
                .trim()
                .parse()
                .with_context(|| format!("REDIRECT_RULESET_CAP must be a positive integer. Got: {}", cap))?;
        }

        if let Some(cleanup) = lookup("REDIRECT_LEGACY_CLEANUP") {
            reconciler.legacy_cleanup = parse_bool(&cleanup).with_context(|| {
                format!("REDIRECT_LEGACY_CLEANUP must be true or false. Got: {}", cleanup)
            })?;
        }

        reconciler.validate()?;

        Ok(Self {
            log_level,
            dry_run,
            reconciler,
        })
    }
}

/// Read only the log level from the process environment
///
/// Used by tools that never reconcile, so a bad sync setting cannot stop them.
pub fn log_level_from_env() -> Result<Level> {
    log_level_from_lookup(|key| std::env::var(key).ok())
}

/// Read only the log level through an arbitrary lookup
pub fn log_level_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Level> {
    match lookup("REDIRECT_LOG_LEVEL") {
        Some(level) => parse_level(&level),
        None => Ok(Level::INFO),
    }
}

/// Read the API token from the process environment
pub fn api_token_from_env() -> Result<String> {
    api_token_from_lookup(|key| std::env::var(key).ok())
}

/// Read the API token through an arbitrary lookup
pub fn api_token_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    match lookup(API_TOKEN_VAR) {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => anyhow::bail!(MISSING_TOKEN_MESSAGE),
    }
}

fn parse_level(level: &str) -> Result<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "REDIRECT_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.log_level, Level::INFO);
        assert!(!settings.dry_run);
        assert_eq!(settings.reconciler.object_model, ObjectModel::Ruleset);
        assert_eq!(settings.reconciler.ruleset_cap, 10);
        assert!(settings.reconciler.legacy_cleanup);
    }

    #[test]
    fn reads_every_variable() {
        let settings = Settings::from_lookup(lookup(&[
            ("REDIRECT_LOG_LEVEL", "DEBUG"),
            ("REDIRECT_MODE", "dry-run"),
            ("REDIRECT_OBJECT_MODEL", "dns"),
            ("REDIRECT_RULESET_CAP", "3"),
            ("REDIRECT_LEGACY_CLEANUP", "false"),
        ]))
        .unwrap();

        assert_eq!(settings.log_level, Level::DEBUG);
        assert!(settings.dry_run);
        assert_eq!(settings.reconciler.object_model, ObjectModel::DnsRecords);
        assert_eq!(settings.reconciler.ruleset_cap, 3);
        assert!(!settings.reconciler.legacy_cleanup);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::from_lookup(lookup(&[("REDIRECT_LOG_LEVEL", "loud")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("REDIRECT_RULESET_CAP", "many")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("REDIRECT_RULESET_CAP", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("REDIRECT_LEGACY_CLEANUP", "maybe")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("REDIRECT_OBJECT_MODEL", "page_rules")])).is_err());
    }

    #[test]
    fn log_level_ignores_sync_settings() {
        let level = log_level_from_lookup(lookup(&[
            ("REDIRECT_LOG_LEVEL", "warn"),
            ("REDIRECT_RULESET_CAP", "many"),
            ("REDIRECT_OBJECT_MODEL", "page_rules"),
            ("REDIRECT_LEGACY_CLEANUP", "maybe"),
        ]))
        .unwrap();
        assert_eq!(level, Level::WARN);

        assert_eq!(log_level_from_lookup(lookup(&[])).unwrap(), Level::INFO);
        assert!(log_level_from_lookup(lookup(&[("REDIRECT_LOG_LEVEL", "loud")])).is_err());
    }

    #[test]
    fn token_is_required() {
        let err = api_token_from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.to_string(), MISSING_TOKEN_MESSAGE);

        assert!(api_token_from_lookup(lookup(&[(API_TOKEN_VAR, "  ")])).is_err());
        assert_eq!(
            api_token_from_lookup(lookup(&[(API_TOKEN_VAR, "abc123")])).unwrap(),
            "abc123"
        );
    }
}
