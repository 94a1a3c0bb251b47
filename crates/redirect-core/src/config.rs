//! Configuration types
//!
//! Two kinds of configuration live here:
//! - [`DesiredConfig`]: the `redirects.json` document, validated before any
//!   network call is made
//! - [`ReconcilerConfig`]: engine settings, built by the caller and passed to
//!   [`crate::Reconciler`] explicitly

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::RedirectEntry;
use crate::zone;

/// The only document version this tool understands
pub const SUPPORTED_VERSION: &str = "1.0";

/// Above this many zones a run may approach the provider's per-zone limits
pub const ZONE_WARNING_THRESHOLD: usize = 5;

/// Where the validator looks when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "./redirects.json";

/// The desired redirect state
///
/// Source domains keep the order they have in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredConfig {
    /// Document version, always [`SUPPORTED_VERSION`] once validated
    pub version: String,

    /// Source domain → target URL
    pub redirects: IndexMap<String, String>,
}

impl DesiredConfig {
    /// Parse and validate a document
    ///
    /// Fails on the first defect with a message naming the offending entry.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("Invalid JSON: {}", e)))?;
        Self::from_value(&document)
    }

    /// Validate an already-parsed document
    pub fn from_value(document: &Value) -> Result<Self> {
        if document.get("version").and_then(Value::as_str) != Some(SUPPORTED_VERSION) {
            return Err(Error::config(format!(
                "Invalid or missing version. Expected \"{}\"",
                SUPPORTED_VERSION
            )));
        }

        let entries = document
            .get("redirects")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::config("Missing or invalid redirects object"))?;

        let mut redirects = IndexMap::with_capacity(entries.len());
        for (source, target) in entries {
            if source.trim().is_empty() || !source.contains('.') {
                return Err(Error::config(format!("Invalid source domain: {}", source)));
            }

            match target.as_str() {
                Some(url) if url.starts_with("http") => {
                    redirects.insert(source.clone(), url.to_string());
                }
                _ => {
                    return Err(Error::config(format!(
                        "Invalid target URL for {}: {}",
                        source,
                        display_value(target)
                    )));
                }
            }
        }

        Ok(Self {
            version: SUPPORTED_VERSION.to_string(),
            redirects,
        })
    }

    /// Entries in document order
    pub fn entries(&self) -> impl Iterator<Item = RedirectEntry> + '_ {
        self.redirects
            .iter()
            .map(|(source, target)| RedirectEntry::new(source.as_str(), target.as_str()))
    }

    /// Number of redirects declared
    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    /// Whether no redirects are declared
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A document that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: DesiredConfig,

    /// Distinct zones implied by the source domains
    pub zone_count: usize,
}

impl ValidatedConfig {
    /// Whether the zone count is above [`ZONE_WARNING_THRESHOLD`]
    pub fn approaches_zone_limits(&self) -> bool {
        self.zone_count > ZONE_WARNING_THRESHOLD
    }
}

/// Read and validate a redirect document from disk
///
/// Emits an advisory warning when the document spans many zones; that never
/// fails validation.
pub fn validate_file(path: impl AsRef<Path>) -> Result<ValidatedConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Unable to read {}: {}", path.display(), e)))?;

    validate_str(&text)
}

/// Validate a redirect document held in memory
pub fn validate_str(text: &str) -> Result<ValidatedConfig> {
    let config = DesiredConfig::from_json_str(text)?;
    let zone_count = zone::distinct_zones(&config);

    let validated = ValidatedConfig { config, zone_count };
    if validated.approaches_zone_limits() {
        tracing::warn!(
            "{} unique zones detected. This may approach Cloudflare's zone ruleset limits.",
            zone_count
        );
        tracing::warn!("Consider consolidating redirects or using wildcard patterns if sync fails.");
    }

    Ok(validated)
}

/// How redirects are represented at the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectModel {
    /// Rules inside a zone redirect ruleset, replaced in one call
    #[default]
    Ruleset,
    /// Proxied CNAME records, deleted and recreated
    DnsRecords,
}

impl FromStr for ObjectModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ruleset" | "rulesets" => Ok(Self::Ruleset),
            "dns" | "dns_records" | "dns-records" => Ok(Self::DnsRecords),
            other => Err(Error::config(format!(
                "Unknown object model '{}'. Supported: ruleset, dns",
                other
            ))),
        }
    }
}

/// Reconciler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Remote representation of redirects
    #[serde(default)]
    pub object_model: ObjectModel,

    /// Redirect containers a zone may hold before an existing one is reused
    /// instead of creating another
    #[serde(default = "default_ruleset_cap")]
    pub ruleset_cap: usize,

    /// Delete managed DNS records left over from the record-based model
    ///
    /// Only applies to the ruleset model. Failures are logged, never fatal.
    #[serde(default = "default_legacy_cleanup")]
    pub legacy_cleanup: bool,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcilerConfig {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.ruleset_cap == 0 {
            return Err(Error::config("Ruleset cap must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Set the object model
    pub fn with_object_model(mut self, object_model: ObjectModel) -> Self {
        self.object_model = object_model;
        self
    }

    /// Set the ruleset cap
    pub fn with_ruleset_cap(mut self, ruleset_cap: usize) -> Self {
        self.ruleset_cap = ruleset_cap;
        self
    }

    /// Enable or disable legacy DNS cleanup
    pub fn with_legacy_cleanup(mut self, legacy_cleanup: bool) -> Self {
        self.legacy_cleanup = legacy_cleanup;
        self
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            object_model: ObjectModel::default(),
            ruleset_cap: default_ruleset_cap(),
            legacy_cleanup: default_legacy_cleanup(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ruleset_cap() -> usize {
    10
}

fn default_legacy_cleanup() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
