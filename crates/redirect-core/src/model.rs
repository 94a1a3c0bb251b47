//! Remote and desired-state data model
//!
//! Remote types deserialize directly from the provider's JSON objects. Fields
//! this crate does not interpret are kept in `body` maps so objects owned by
//! someone else can be sent back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

/// Name and description of the ruleset container this tool owns
pub const CONTAINER_SENTINEL: &str = "auto-generated-redirects";

/// Marker carried by every rule and DNS record this tool owns
pub const OBJECT_SENTINEL: &str = "auto-generated-redirect";

/// Ruleset kind used for redirect containers
pub const RULESET_KIND: &str = "zone";

/// Ruleset phase that hosts dynamic redirects
pub const REDIRECT_PHASE: &str = "http_request_dynamic_redirect";

/// Status code used for every managed redirect
pub const REDIRECT_STATUS: u16 = 301;

/// Rule fields the provider sets itself and rejects on resubmission
const READ_ONLY_RULE_FIELDS: [&str; 2] = ["version", "last_updated"];

/// One desired redirect: requests for `source` go to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEntry {
    /// Source host (e.g., "blog.example.com")
    pub source: String,
    /// Target URL (e.g., "https://blog.target.com")
    pub target: String,
}

impl RedirectEntry {
    /// Create a new redirect entry
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A zone resolved at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider zone identifier
    pub id: String,
    /// Registrable domain (e.g., "example.com")
    pub name: String,
}

/// A ruleset as returned by the list endpoint (no rules)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub phase: String,
}

impl RulesetSummary {
    /// Whether this container was created by this tool
    pub fn is_managed(&self) -> bool {
        self.description == CONTAINER_SENTINEL
    }

    /// Whether this container serves the same purpose (zone-level redirects)
    pub fn is_redirect_container(&self) -> bool {
        self.kind == RULESET_KIND && self.phase == REDIRECT_PHASE
    }
}

/// A ruleset including its ordered rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(flatten)]
    pub summary: RulesetSummary,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A single rule inside a ruleset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Everything else (expression, action, parameters, ...), kept verbatim
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Rule {
    /// Build the managed redirect rule for one entry
    pub fn redirect(entry: &RedirectEntry) -> Self {
        let mut body = Map::new();
        body.insert(
            "expression".to_string(),
            Value::String(host_expression(&entry.source)),
        );
        body.insert("action".to_string(), Value::String("redirect".to_string()));
        body.insert(
            "action_parameters".to_string(),
            json!({
                "from_value": {
                    "status_code": REDIRECT_STATUS,
                    "preserve_query_string": true,
                    "target_url": { "value": entry.target },
                }
            }),
        );

        Self {
            id: None,
            description: Some(OBJECT_SENTINEL.to_string()),
            body,
        }
    }

    /// Whether this rule was created by this tool
    pub fn is_managed(&self) -> bool {
        self.description.as_deref() == Some(OBJECT_SENTINEL)
    }

    /// Whether this rule has the `Redirect <source> to <target>` shape of
    /// rules written before the marker existed
    ///
    /// Only meaningful inside a container that carries the container sentinel.
    pub fn is_legacy_redirect(&self) -> bool {
        let Some(source) = self
            .description
            .as_deref()
            .and_then(|d| d.strip_prefix("Redirect "))
            .and_then(|rest| rest.split_once(" to "))
            .map(|(source, _)| source)
        else {
            return false;
        };

        let expected = format!("http.host eq \"{}\"", source);
        !source.is_empty() && self.expression() == Some(expected.as_str())
    }

    /// The rule's match expression, if any
    pub fn expression(&self) -> Option<&str> {
        self.body.get("expression").and_then(Value::as_str)
    }

    /// Strip fields the provider owns so the rule can be resubmitted
    pub fn into_resubmittable(mut self) -> Self {
        for field in READ_ONLY_RULE_FIELDS {
            self.body.remove(field);
        }
        self
    }
}

/// Match expression selecting requests for one host
pub fn host_expression(source: &str) -> String {
    let escaped = source.replace('\\', "\\\\").replace('"', "\\\"");
    format!("http.host eq \"{}\"", escaped)
}

/// Payload for creating or replacing the managed ruleset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulesetSpec {
    pub name: String,
    pub description: String,
    pub kind: String,
    pub phase: String,
    pub rules: Vec<Rule>,
}

impl RulesetSpec {
    /// Managed container holding the given rules
    pub fn managed(rules: Vec<Rule>) -> Self {
        Self {
            name: CONTAINER_SENTINEL.to_string(),
            description: CONTAINER_SENTINEL.to_string(),
            kind: RULESET_KIND.to_string(),
            phase: REDIRECT_PHASE.to_string(),
            rules,
        }
    }

    /// Existing container with its own metadata and a new rule collection
    pub fn reusing(container: &RulesetSummary, rules: Vec<Rule>) -> Self {
        Self {
            name: container.name.clone(),
            description: container.description.clone(),
            kind: container.kind.clone(),
            phase: container.phase.clone(),
            rules,
        }
    }
}

/// A DNS record as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl DnsRecord {
    /// Whether this record was created by this tool
    pub fn is_managed(&self) -> bool {
        self.comment.as_deref() == Some(OBJECT_SENTINEL)
    }
}

/// Payload for creating a DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecordSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub proxied: bool,
    pub comment: String,
}

impl DnsRecordSpec {
    /// Proxied CNAME from the entry's source host to its target's host
    pub fn cname_for(entry: &RedirectEntry) -> Result<Self> {
        let target = url::Url::parse(&entry.target).map_err(|e| {
            Error::config(format!(
                "Invalid target URL for {}: {} ({})",
                entry.source, entry.target, e
            ))
        })?;
        let host = target.host_str().ok_or_else(|| {
            Error::config(format!(
                "Target URL for {} has no host: {}",
                entry.source, entry.target
            ))
        })?;

        Ok(Self {
            name: entry.source.clone(),
            record_type: "CNAME".to_string(),
            content: host.to_string(),
            proxied: true,
            comment: OBJECT_SENTINEL.to_string(),
        })
    }
}
