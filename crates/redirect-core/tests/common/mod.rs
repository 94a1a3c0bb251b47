//! Test doubles and common utilities for reconciliation contract tests
//!
//! [`FakeProvider`] keeps zones, rulesets and DNS records in memory and logs
//! every call, so tests can assert both the resulting remote state and the
//! order in which the reconciler touched it.

#![allow(dead_code)]

use redirect_core::error::{Error, Result};
use redirect_core::model::{
    CONTAINER_SENTINEL, DnsRecord, DnsRecordSpec, OBJECT_SENTINEL, REDIRECT_PHASE, RULESET_KIND,
    Rule, Ruleset, RulesetSpec, RulesetSummary, Zone,
};
use redirect_core::{DesiredConfig, RedirectProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeState {
    zones: Vec<Zone>,
    rulesets: HashMap<String, Vec<Ruleset>>,
    records: HashMap<String, Vec<DnsRecord>>,
    next_id: usize,
    /// Redirect containers a zone may hold before creation is refused
    ruleset_limit: Option<usize>,
    fail_dns_listing: bool,
    calls: Vec<String>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn zone_id(&self, name: &str) -> String {
        self.zones
            .iter()
            .find(|z| z.name == name)
            .map(|z| z.id.clone())
            .unwrap_or_else(|| panic!("zone {} not registered", name))
    }
}

/// In-memory provider
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Create a provider that shares remote state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
        }
    }

    /// Register a zone
    pub fn add_zone(&self, name: &str) -> Zone {
        let zone = Zone {
            id: format!("zone-{}", name),
            name: name.to_string(),
        };
        self.state.lock().unwrap().zones.push(zone.clone());
        zone
    }

    /// Add a ruleset to a zone; returns its id
    pub fn add_ruleset(&self, zone: &str, description: &str, phase: &str, rules: Vec<Rule>) -> String {
        let mut state = self.state.lock().unwrap();
        let zone_id = state.zone_id(zone);
        let id = state.next_id("rs");
        let ruleset = Ruleset {
            summary: RulesetSummary {
                id: id.clone(),
                name: format!("ruleset {}", id),
                description: description.to_string(),
                kind: RULESET_KIND.to_string(),
                phase: phase.to_string(),
            },
            rules,
        };
        state.rulesets.entry(zone_id).or_default().push(ruleset);
        id
    }

    /// Add an unmanaged redirect ruleset
    pub fn add_foreign_redirect_ruleset(&self, zone: &str) -> String {
        self.add_ruleset(zone, "hand made", REDIRECT_PHASE, vec![foreign_rule("shop")])
    }

    /// Add a DNS record to a zone; returns its id
    pub fn add_dns_record(&self, zone: &str, name: &str, comment: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        let zone_id = state.zone_id(zone);
        let id = state.next_id("rec");
        state.records.entry(zone_id).or_default().push(DnsRecord {
            id: id.clone(),
            name: name.to_string(),
            record_type: "CNAME".to_string(),
            content: "somewhere.example.net".to_string(),
            proxied: true,
            comment: comment.map(str::to_string),
        });
        id
    }

    /// Refuse ruleset creation once a zone holds `limit` redirect containers
    pub fn set_ruleset_limit(&self, limit: usize) {
        self.state.lock().unwrap().ruleset_limit = Some(limit);
    }

    /// Make every DNS listing fail
    pub fn fail_dns_listing(&self) {
        self.state.lock().unwrap().fail_dns_listing = true;
    }

    pub fn rulesets(&self, zone: &str) -> Vec<Ruleset> {
        let state = self.state.lock().unwrap();
        let zone_id = state.zone_id(zone);
        state.rulesets.get(&zone_id).cloned().unwrap_or_default()
    }

    pub fn records(&self, zone: &str) -> Vec<DnsRecord> {
        let state = self.state.lock().unwrap();
        let zone_id = state.zone_id(zone);
        state.records.get(&zone_id).cloned().unwrap_or_default()
    }

    /// Managed rules across every ruleset of a zone
    pub fn managed_rules(&self, zone: &str) -> Vec<Rule> {
        self.rulesets(zone)
            .into_iter()
            .flat_map(|r| r.rules)
            .filter(Rule::is_managed)
            .collect()
    }

    pub fn managed_records(&self, zone: &str) -> Vec<DnsRecord> {
        self.records(zone)
            .into_iter()
            .filter(DnsRecord::is_managed)
            .collect()
    }

    /// Every call made so far, as "operation:argument"
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait::async_trait]
impl RedirectProvider for FakeProvider {
    async fn find_zone(&self, name: &str) -> Result<Zone> {
        self.record(format!("find_zone:{}", name));
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|z| z.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Zone not found for domain: {}", name)))
    }

    async fn list_rulesets(&self, zone: &Zone) -> Result<Vec<RulesetSummary>> {
        self.record(format!("list_rulesets:{}", zone.name));
        let state = self.state.lock().unwrap();
        Ok(state
            .rulesets
            .get(&zone.id)
            .map(|rs| rs.iter().map(|r| r.summary.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_ruleset(&self, zone: &Zone, ruleset_id: &str) -> Result<Ruleset> {
        self.record(format!("get_ruleset:{}", ruleset_id));
        let state = self.state.lock().unwrap();
        state
            .rulesets
            .get(&zone.id)
            .and_then(|rs| rs.iter().find(|r| r.summary.id == ruleset_id))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Ruleset not found: {}", ruleset_id)))
    }

    async fn create_ruleset(&self, zone: &Zone, spec: &RulesetSpec) -> Result<RulesetSummary> {
        self.record(format!("create_ruleset:{}", zone.name));
        let mut state = self.state.lock().unwrap();

        let existing = state
            .rulesets
            .get(&zone.id)
            .map(|rs| rs.iter().filter(|r| r.summary.is_redirect_container()).count())
            .unwrap_or(0);
        if let Some(limit) = state.ruleset_limit
            && existing >= limit
        {
            return Err(Error::limit_exceeded(format!(
                "zone {} exceeded the maximum number of rulesets",
                zone.name
            )));
        }

        let id = state.next_id("rs");
        let mut rules = spec.rules.clone();
        for rule in &mut rules {
            rule.id = Some(state.next_id("rule"));
        }
        let summary = RulesetSummary {
            id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            kind: spec.kind.clone(),
            phase: spec.phase.clone(),
        };
        state.rulesets.entry(zone.id.clone()).or_default().push(Ruleset {
            summary: summary.clone(),
            rules,
        });
        Ok(summary)
    }

    async fn update_ruleset(&self, zone: &Zone, ruleset_id: &str, spec: &RulesetSpec) -> Result<()> {
        self.record(format!("update_ruleset:{}", ruleset_id));
        let mut state = self.state.lock().unwrap();

        let mut rules = spec.rules.clone();
        for rule in &mut rules {
            if rule.id.is_none() {
                rule.id = Some(state.next_id("rule"));
            }
        }

        let ruleset = state
            .rulesets
            .get_mut(&zone.id)
            .and_then(|rs| rs.iter_mut().find(|r| r.summary.id == ruleset_id))
            .ok_or_else(|| Error::not_found(format!("Ruleset not found: {}", ruleset_id)))?;
        ruleset.summary.name = spec.name.clone();
        ruleset.summary.description = spec.description.clone();
        ruleset.rules = rules;
        Ok(())
    }

    async fn list_dns_records(&self, zone: &Zone) -> Result<Vec<DnsRecord>> {
        self.record(format!("list_dns_records:{}", zone.name));
        let state = self.state.lock().unwrap();
        if state.fail_dns_listing {
            return Err(Error::provider("fake", "DNS listing unavailable"));
        }
        Ok(state.records.get(&zone.id).cloned().unwrap_or_default())
    }

    async fn create_dns_record(&self, zone: &Zone, spec: &DnsRecordSpec) -> Result<DnsRecord> {
        self.record(format!("create_dns_record:{}", spec.name));
        let mut state = self.state.lock().unwrap();
        let record = DnsRecord {
            id: state.next_id("rec"),
            name: spec.name.clone(),
            record_type: spec.record_type.clone(),
            content: spec.content.clone(),
            proxied: spec.proxied,
            comment: Some(spec.comment.clone()),
        };
        state
            .records
            .entry(zone.id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn delete_dns_record(&self, zone: &Zone, record_id: &str) -> Result<()> {
        self.record(format!("delete_dns_record:{}", record_id));
        let mut state = self.state.lock().unwrap();
        let records = state.records.entry(zone.id.clone()).or_default();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Error::not_found(format!("DNS record not found: {}", record_id)));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// A rule someone else created
pub fn foreign_rule(host: &str) -> Rule {
    let mut rule = Rule::redirect(&redirect_core::RedirectEntry::new(
        format!("{}.example.com", host),
        "https://elsewhere.example.net",
    ));
    rule.id = Some(format!("foreign-{}", host));
    rule.description = Some(format!("manual redirect for {}", host));
    rule
}

/// A managed rule left behind by an earlier run
pub fn stale_managed_rule(source: &str) -> Rule {
    let mut rule = Rule::redirect(&redirect_core::RedirectEntry::new(source, "https://old.example.net"));
    rule.id = Some(format!("stale-{}", source));
    rule
}

/// A rule in the `Redirect <source> to <target>` shape, without the marker
pub fn original_format_rule(source: &str, target: &str) -> Rule {
    let mut rule = Rule::redirect(&redirect_core::RedirectEntry::new(source, target));
    rule.id = Some(format!("original-{}", source));
    rule.description = Some(format!("Redirect {} to {}", source, target));
    rule
}

/// Build a desired config from (source, target) pairs
pub fn desired(pairs: &[(&str, &str)]) -> DesiredConfig {
    DesiredConfig {
        version: "1.0".to_string(),
        redirects: pairs
            .iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect(),
    }
}

/// Sentinels re-exported for assertions
pub const MANAGED_CONTAINER: &str = CONTAINER_SENTINEL;
pub const MANAGED_OBJECT: &str = OBJECT_SENTINEL;
