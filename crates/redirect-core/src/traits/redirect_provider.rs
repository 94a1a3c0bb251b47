// # Redirect Provider Trait
//
// Defines the interface over the provider-side objects that represent
// redirects: zones, rulesets and DNS records.
//
// ## Implementations
//
// - Cloudflare: `redirect-provider-cloudflare` crate
// - Tests: in-memory fake under `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use redirect_core::RedirectProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* RedirectProvider implementation */;
//
//     let zone = provider.find_zone("example.com").await?;
//     for ruleset in provider.list_rulesets(&zone).await? {
//         println!("{} ({})", ruleset.name, ruleset.phase);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DnsRecord, DnsRecordSpec, Ruleset, RulesetSpec, RulesetSummary, Zone};

/// Trait for provider implementations
///
/// Each method maps to one remote call. Implementations hold no state between
/// calls and never retry; a failure is returned to the
/// [`Reconciler`](crate::Reconciler), which decides what it means.
///
/// # Errors
///
/// - [`Error::NotFound`](crate::Error::NotFound) when a zone or object does not exist
/// - [`Error::LimitExceeded`](crate::Error::LimitExceeded) when the provider refuses
///   a creation because of a quantity limit; the reconciler falls back on it
/// - [`Error::Provider`](crate::Error::Provider) for anything else
#[async_trait]
pub trait RedirectProvider: Send + Sync {
    /// Resolve a zone by its registrable domain
    async fn find_zone(&self, name: &str) -> Result<Zone>;

    /// List every ruleset of a zone, in the provider's order
    async fn list_rulesets(&self, zone: &Zone) -> Result<Vec<RulesetSummary>>;

    /// Fetch one ruleset including its rules
    async fn get_ruleset(&self, zone: &Zone, ruleset_id: &str) -> Result<Ruleset>;

    /// Create a ruleset
    async fn create_ruleset(&self, zone: &Zone, spec: &RulesetSpec) -> Result<RulesetSummary>;

    /// Replace a ruleset's metadata and full rule collection in one call
    async fn update_ruleset(&self, zone: &Zone, ruleset_id: &str, spec: &RulesetSpec)
    -> Result<()>;

    /// List every DNS record of a zone
    async fn list_dns_records(&self, zone: &Zone) -> Result<Vec<DnsRecord>>;

    /// Create a DNS record
    async fn create_dns_record(&self, zone: &Zone, spec: &DnsRecordSpec) -> Result<DnsRecord>;

    /// Delete a DNS record
    async fn delete_dns_record(&self, zone: &Zone, record_id: &str) -> Result<()>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
