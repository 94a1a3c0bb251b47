// # Cloudflare Redirect Provider
//
// Cloudflare API v4 implementation of `RedirectProvider`.
//
// - One HTTP request per trait call (DNS listing follows pagination)
// - No retry, no backoff, no caching; errors go straight back to the reconciler
// - HTTP timeout configured (30 seconds)
// - Status codes mapped to specific errors (401/403, 404, 429, 5xx)
// - Quantity-limit rejections surface as `Error::LimitExceeded`
// - Dry-run mode: reads are performed, mutations are only logged
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List Rulesets: GET `/zones/:zone_id/rulesets`
// - Get Ruleset: GET `/zones/:zone_id/rulesets/:ruleset_id`
// - Create Ruleset: POST `/zones/:zone_id/rulesets`
// - Update Ruleset: PUT `/zones/:zone_id/rulesets/:ruleset_id`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use redirect_core::model::{DnsRecord, DnsRecordSpec, Ruleset, RulesetSpec, RulesetSummary, Zone};
use redirect_core::{Error, RedirectProvider, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used when listing DNS records
const DNS_PAGE_SIZE: u32 = 100;

/// Id reported for objects that dry-run mode pretends to create
pub const DRY_RUN_ID: &str = "dry-run";

const PROVIDER: &str = "cloudflare";

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CloudflareMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
}

/// Cloudflare redirect provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zones, rulesets, records)
/// - Log the intended POST/PUT/DELETE payloads
/// - **NOT** modify anything
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read, DNS:Edit and
    ///   Dynamic Redirect:Edit permissions
    /// - `dry_run`: If true, perform reads but skip mutations
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::credential("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider in live mode
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a provider in dry-run mode
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Point the provider at another API base (e.g., a proxy)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send a request and decode the envelope
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<CloudflareResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_failure(status.as_u16(), &body, context));
        }

        let envelope: CloudflareResponse<T> = response.json().await.map_err(|e| {
            Error::provider(PROVIDER, format!("{}: Failed to parse response: {}", context, e))
        })?;

        if !envelope.success {
            return Err(map_envelope_errors(&envelope.errors, context));
        }

        Ok(envelope)
    }

    /// Send a request and return the envelope's `result`
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        self.send_envelope(request, context)
            .await?
            .result
            .ok_or_else(|| {
                Error::provider(PROVIDER, format!("{}: Invalid response format: missing result", context))
            })
    }
}

/// Map a non-2xx response to an error
fn map_failure(status: u16, body: &str, context: &str) -> Error {
    let messages = serde_json::from_str::<CloudflareResponse<Value>>(body)
        .map(|envelope| envelope.errors)
        .unwrap_or_default();

    if messages.iter().any(is_limit_message) {
        return map_envelope_errors(&messages, context);
    }

    let detail = messages
        .first()
        .map(|m| m.message.clone())
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => Error::provider(
            PROVIDER,
            format!(
                "{}: Authentication failed: Invalid API token or insufficient permissions. Status: {}",
                context, status
            ),
        ),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        429 => Error::provider(
            PROVIDER,
            format!("{}: Rate limit exceeded. Please retry later. Status: {}", context, status),
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: Cloudflare server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{}: {} - {}", context, status, detail)),
    }
}

/// Map the `errors` array of an unsuccessful envelope to an error
fn map_envelope_errors(messages: &[CloudflareMessage], context: &str) -> Error {
    let detail = messages
        .iter()
        .map(|m| format!("{} (code {})", m.message, m.code))
        .collect::<Vec<_>>()
        .join("; ");

    if messages.iter().any(is_limit_message) {
        Error::limit_exceeded(format!("{}: {}", context, detail))
    } else {
        Error::provider(PROVIDER, format!("{}: {}", context, detail))
    }
}

/// Whether a Cloudflare error message reports a quantity limit
fn is_limit_message(message: &CloudflareMessage) -> bool {
    let text = message.message.to_lowercase();
    (text.contains("exceed") || text.contains("reached"))
        && (text.contains("limit") || text.contains("maximum") || text.contains("quota"))
}

#[async_trait]
impl RedirectProvider for CloudflareProvider {
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn find_zone(&self, name: &str) -> Result<Zone> {
        tracing::debug!("Looking up zone ID for domain: {}", name);
        let context = format!("Failed to get zone ID for {}", name);

        let zones: Vec<ZoneResult> = self
            .send(
                self.client.get(self.url("/zones")).query(&[("name", name)]),
                &context,
            )
            .await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found for domain: {}", name)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(Zone {
            id: zone.id,
            name: zone.name,
        })
    }

    async fn list_rulesets(&self, zone: &Zone) -> Result<Vec<RulesetSummary>> {
        tracing::debug!("Listing rulesets for zone {}", zone.name);
        self.send(
            self.client
                .get(self.url(&format!("/zones/{}/rulesets", zone.id))),
            "Failed to get rulesets",
        )
        .await
    }

    async fn get_ruleset(&self, zone: &Zone, ruleset_id: &str) -> Result<Ruleset> {
        tracing::debug!("Fetching ruleset {} in zone {}", ruleset_id, zone.name);
        self.send(
            self.client
                .get(self.url(&format!("/zones/{}/rulesets/{}", zone.id, ruleset_id))),
            &format!("Failed to get ruleset {}", ruleset_id),
        )
        .await
    }

    async fn create_ruleset(&self, zone: &Zone, spec: &RulesetSpec) -> Result<RulesetSummary> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would create ruleset in zone {} with payload: {}",
                zone.name,
                serde_json::to_string(spec)?
            );
            return Ok(RulesetSummary {
                id: DRY_RUN_ID.to_string(),
                name: spec.name.clone(),
                description: spec.description.clone(),
                kind: spec.kind.clone(),
                phase: spec.phase.clone(),
            });
        }

        self.send(
            self.client
                .post(self.url(&format!("/zones/{}/rulesets", zone.id)))
                .json(spec),
            &format!("Failed to create ruleset for zone {}", zone.id),
        )
        .await
    }

    async fn update_ruleset(&self, zone: &Zone, ruleset_id: &str, spec: &RulesetSpec) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would replace ruleset {} in zone {} with payload: {}",
                ruleset_id,
                zone.name,
                serde_json::to_string(spec)?
            );
            return Ok(());
        }

        self.send::<Value>(
            self.client
                .put(self.url(&format!("/zones/{}/rulesets/{}", zone.id, ruleset_id)))
                .json(spec),
            &format!("Failed to update ruleset for zone {}", zone.id),
        )
        .await?;
        Ok(())
    }

    /// Walks every page; Cloudflare caps page sizes.
    async fn list_dns_records(&self, zone: &Zone) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            tracing::debug!("Listing DNS records for zone {} (page {})", zone.name, page);
            let envelope: CloudflareResponse<Vec<DnsRecord>> = self
                .send_envelope(
                    self.client
                        .get(self.url(&format!("/zones/{}/dns_records", zone.id)))
                        .query(&[("page", page), ("per_page", DNS_PAGE_SIZE)]),
                    "Failed to list DNS records",
                )
                .await?;

            records.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }

        Ok(records)
    }

    async fn create_dns_record(&self, zone: &Zone, spec: &DnsRecordSpec) -> Result<DnsRecord> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would create DNS record in zone {} with payload: {}",
                zone.name,
                serde_json::to_string(spec)?
            );
            return Ok(DnsRecord {
                id: DRY_RUN_ID.to_string(),
                name: spec.name.clone(),
                record_type: spec.record_type.clone(),
                content: spec.content.clone(),
                proxied: spec.proxied,
                comment: Some(spec.comment.clone()),
            });
        }

        self.send(
            self.client
                .post(self.url(&format!("/zones/{}/dns_records", zone.id)))
                .json(spec),
            &format!("Failed to create DNS record {}", spec.name),
        )
        .await
    }

    async fn delete_dns_record(&self, zone: &Zone, record_id: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would delete DNS record {} in zone {}",
                record_id,
                zone.name
            );
            return Ok(());
        }

        self.send::<Value>(
            self.client
                .delete(self.url(&format!("/zones/{}/dns_records/{}", zone.id, record_id))),
            &format!("Failed to delete DNS record {}", record_id),
        )
        .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
