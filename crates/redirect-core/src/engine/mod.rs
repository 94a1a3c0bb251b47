//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Partitioning the desired redirects by zone
//! - Resolving each zone and fetching its current managed objects
//! - Replacing the managed objects with the desired ones
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ DesiredConfig │── partition ──┐
//! └───────────────┘               │
//!                                 ▼
//!                         ┌──────────────┐
//!                         │  Reconciler  │── one zone at a time
//!                         └──────────────┘
//!                                 │
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!        ┌──────────────────┐            ┌──────────────┐
//!        │ RedirectProvider │            │    Events    │
//!        │ (fetch / apply)  │            │   (notify)   │
//!        └──────────────────┘            └──────────────┘
//! ```
//!
//! ## Zone Flow
//!
//! Resolve zone → fetch existing → filter managed → remove stale (or build the
//! replacement set) → create desired (or submit the replacement) → done.
//!
//! Nothing is retried. The first failing zone ends the run; zones already
//! processed keep their changes.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::{DesiredConfig, ObjectModel, ReconcilerConfig};
use crate::error::Result;
use crate::model::{DnsRecordSpec, RedirectEntry, Rule, RulesetSpec, RulesetSummary, Zone};
use crate::traits::RedirectProvider;
use crate::zone;

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started { zones: usize },

    /// Zone processing started
    ZoneStarted { zone: String, entries: usize },

    /// Zone reconciled
    ZoneSucceeded {
        zone: String,
        placement: Placement,
        added: usize,
        removed: usize,
    },

    /// Zone failed; the run stops here
    ZoneFailed { zone: String, error: String },

    /// Legacy DNS cleanup failed (not fatal)
    CleanupFailed { zone: String, error: String },

    /// Every zone reconciled
    Finished { zones: usize },
}

/// Where a zone's managed redirects ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A new managed ruleset was created
    Created,
    /// The existing managed ruleset was replaced
    Updated,
    /// The zone was at the ruleset cap, so an existing ruleset was reused
    ReusedAtCap,
    /// Creation hit the provider's limit and an existing ruleset was reused
    ReusedAfterLimit,
    /// Managed DNS records were recreated
    Records,
}

/// Result of reconciling one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneOutcome {
    pub zone: String,
    pub zone_id: String,
    pub placement: Placement,
    /// Ruleset holding the managed rules (ruleset model only)
    pub ruleset_id: Option<String>,
    /// Managed objects removed
    pub removed: usize,
    /// Managed objects written
    pub added: usize,
    /// Unmanaged objects seen and left as they were
    pub preserved: usize,
    /// Managed DNS records removed by the legacy cleanup
    pub legacy_removed: usize,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub zones: Vec<ZoneOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// Total managed objects written across zones
    pub fn total_added(&self) -> usize {
        self.zones.iter().map(|z| z.added).sum()
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

/// Container choice for the ruleset model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerChoice<'a> {
    /// Replace the rules of this managed container
    Managed(&'a RulesetSummary),
    /// Zone is at the cap; reuse this container without trying to create
    ReuseAtCap(&'a RulesetSummary),
    /// Create a new managed container
    Create,
}

/// Pick the container for a zone's managed rules
///
/// The first managed container wins. Without one, a zone holding `cap` or
/// more redirect containers reuses the first of them. Ties always go to the
/// first container in the provider's listing order.
pub fn choose_container(rulesets: &[RulesetSummary], cap: usize) -> ContainerChoice<'_> {
    if let Some(managed) = rulesets.iter().find(|r| r.is_managed()) {
        return ContainerChoice::Managed(managed);
    }

    let same_purpose: Vec<&RulesetSummary> = rulesets
        .iter()
        .filter(|r| r.is_redirect_container())
        .collect();
    if same_purpose.len() >= cap
        && let Some(first) = same_purpose.first().copied()
    {
        return ContainerChoice::ReuseAtCap(first);
    }

    ContainerChoice::Create
}

/// Redirect reconciler
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run()`] once per sync
/// 3. Drop
///
/// The provider (and the credential inside it) is passed in at construction;
/// the engine reads no process-wide state.
pub struct Reconciler {
    /// Provider holding the remote objects
    provider: Box<dyn RedirectProvider>,

    /// Engine settings
    config: ReconcilerConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields sync events
    pub fn new(
        provider: Box<dyn RedirectProvider>,
        config: ReconcilerConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            provider,
            config,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Reconcile every zone of the desired config
    ///
    /// Zones are processed in the order they first appear in the config. The
    /// first zone error is returned, wrapped with the zone name.
    pub async fn run(&self, desired: &DesiredConfig) -> Result<SyncReport> {
        let started_at = Utc::now();
        let zones = zone::partition(desired);

        self.emit_event(SyncEvent::Started { zones: zones.len() });

        let mut outcomes = Vec::with_capacity(zones.len());
        for (zone_name, entries) in &zones {
            info!("Processing zone: {}", zone_name);
            self.emit_event(SyncEvent::ZoneStarted {
                zone: zone_name.clone(),
                entries: entries.len(),
            });

            match self.reconcile_zone(zone_name, entries).await {
                Ok(outcome) => {
                    info!(
                        "Zone {} reconciled ({:?}): {} added, {} removed, {} untouched",
                        zone_name, outcome.placement, outcome.added, outcome.removed, outcome.preserved
                    );
                    self.emit_event(SyncEvent::ZoneSucceeded {
                        zone: zone_name.clone(),
                        placement: outcome.placement,
                        added: outcome.added,
                        removed: outcome.removed,
                    });
                    outcomes.push(outcome);
                }
                Err(e) => {
                    let e = e.in_zone(zone_name.as_str());
                    debug!("Stopping run: {}", e);
                    self.emit_event(SyncEvent::ZoneFailed {
                        zone: zone_name.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        self.emit_event(SyncEvent::Finished {
            zones: outcomes.len(),
        });

        Ok(SyncReport {
            zones: outcomes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Reconcile a single zone against its desired entries
    pub async fn reconcile_zone(
        &self,
        zone_name: &str,
        entries: &[RedirectEntry],
    ) -> Result<ZoneOutcome> {
        let zone = self.provider.find_zone(zone_name).await?;
        debug!(
            "Resolved zone {} -> {} ({})",
            zone.name,
            zone.id,
            self.provider.provider_name()
        );

        match self.config.object_model {
            ObjectModel::Ruleset => self.sync_ruleset(&zone, entries).await,
            ObjectModel::DnsRecords => self.sync_dns_records(&zone, entries).await,
        }
    }

    /// Ruleset model: place the managed rules in one container, replaced in one call
    async fn sync_ruleset(&self, zone: &Zone, entries: &[RedirectEntry]) -> Result<ZoneOutcome> {
        let legacy_removed = if self.config.legacy_cleanup {
            self.cleanup_legacy_records(zone).await
        } else {
            0
        };

        let desired: Vec<Rule> = entries.iter().map(Rule::redirect).collect();
        info!(
            "Creating/updating redirect rules for {} redirects",
            desired.len()
        );

        let rulesets = self.provider.list_rulesets(zone).await?;
        let (container, placement) = match choose_container(&rulesets, self.config.ruleset_cap) {
            ContainerChoice::Managed(container) => (container, Placement::Updated),
            ContainerChoice::ReuseAtCap(container) => {
                warn!(
                    "Zone {} already has {} redirect rulesets (cap {}), reusing ruleset {}",
                    zone.name,
                    rulesets.iter().filter(|r| r.is_redirect_container()).count(),
                    self.config.ruleset_cap,
                    container.id
                );
                (container, Placement::ReusedAtCap)
            }
            ContainerChoice::Create => {
                let spec = RulesetSpec::managed(desired.clone());
                match self.provider.create_ruleset(zone, &spec).await {
                    Ok(created) => {
                        info!("Created ruleset {} for zone {}", created.id, zone.name);
                        return Ok(ZoneOutcome {
                            zone: zone.name.clone(),
                            zone_id: zone.id.clone(),
                            placement: Placement::Created,
                            ruleset_id: Some(created.id),
                            removed: 0,
                            added: desired.len(),
                            preserved: 0,
                            legacy_removed,
                        });
                    }
                    Err(e) if e.is_limit_exceeded() => {
                        let Some(fallback) = rulesets.iter().find(|r| r.is_redirect_container())
                        else {
                            return Err(e);
                        };
                        warn!(
                            "Ruleset creation refused for zone {} ({}), reusing ruleset {}",
                            zone.name, e, fallback.id
                        );
                        (fallback, Placement::ReusedAfterLimit)
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let current = self.provider.get_ruleset(zone, &container.id).await?;
        let owned = current.summary.is_managed();
        let (stale, foreign): (Vec<Rule>, Vec<Rule>) = current
            .rules
            .into_iter()
            .partition(|rule| rule.is_managed() || (owned && rule.is_legacy_redirect()));

        let removed = stale.len();
        let preserved = foreign.len();
        let added = desired.len();

        let mut rules: Vec<Rule> = foreign.into_iter().map(Rule::into_resubmittable).collect();
        rules.extend(desired);

        // A reused container keeps its own metadata; only the rules change
        let spec = if owned {
            RulesetSpec::managed(rules)
        } else {
            RulesetSpec::reusing(&current.summary, rules)
        };
        self.provider
            .update_ruleset(zone, &container.id, &spec)
            .await?;
        info!("Updated ruleset {} for zone {}", container.id, zone.name);

        Ok(ZoneOutcome {
            zone: zone.name.clone(),
            zone_id: zone.id.clone(),
            placement,
            ruleset_id: Some(container.id.clone()),
            removed,
            added,
            preserved,
            legacy_removed,
        })
    }

    /// DNS record model: delete every managed record, then create one per entry
    async fn sync_dns_records(&self, zone: &Zone, entries: &[RedirectEntry]) -> Result<ZoneOutcome> {
        // Build every payload first so a bad target fails before anything is deleted
        let specs = entries
            .iter()
            .map(DnsRecordSpec::cname_for)
            .collect::<Result<Vec<_>>>()?;

        let (removed, preserved) = self.remove_managed_records(zone).await?;

        for spec in &specs {
            info!("Creating DNS record: {} -> {}", spec.name, spec.content);
            self.provider.create_dns_record(zone, spec).await?;
        }

        Ok(ZoneOutcome {
            zone: zone.name.clone(),
            zone_id: zone.id.clone(),
            placement: Placement::Records,
            ruleset_id: None,
            removed,
            added: specs.len(),
            preserved,
            legacy_removed: 0,
        })
    }

    /// Best-effort removal of managed DNS records from the record-based model
    ///
    /// Returns the number of records removed; failures are logged and swallowed.
    async fn cleanup_legacy_records(&self, zone: &Zone) -> usize {
        match self.remove_managed_records(zone).await {
            Ok((removed, _)) => removed,
            Err(e) => {
                warn!("Failed to clean up old DNS records in {}: {}", zone.name, e);
                self.emit_event(SyncEvent::CleanupFailed {
                    zone: zone.name.clone(),
                    error: e.to_string(),
                });
                0
            }
        }
    }

    /// Delete every managed DNS record of a zone
    ///
    /// Returns (removed, unmanaged records left in place).
    async fn remove_managed_records(&self, zone: &Zone) -> Result<(usize, usize)> {
        let records = self.provider.list_dns_records(zone).await?;
        let (managed, unmanaged): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.is_managed());

        for record in &managed {
            info!("Deleting old DNS record: {}", record.name);
            self.provider.delete_dns_record(zone, &record.id).await?;
        }

        Ok((managed.len(), unmanaged.len()))
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
