// # redirect-core
//
// Core library for reconciling a declared redirect map against a DNS/CDN
// provider.
//
// ## Architecture Overview
//
// - **DesiredConfig**: the validated `redirects.json` document
// - **zone**: partitioning of source domains into provider zones
// - **RedirectProvider**: capability trait over the provider's remote objects
// - **Reconciler**: fetch → diff → apply, one zone at a time
//
// ## Design Principles
//
// 1. **Validate first**: no network call happens before the document is sound
// 2. **Full pass**: every run rebuilds the managed set, nothing is persisted
// 3. **Marked ownership**: only objects carrying the sentinel marker are touched
// 4. **Library-first**: the binaries only read the environment and wire parts

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{DesiredConfig, ObjectModel, ReconcilerConfig, ValidatedConfig};
pub use engine::{Placement, Reconciler, SyncEvent, SyncReport, ZoneOutcome};
pub use error::{Error, Result};
pub use model::{DnsRecord, RedirectEntry, Rule, Ruleset, RulesetSummary, Zone};
pub use traits::RedirectProvider;
