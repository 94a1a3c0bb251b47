// # Zone Partitioning
//
// Groups source domains by the zone that owns them.
//
// The zone of a domain is its last two dot-separated labels:
// `blog.example.com` -> `example.com`. Multi-label public suffixes are not
// recognised, so `shop.example.co.uk` lands in `co.uk`.

use indexmap::IndexMap;

use crate::config::DesiredConfig;
use crate::model::RedirectEntry;

/// Zone name → entries for that zone, both in first-seen order
pub type ZonePartition = IndexMap<String, Vec<RedirectEntry>>;

/// Zone name for a source domain
pub fn zone_name(source: &str) -> String {
    let labels: Vec<&str> = source.split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

/// Group the desired redirects by zone
///
/// Deterministic: the same config always yields the same zones in the same
/// order with the same entry order.
pub fn partition(config: &DesiredConfig) -> ZonePartition {
    let mut zones = ZonePartition::new();
    for entry in config.entries() {
        zones.entry(zone_name(&entry.source)).or_default().push(entry);
    }
    zones
}

/// Number of distinct zones the config touches
pub fn distinct_zones(config: &DesiredConfig) -> usize {
    config
        .redirects
        .keys()
        .map(|source| zone_name(source))
        .collect::<std::collections::HashSet<_>>()
        .len()
}
