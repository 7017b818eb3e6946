//! Reconciliation of the user's configuration with a release's defaults.
//!
//! The merge is an additive union: the fetched defaults are the starting
//! point, every value from the user's prior configuration is written over
//! them, and nothing present in either document is ever dropped. Keys the
//! user still carries but the new defaults no longer mention are kept and
//! reported as stale so they show up in the log.

use crate::config::ConfigDocument;

/// A `(section, key)` pair named in a [`MergeReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedKey {
    pub section: String,
    pub key: String,
}

impl std::fmt::Display for MergedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.section, self.key)
    }
}

/// What a merge did besides producing the merged document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// User keys whose value differs from the new default.
    pub overridden: Vec<MergedKey>,
    /// User keys absent from the new defaults, carried forward anyway.
    pub stale: Vec<MergedKey>,
}

impl MergeReport {
    #[must_use]
    pub fn has_stale_keys(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Merge `overrides` (the prior user configuration) onto `base` (the fresh
/// defaults).
///
/// Section and key order follows `base`; sections and keys found only in
/// `overrides` are appended in the order they appear there.
#[must_use]
pub fn merge(base: &ConfigDocument, overrides: &ConfigDocument) -> ConfigDocument {
    merge_with_report(base, overrides).0
}

/// Like [`merge`], also reporting overridden and stale keys.
#[must_use]
pub fn merge_with_report(
    base: &ConfigDocument,
    overrides: &ConfigDocument,
) -> (ConfigDocument, MergeReport) {
    let mut merged = base.clone();
    let mut report = MergeReport::default();

    for section in overrides.sections() {
        for (key, value) in section.entries() {
            let record = MergedKey {
                section: section.name().to_string(),
                key: key.to_string(),
            };
            match base.get(section.name(), key) {
                None => report.stale.push(record),
                Some(default) if default != value => report.overridden.push(record),
                Some(_) => {}
            }
            merged.set(section.name(), key, value);
        }

        // keep empty user sections too
        merged.section_mut_or_insert(section.name());
    }

    (merged, report)
}
