use std::collections::HashMap;

use crate::config::PortalConfig;
use crate::models::SeverityTier;

/// Classification label → display tier. Open table: unknown labels get the
/// default tier, and configuration may add or override entries.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityTable {
    entries: HashMap<String, SeverityTier>,
    fallback: SeverityTier,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::empty(SeverityTier::Secondary)
            .with_entry("no tumour", SeverityTier::Success)
            .with_entry("glioma", SeverityTier::Destructive)
            .with_entry("meningioma", SeverityTier::Warning)
            .with_entry("pituitary", SeverityTier::Info)
    }
}

fn normalise(label: &str) -> String {
    label.trim().to_lowercase()
}

impl SeverityTable {
    pub fn empty(fallback: SeverityTier) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    /// Default table with the configured overrides applied on top.
    pub fn from_config(config: &PortalConfig) -> Self {
        config
            .severity_overrides
            .iter()
            .fold(Self::default(), |table, (label, tier)| table.with_entry(label, *tier))
    }

    pub fn with_entry(mut self, label: &str, tier: SeverityTier) -> Self {
        self.entries.insert(normalise(label), tier);
        self
    }

    /// Case-insensitive lookup. The label itself is never altered.
    pub fn tier_for(&self, label: &str) -> SeverityTier {
        self.entries
            .get(&normalise(label))
            .copied()
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers() {
        let table = SeverityTable::default();
        assert_eq!(table.tier_for("No Tumour"), SeverityTier::Success);
        assert_eq!(table.tier_for("glioma"), SeverityTier::Destructive);
        assert_eq!(table.tier_for("Meningioma"), SeverityTier::Warning);
        assert_eq!(table.tier_for(" PITUITARY "), SeverityTier::Info);
    }

    #[test]
    fn unknown_labels_use_fallback() {
        let table = SeverityTable::default();
        assert_eq!(table.tier_for("schwannoma"), SeverityTier::Secondary);
        assert_eq!(table.tier_for(""), SeverityTier::Secondary);
        let strict = SeverityTable::empty(SeverityTier::Warning);
        assert_eq!(strict.tier_for("glioma"), SeverityTier::Warning);
    }

    #[test]
    fn config_overrides_apply_on_top() {
        let config = PortalConfig {
            severity_overrides: vec![
                ("Glioma".into(), SeverityTier::Warning),
                ("schwannoma".into(), SeverityTier::Info),
            ],
            ..PortalConfig::default()
        };
        let table = SeverityTable::from_config(&config);
        assert_eq!(table.tier_for("glioma"), SeverityTier::Warning);
        assert_eq!(table.tier_for("Schwannoma"), SeverityTier::Info);
        assert_eq!(table.tier_for("pituitary"), SeverityTier::Info);
    }
}
