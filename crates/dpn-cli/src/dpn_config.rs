//! Configuration options of the soundness checker, the refiner and the
//! repairer
//!
//! Options are read from an optional configuration file and from environment
//! variables with the prefix `DPN` (nested keys are separated by `__`, e.g.
//! `DPN_REPAIR__MAX_ITERATIONS=20`).

use serde::Deserialize;

use dpn_soundness::{
    analyzer::SoundnessType, refinement::RefinementConfig, repair::RepairConfig,
};

/// Type representing configuration options of the `dpn` tool
///
/// This type implements `serde::Deserialize` so that it can be read from
/// structured configuration files.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct DpnConfig {
    /// Soundness notion checked by default
    soundness_type: Option<SoundnessType>,
    /// Options of the `refine` command
    refinement: Option<RefinementConfig>,
    /// Options of the `repair` command
    repair: Option<RepairConfig>,
    /// Default timeout in seconds
    timeout: Option<u64>,
}

impl DpnConfig {
    /// Soundness notion to check, classical soundness if not configured
    pub fn soundness_type(&self) -> SoundnessType {
        self.soundness_type.unwrap_or_default()
    }

    /// Override the soundness notion
    pub fn set_soundness_type(&mut self, soundness_type: SoundnessType) {
        self.soundness_type = Some(soundness_type);
    }

    /// Configuration of the refiner
    pub fn refinement_config(&self) -> RefinementConfig {
        self.refinement.clone().unwrap_or_default()
    }

    /// Configuration of the repairer
    pub fn repair_config(&self) -> RepairConfig {
        self.repair.clone().unwrap_or_default()
    }

    /// Configured timeout in seconds
    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use dpn_soundness::refinement::BaseStructure;

    use super::*;

    #[test]
    fn test_dpn_config() {
        let json_data = r#"{
            "soundness_type": "relaxed-lazy",
            "refinement": {
                "base_structure": "coverability-graph"
            },
            "repair": {
                "merge_split_transitions": false,
                "refinement": { "max_iterations": 3, "max_split_conditions": 6 }
            },
            "timeout": 30
        }"#;

        let config: DpnConfig = serde_json::from_str(json_data).unwrap();

        assert_eq!(config.soundness_type(), SoundnessType::RelaxedLazy);
        assert_eq!(
            config.refinement_config(),
            RefinementConfig {
                base_structure: BaseStructure::CoverabilityGraph,
                max_iterations: 10,
                max_split_conditions: None,
            }
        );

        let repair = config.repair_config();
        assert!(!repair.merge_split_transitions);
        assert_eq!(repair.max_iterations, 50);
        assert_eq!(
            repair.refinement.base_structure,
            BaseStructure::ReachabilityGraph
        );
        assert_eq!(repair.refinement.max_iterations, 3);
        assert_eq!(repair.refinement.max_split_conditions, Some(6));
        assert_eq!(config.timeout(), Some(30));
    }

    #[test]
    fn test_default_dpn_config() {
        let mut config: DpnConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DpnConfig::default());
        assert_eq!(config.soundness_type(), SoundnessType::Classical);
        assert_eq!(config.repair_config(), RepairConfig::default());
        assert_eq!(config.timeout(), None);

        config.set_soundness_type(SoundnessType::RelaxedLazy);
        assert_eq!(config.soundness_type(), SoundnessType::RelaxedLazy);
    }
}
