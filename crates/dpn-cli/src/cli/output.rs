//! JSON reports written by the `check`, `repair` and `refine` commands

use std::{collections::{BTreeMap, BTreeSet}, fs, path::PathBuf, time::Duration};

use anyhow::Context;
use dpn_parser::NetDescription;
use dpn_soundness::{
    analyzer::SoundnessProperties, refinement::RefinementResult, repair::RepairResult,
};
use log::info;
use serde::Serialize;

/// Time spent on a command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Timings {
    /// Time for parsing the input, in milliseconds
    pub(crate) parsing_ms: u128,
    /// Time for the analysis, in milliseconds
    pub(crate) analysis_ms: u128,
}

impl Timings {
    pub(crate) fn new(parsing: Duration, analysis: Duration) -> Self {
        Self {
            parsing_ms: parsing.as_millis(),
            analysis_ms: analysis.as_millis(),
        }
    }
}

/// Result of the `check` command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckReport {
    net: String,
    soundness_type: String,
    boundedness: bool,
    dead_transitions: Vec<String>,
    unfeasible_transitions: Vec<String>,
    deadlocks: usize,
    is_sound: bool,
    timings: Timings,
}

impl CheckReport {
    pub(crate) fn new(net: &str, props: &SoundnessProperties, timings: Timings) -> Self {
        Self {
            net: net.to_string(),
            soundness_type: props.soundness_type().to_string(),
            boundedness: props.boundedness(),
            dead_transitions: props.dead_transitions().iter().cloned().collect(),
            unfeasible_transitions: props.unfeasible_transitions().iter().cloned().collect(),
            deadlocks: props.deadlocks(),
            is_sound: props.is_sound(),
            timings,
        }
    }
}

/// Guard changed by a repair
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GuardChangeReport {
    transition: String,
    before: String,
    after: String,
}

/// Result of the `repair` command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepairReport {
    outcome: String,
    is_success: bool,
    repair_steps: usize,
    /// Time spent repairing, in milliseconds
    repair_time: u128,
    guard_changes: Vec<GuardChangeReport>,
    repaired_net: NetDescription,
}

impl From<&RepairResult> for RepairReport {
    fn from(result: &RepairResult) -> Self {
        Self {
            outcome: result.outcome.to_string(),
            is_success: result.is_success(),
            repair_steps: result.repair_steps,
            repair_time: result.repair_time.as_millis(),
            guard_changes: result
                .guard_changes
                .iter()
                .map(|change| GuardChangeReport {
                    transition: change.transition.clone(),
                    before: change.before.to_string(),
                    after: change.after.to_string(),
                })
                .collect(),
            repaired_net: NetDescription::from_net(&result.net),
        }
    }
}

/// Result of the `refine` command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefineReport {
    base_structure: String,
    iterations: usize,
    split_transitions: BTreeMap<String, Vec<String>>,
    truncated_transitions: BTreeSet<String>,
    refined_net: NetDescription,
}

impl From<&RefinementResult> for RefineReport {
    fn from(result: &RefinementResult) -> Self {
        Self {
            base_structure: result.base_structure_kind.to_string(),
            iterations: result.iterations,
            split_transitions: result.split_transitions.clone(),
            truncated_transitions: result.truncated_transitions.clone(),
            refined_net: NetDescription::from_net(&result.net),
        }
    }
}

/// Write `report` as JSON to `output`, or to stdout if no file is given
pub(crate) fn write_report<T: Serialize>(
    report: &T,
    output: Option<PathBuf>,
) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(report).with_context(|| "Failed to encode report")?;

    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| "Failed to write output file")?;
            info!("Wrote report to '{}'", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use dpn_constraints::oracle::IntervalOracle;
    use dpn_soundness::{
        analyzer::{SoundnessAnalyzer, SoundnessType},
        refinement::{RefinementConfig, TransitionRefiner},
        repair::{RepairConfig, SoundnessRepairer},
    };

    use super::*;

    const SEQUENCE: &str = include_str!("../../tests/resources/sequence.json");
    const LOOP: &str = include_str!("../../tests/resources/loop.json");

    #[test]
    fn test_check_report_keys() {
        let net = dpn_parser::parse_net(SEQUENCE).unwrap();
        let oracle = IntervalOracle::new();
        let props = SoundnessAnalyzer::new(&oracle).check(&net, SoundnessType::Classical);

        let report = CheckReport::new(
            net.name(),
            &props,
            Timings::new(Duration::from_millis(1), Duration::from_millis(2)),
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["soundnessType"], "classical");
        assert_eq!(value["isSound"], true);
        assert_eq!(value["boundedness"], true);
        assert_eq!(value["deadTransitions"], serde_json::json!([]));
        assert_eq!(value["deadlocks"], 0);
        assert_eq!(value["timings"]["analysisMs"], 2);
    }

    #[test]
    fn test_repair_report_keys() {
        let net = dpn_parser::parse_net(SEQUENCE).unwrap();
        let oracle = IntervalOracle::new();
        let result = SoundnessRepairer::new(&oracle, RepairConfig::default()).repair(&net);

        let value = serde_json::to_value(RepairReport::from(&result)).unwrap();
        assert_eq!(value["isSuccess"], true);
        assert_eq!(value["repairSteps"], 0);
        assert_eq!(value["outcome"], "succeeded");
        assert_eq!(value["repairedNet"]["name"], "sequence");
    }

    #[test]
    fn test_refine_report_lists_cut_transitions() {
        let net = dpn_parser::parse_net(LOOP).unwrap();
        let oracle = IntervalOracle::new();

        let result = TransitionRefiner::new(&oracle, RefinementConfig::default()).refine(&net);
        let value = serde_json::to_value(RefineReport::from(&result)).unwrap();
        assert_eq!(value["truncatedTransitions"], serde_json::json!([]));
        assert_eq!(
            value["splitTransitions"]["write"],
            serde_json::json!(["write.0", "write.1"])
        );

        let config = RefinementConfig {
            max_split_conditions: Some(0),
            ..RefinementConfig::default()
        };
        let result = TransitionRefiner::new(&oracle, config).refine(&net);
        let value = serde_json::to_value(RefineReport::from(&result)).unwrap();
        assert_eq!(value["truncatedTransitions"], serde_json::json!(["write"]));
        assert_eq!(value["splitTransitions"], serde_json::json!({}));
    }
}
