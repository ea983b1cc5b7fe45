//! Test CLI commands
#[cfg(test)]
use serial_test::serial;

#[cfg(test)]
#[serial]
mod test_cli {
    use std::{
        env, fs,
        process::{Command, Output},
    };

    use serde_json::Value;

    /// Run the `dpn` binary with `args`
    fn dpn(args: &[&str]) -> Output {
        Command::new("cargo")
            .arg("run")
            .arg("--")
            .args(args)
            .output()
            .unwrap_or_else(|err| panic!("Failed to execute: {err}"))
    }

    /// Assert that the command succeeded and decode its JSON output
    fn successful_json(output: Output) -> Value {
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(
            output.status.success(),
            "Failed to execute command: stdout: {}; stderr: {}",
            stdout,
            String::from_utf8(output.stderr).unwrap()
        );
        serde_json::from_str(&stdout)
            .unwrap_or_else(|err| panic!("Output is not valid JSON ({err}): {stdout}"))
    }

    #[test]
    fn test_help() {
        let output = dpn(&["--help"]);

        assert!(
            output.status.success(),
            "Failed to execute command: stdout: {}; stderr: {}",
            String::from_utf8(output.stdout).unwrap(),
            String::from_utf8(output.stderr).unwrap()
        );
    }

    #[test]
    fn test_cli_check_sound_net() {
        let report = successful_json(dpn(&["check", "./tests/resources/sequence.json"]));

        assert_eq!(report["net"], "sequence");
        assert_eq!(report["soundnessType"], "classical");
        assert_eq!(report["isSound"], true);
        assert_eq!(report["deadlocks"], 0);
    }

    #[test]
    fn test_cli_check_unsound_net() {
        let report = successful_json(dpn(&["check", "./tests/resources/unreachable_final.json"]));

        assert_eq!(report["isSound"], false);
        assert_eq!(report["deadTransitions"], serde_json::json!(["t2"]));
    }

    #[test]
    fn test_cli_check_debug() {
        let report = successful_json(dpn(&["-d", "check", "./tests/resources/approval.json"]));
        assert_eq!(report["net"], "approval");
    }

    #[test]
    fn test_cli_check_logger_config() {
        let report = successful_json(dpn(&[
            "--logger-config-file",
            "./tests/resources/log_config.yaml",
            "check",
            "./tests/resources/sequence.json",
        ]));
        assert_eq!(report["isSound"], true);
    }

    #[test]
    fn test_cli_check_relaxed_lazy() {
        let report = successful_json(dpn(&[
            "check",
            "-s",
            "relaxed-lazy",
            "./tests/resources/unreachable_final.json",
        ]));

        assert_eq!(report["soundnessType"], "relaxed-lazy");
        assert_eq!(report["isSound"], false);
        assert_eq!(
            report["unfeasibleTransitions"],
            serde_json::json!(["t1", "t2"])
        );
    }

    #[test]
    fn test_cli_check_config_file() {
        let report = successful_json(dpn(&[
            "check",
            "-f",
            "./tests/resources/config.yaml",
            "./tests/resources/sequence.json",
        ]));
        assert_eq!(report["soundnessType"], "relaxed-lazy");
    }

    #[test]
    fn test_cli_check_missing_config_file() {
        let output = dpn(&[
            "check",
            "-f",
            "./tests/resources/missing.yaml",
            "./tests/resources/sequence.json",
        ]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_check_output_file() {
        let path = env::temp_dir().join("dpn_check_report.json");
        let output = dpn(&[
            "check",
            "-o",
            path.to_str().unwrap(),
            "./tests/resources/sequence.json",
        ]);
        assert!(output.status.success());

        let report: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["isSound"], true);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_cli_repair() {
        let report = successful_json(dpn(&[
            "repair",
            "./tests/resources/repairable.json",
            "-t",
            "60",
        ]));

        assert_eq!(report["outcome"], "succeeded");
        assert_eq!(report["isSuccess"], true);
        assert_eq!(report["repairSteps"], 1);
        assert_eq!(report["guardChanges"][0]["transition"], "t1");
        assert_eq!(report["repairedNet"]["transitions"][0]["id"], "t1");
    }

    #[test]
    fn test_cli_repair_unrepairable() {
        let report = successful_json(dpn(&["repair", "./tests/resources/unreachable_final.json"]));

        assert_eq!(report["outcome"], "failed");
        assert_eq!(report["isSuccess"], false);
    }

    #[test]
    fn test_cli_repair_with_parameters() {
        let report = successful_json(dpn(&[
            "repair",
            "-p",
            "max_iterations=0",
            "-p",
            "base_structure=coverability-graph",
            "./tests/resources/repairable.json",
        ]));
        assert_eq!(report["outcome"], "inconclusive");
    }

    #[test]
    fn test_cli_repair_invalid_parameter() {
        let output = dpn(&[
            "repair",
            "-p",
            "max_iterations=many",
            "./tests/resources/repairable.json",
        ]);
        assert!(!output.status.success());

        let output = dpn(&[
            "repair",
            "-p",
            "max_iterations",
            "./tests/resources/repairable.json",
        ]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_refine() {
        for base_structure in ["reachability-graph", "coverability-graph"] {
            let report = successful_json(dpn(&[
                "refine",
                "-b",
                base_structure,
                "./tests/resources/loop.json",
            ]));

            assert_eq!(
                report["splitTransitions"]["write"],
                serde_json::json!(["write.0", "write.1"])
            );
            assert_eq!(
                report["refinedNet"]["transitions"]
                    .as_array()
                    .unwrap()
                    .len(),
                5
            );
        }
    }

    #[cfg(feature = "dot")]
    #[test]
    fn test_cli_explore() {
        for kind in [
            "reachability-graph",
            "constraint-graph",
            "coverability-graph",
            "coverability-tree",
        ] {
            let output = dpn(&[
                "explore",
                "-k",
                kind,
                "--colored",
                "./tests/resources/sequence.json",
            ]);
            let stdout = String::from_utf8(output.stdout).unwrap();

            assert!(output.status.success(), "Failed to explore {kind}");
            assert!(stdout.starts_with("digraph \"sequence\""), "{stdout}");
        }
    }

    #[test]
    fn test_cli_missing_input() {
        let output = dpn(&["check", "./tests/resources/missing.json"]);
        assert!(!output.status.success());
    }
}

#[cfg(test)]
mod parse_resource_files {
    use std::fs;

    use dpn_constraints::oracle::IntervalOracle;
    use dpn_soundness::analyzer::{SoundnessAnalyzer, SoundnessType};
    use walkdir::WalkDir;

    const RESOURCE_FOLDER: &str = "./tests/resources";

    /// Every net description shipped with the tests must parse and be
    /// analyzable
    #[test]
    fn test_all_resources_can_be_analyzed() {
        let oracle = IntervalOracle::new();
        let analyzer = SoundnessAnalyzer::new(&oracle);
        let mut count = 0;

        for entry in WalkDir::new(RESOURCE_FOLDER)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let f_name = entry.file_name().to_string_lossy();
            if !f_name.ends_with(".json") {
                continue;
            }

            let description = fs::read_to_string(entry.path()).unwrap_or_else(|err| {
                panic!(
                    "Failed to read file {}: {}",
                    entry.path().to_string_lossy(),
                    err
                )
            });
            let net = dpn_parser::parse_net(&description).unwrap_or_else(|err| {
                panic!(
                    "Failed to parse net from file {}: {}",
                    entry.path().to_string_lossy(),
                    err
                )
            });

            for ty in [SoundnessType::Classical, SoundnessType::RelaxedLazy] {
                let props = analyzer.check(&net, ty);
                assert_eq!(props.soundness_type(), ty);
            }
            count += 1;
        }

        assert_eq!(count, 5);
    }
}
