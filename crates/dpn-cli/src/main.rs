//! DPN Command Line Interface
//!
//! This crate contains the `dpn` tool that checks Data Petri Nets for
//! soundness, refines their transitions and repairs unsound nets by
//! tightening guards. Nets are read from JSON descriptions, results are
//! written as JSON.

use std::time::Instant;

use clap::Parser;
#[cfg(feature = "dot")]
use cli::explore_net;
use cli::{
    Cli, initialize_logger, load_config, parse_input_file, parse_parameters, run_with_timeout,
};
use dpn_constraints::oracle::IntervalOracle;
use dpn_soundness::{
    analyzer::SoundnessAnalyzer, refinement::TransitionRefiner, repair::SoundnessRepairer,
};
use human_panic::setup_panic;
use log::{debug, info};

use crate::cli::output::{CheckReport, RefineReport, RepairReport, Timings, write_report};

mod cli;
mod dpn_config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_panic!();

    // parse the cli arguments
    let cli = Cli::parse();
    initialize_logger(cli.log_config)?;

    match cli.command {
        cli::Commands::Check {
            run,
            soundness_type,
        } => {
            let mut config = load_config(run.config_file.as_ref())?;
            if let Some(ty) = soundness_type {
                config.set_soundness_type(ty.into());
            }
            let soundness_type = config.soundness_type();

            let start = Instant::now();
            let net = parse_input_file(&run.input_file)?;
            let parsing = start.elapsed();
            debug!("Parsed net: {net}");

            let name = net.name().to_string();
            let start = Instant::now();
            let props = run_with_timeout(run.timeout.or(config.timeout()), move || {
                let oracle = IntervalOracle::new();
                SoundnessAnalyzer::new(&oracle).check(&net, soundness_type)
            })?;
            let analysis = start.elapsed();

            info!(
                "Net '{name}' is {}{soundness_type} sound",
                if props.is_sound() { "" } else { "not " }
            );
            let report = CheckReport::new(&name, &props, Timings::new(parsing, analysis));
            write_report(&report, run.output)?;
            Ok(())
        }
        cli::Commands::Repair { run, parameters } => {
            let config = load_config(run.config_file.as_ref())?;
            let repair_config = config
                .repair_config()
                .with_parameters(&parse_parameters(&parameters)?)?;
            debug!("Repair configuration: {repair_config:?}");

            let net = parse_input_file(&run.input_file)?;
            let result = run_with_timeout(run.timeout.or(config.timeout()), move || {
                let oracle = IntervalOracle::new();
                SoundnessRepairer::new(&oracle, repair_config).repair(&net)
            })?;

            info!(
                "Repair {} after {} steps in {:?}",
                result.outcome, result.repair_steps, result.repair_time
            );
            write_report(&RepairReport::from(&result), run.output)?;
            Ok(())
        }
        cli::Commands::Refine {
            run,
            base_structure,
        } => {
            let config = load_config(run.config_file.as_ref())?;
            let mut refinement_config = config.refinement_config();
            if let Some(base_structure) = base_structure {
                refinement_config.base_structure = base_structure.into();
            }
            debug!("Refinement configuration: {refinement_config:?}");

            let net = parse_input_file(&run.input_file)?;
            let result = run_with_timeout(run.timeout.or(config.timeout()), move || {
                let oracle = IntervalOracle::new();
                TransitionRefiner::new(&oracle, refinement_config).refine(&net)
            })?;

            info!(
                "Refined net has {} transitions after {} iterations",
                result.net.transition_count(),
                result.iterations
            );
            write_report(&RefineReport::from(&result), run.output)?;
            Ok(())
        }
        #[cfg(feature = "dot")]
        cli::Commands::Explore {
            input_file,
            kind,
            colored,
            output,
        } => {
            let net = parse_input_file(&input_file)?;
            explore_net(&net, kind, colored, output)?;
            Ok(())
        }
    }
}
