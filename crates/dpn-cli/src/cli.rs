//! Command Line Interface
//!
//! The `dpn` tool uses the `clap` crate to parse command line arguments. This
//! module defines all available commands and options (and their
//! documentation) as well as the utility functions applying these options.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::Config as Settings;
use dpn_constraints::oracle::IntervalOracle;
use dpn_net::net::DataPetriNet;
use dpn_soundness::{analyzer::SoundnessType, refinement::BaseStructure};
#[cfg(feature = "dot")]
use dpn_state_space::{
    ConstraintStateGraph, CoverabilityGraph, CoverabilityTree, ReachabilityGraph, StateSpace,
    dot::ToDOT, strategy::ExplorationStrategy,
};
use log::{LevelFilter, debug, info, warn};
use log4rs::{
    Config,
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

use crate::dpn_config::DpnConfig;

pub(crate) mod output;

/// Soundness checking and repair of Data Petri Nets - Command Line Interface
///
/// Nets are read from JSON descriptions. Results are written as JSON to
/// stdout or to the file given with `--output`, log messages go to stderr.
/// You can use the --help / -h flag to get all available commands and
/// options.
#[derive(Parser, Debug)]
#[command(version, name = "dpn", about, long_about)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) log_config: LoggerConfig,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Check whether the net is sound
    Check {
        #[command(flatten)]
        run: RunOptions,

        /// Soundness notion to check (default: classical)
        #[arg(short, long, value_name = "SOUNDNESS_TYPE")]
        soundness_type: Option<SoundnessTypeOption>,
    },
    /// Tighten guards until the net is sound
    Repair {
        #[command(flatten)]
        run: RunOptions,

        /// Repair parameter given as `key=value`, may be repeated
        ///
        /// Accepted keys: `merge_split_transitions`, `max_iterations`,
        /// `base_structure`, `max_refinement_iterations`,
        /// `max_split_conditions`
        #[arg(short, long = "parameter", value_name = "KEY=VALUE")]
        parameters: Vec<String>,
    },
    /// Split transitions on cycles into variants with disjoint guards
    Refine {
        #[command(flatten)]
        run: RunOptions,

        /// State space whose cycles drive the refinement
        #[arg(short, long, value_name = "BASE_STRUCTURE")]
        base_structure: Option<BaseStructureOption>,
    },
    #[cfg(feature = "dot")]
    /// Explore a state space of the net and print it in the DOT format
    Explore {
        /// JSON description of the net
        input_file: PathBuf,

        /// State space to explore
        #[arg(short, long, value_enum, default_value_t = StateSpaceOption::CoverabilityGraph)]
        kind: StateSpaceOption,

        /// Color states by whether they can reach the final marking
        #[arg(short, long, default_value_t = false)]
        colored: bool,

        /// File to write the DOT graph to, stdout if not given
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,
    },
}

/// Options shared by the analysis commands
#[derive(Args, Debug)]
pub(crate) struct RunOptions {
    /// JSON description of the net
    pub(crate) input_file: PathBuf,

    /// Configuration file
    #[arg(short = 'f', long, value_name = "CONFIG_FILE")]
    pub(crate) config_file: Option<PathBuf>,

    /// Abort after the given number of seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub(crate) timeout: Option<u64>,

    /// File to write the JSON result to, stdout if not given
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum SoundnessTypeOption {
    /// Boundedness, no deadlocks, proper completion, no dead transitions
    Classical,
    /// Every transition can be part of a run reaching the final marking
    RelaxedLazy,
}

impl From<SoundnessTypeOption> for SoundnessType {
    fn from(value: SoundnessTypeOption) -> Self {
        match value {
            SoundnessTypeOption::Classical => SoundnessType::Classical,
            SoundnessTypeOption::RelaxedLazy => SoundnessType::RelaxedLazy,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum BaseStructureOption {
    /// Reachability graph (default)
    ReachabilityGraph,
    /// Coverability graph
    CoverabilityGraph,
}

impl From<BaseStructureOption> for BaseStructure {
    fn from(value: BaseStructureOption) -> Self {
        match value {
            BaseStructureOption::ReachabilityGraph => BaseStructure::ReachabilityGraph,
            BaseStructureOption::CoverabilityGraph => BaseStructure::CoverabilityGraph,
        }
    }
}

#[cfg(feature = "dot")]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum StateSpaceOption {
    /// Reachability graph without silent negation steps
    ReachabilityGraph,
    /// Reachability graph with silent negation steps
    ConstraintGraph,
    /// Coverability graph (default)
    CoverabilityGraph,
    /// Coverability tree
    CoverabilityTree,
}

#[derive(Debug, Args)]
pub(crate) struct LoggerConfig {
    /// Read the logger configuration from file.
    /// Logger configuration can be provided in the log4rs configuration file format.
    #[arg(long)]
    logger_config_file: Option<String>,

    /// Enable debug output.
    /// **Note**: This flag must be passed first, before any command.
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

/// Initialize the logger as specified in `cfg`
///
/// By default the logger writes to stderr, so that results printed to stdout
/// stay machine readable. If a log4rs configuration file is given in `cfg`,
/// the configuration from that file will be used instead.
pub(crate) fn initialize_logger(cfg: LoggerConfig) -> Result<(), anyhow::Error> {
    if let Some(f) = cfg.logger_config_file {
        log4rs::init_file(f, Default::default())
            .with_context(|| "Failed to read logger config file")?;
        return Ok(());
    }

    let p_encoder = match cfg.debug {
        true => PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} - {h({l})} - [{f}:{L} - {M}] - {m}{n}"),
        false => PatternEncoder::new("{d(%H:%M:%S)} - {h({l})} - {m}{n}"),
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(p_encoder))
        .build();

    let level = if cfg.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .with_context(|| "Failed to initialize logger")?;

    log4rs::init_config(log_config).with_context(|| "Failed to initialize console logger")?;
    Ok(())
}

/// Load the configuration from `config_file` and the environment
///
/// Environment variables use the prefix `DPN` and take precedence over the
/// file.
pub(crate) fn load_config(config_file: Option<&PathBuf>) -> Result<DpnConfig, anyhow::Error> {
    let mut settings = Settings::builder();
    if let Some(config_file) = config_file {
        if !config_file.exists() {
            return Err(anyhow!(
                "Specified configuration file '{}' does not exist.",
                config_file.display()
            ));
        }
        settings = settings.add_source(config::File::from(config_file.clone()));
    }

    settings = settings.add_source(
        config::Environment::with_prefix("DPN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = settings
        .build()?
        .try_deserialize::<DpnConfig>()
        .with_context(|| "Malformed configuration")?;
    debug!("Loaded configuration: {config:?}");
    Ok(config)
}

/// Read the net described in `input_file`
pub(crate) fn parse_input_file(input_file: &Path) -> Result<DataPetriNet, anyhow::Error> {
    let f = fs::read_to_string(input_file).with_context(|| "Unable to read net description")?;
    let net = dpn_parser::parse_net(&f)
        .with_context(|| format!("Failed to parse '{}'", input_file.display()))?;

    info!(
        "Parsed net '{}' with {} places and {} transitions",
        net.name(),
        net.places().count(),
        net.transition_count()
    );
    Ok(net)
}

/// Explore the state space `kind` of `net` and write it in the DOT format to
/// `output`, or to stdout if no file is given
#[cfg(feature = "dot")]
pub(crate) fn explore_net(
    net: &DataPetriNet,
    kind: StateSpaceOption,
    colored: bool,
    output: Option<PathBuf>,
) -> Result<(), anyhow::Error> {
    let oracle = IntervalOracle::new();
    let dot = match kind {
        StateSpaceOption::ReachabilityGraph => {
            to_dot(&mut ReachabilityGraph::new(net, &oracle), colored)
        }
        StateSpaceOption::ConstraintGraph => {
            to_dot(&mut ConstraintStateGraph::new(net, &oracle), colored)
        }
        StateSpaceOption::CoverabilityGraph => {
            to_dot(&mut CoverabilityGraph::new(net, &oracle), colored)
        }
        StateSpaceOption::CoverabilityTree => {
            to_dot(&mut CoverabilityTree::new(net, &oracle), colored)
        }
    };

    match output {
        Some(path) => {
            fs::write(&path, dot).with_context(|| "Failed to write output file")?;
            info!("Wrote state space to '{}'", path.display());
        }
        None => println!("{dot}"),
    }
    Ok(())
}

#[cfg(feature = "dot")]
fn to_dot<S: ExplorationStrategy>(
    space: &mut StateSpace<'_, S, IntervalOracle>,
    colored: bool,
) -> String {
    space.generate_graph();
    info!(
        "Explored {} with {} states and {} arcs",
        space.kind(),
        space.states().len(),
        space.arcs().len()
    );

    if colored {
        space.get_colored_dot_graph(&space.coloring())
    } else {
        space.get_dot_graph()
    }
}

/// Split repair parameters of the form `key=value`
pub(crate) fn parse_parameters(parameters: &[String]) -> Result<Vec<(&str, &str)>, anyhow::Error> {
    parameters
        .iter()
        .map(|p| {
            p.split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .ok_or_else(|| anyhow!("Parameter '{p}' is not of the form key=value"))
        })
        .collect()
}

/// Run `job` on a blocking thread, aborting after `timeout` seconds
///
/// The oracle queries cannot be interrupted, so on timeout the job is left to
/// finish in the background and its result is discarded.
pub(crate) fn run_with_timeout<T, F>(timeout: Option<u64>, job: F) -> Result<T, anyhow::Error>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(seconds) = timeout else {
        return Ok(job());
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("dpn-worker")
        .enable_time()
        .build()
        .with_context(|| "Failed to start runtime")?;

    let result = runtime.block_on(async {
        tokio::time::timeout(
            Duration::from_secs(seconds),
            tokio::task::spawn_blocking(job),
        )
        .await
    });

    match result {
        Ok(joined) => joined.with_context(|| "Analysis task failed"),
        Err(_) => {
            warn!("Timeout of {seconds}s expired, discarding partial results");
            runtime.shutdown_background();
            Err(anyhow!("Timeout of {seconds}s expired"))
        }
    }
}
