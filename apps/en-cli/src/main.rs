use clap::{Parser, Subcommand, ValueEnum};
use en_core::StateKind;
use en_member::{
    EnsembleDriver, MemberResult, RunInit, RunMode, RunStatus, SharedInfo,
};
use en_queue::{JobQueue, ScriptDriver};
use en_smspec::read_header;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "en-cli")]
#[command(about = "Ensemble forward-model runner and summary inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an experiment configuration file
    Validate {
        /// Path to the experiment YAML file
        config_path: PathBuf,
    },
    /// Inspect a binary summary header
    Inspect {
        /// Path to the SMSPEC file
        smspec_path: PathBuf,
    },
    /// Run the whole ensemble through the forward model
    Run {
        /// Path to the experiment YAML file
        config_path: PathBuf,
        /// Run mode
        #[arg(long, value_enum, default_value_t = CliRunMode::Experiment)]
        mode: CliRunMode,
        /// Last report step of the run window
        #[arg(long, default_value_t = 1)]
        steps: i32,
        /// Summary variables to internalize (general keys, repeatable)
        #[arg(long = "result", value_name = "KEY")]
        results: Vec<String>,
        /// Master seed for the per-member random streams
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliRunMode {
    Experiment,
    Prediction,
    Assimilation,
}

impl From<CliRunMode> for RunMode {
    fn from(mode: CliRunMode) -> RunMode {
        match mode {
            CliRunMode::Experiment => RunMode::EnsembleExperiment,
            CliRunMode::Prediction => RunMode::EnsemblePrediction,
            CliRunMode::Assimilation => RunMode::EnkfAssimilation,
        }
    }
}

fn main() -> MemberResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Inspect { smspec_path } => cmd_inspect(&smspec_path),
        Commands::Run {
            config_path,
            mode,
            steps,
            results,
            seed,
        } => cmd_run(&config_path, mode.into(), steps, &results, seed),
    }
}

fn cmd_validate(config_path: &Path) -> MemberResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = en_config::load_yaml(config_path)?;
    println!("✓ Configuration is valid");
    println!("  Case:         {}", config.model.case_name);
    println!("  Realizations: {}", config.model.num_realizations);
    println!("  Runpath:      {}", config.model.runpath);
    println!(
        "  Grid:         {}x{}x{}",
        config.ecl.grid.nx, config.ecl.grid.ny, config.ecl.grid.nz
    );
    Ok(())
}

fn cmd_inspect(smspec_path: &Path) -> MemberResult<()> {
    let registry = read_header(smspec_path)?;

    println!("Summary header: {}", smspec_path.display());
    println!("  Variables:   {}", registry.node_count());
    println!("  Vector size: {}", registry.params_size());
    let dims = registry.dims();
    println!("  Grid:        {}x{}x{}", dims.nx, dims.ny, dims.nz);
    println!("  Start date:  {}", registry.start_date());
    if let Some(case) = registry.restart_case() {
        println!("  Restart:     {} (step {})", case, registry.restart_step());
    }

    println!("\nVariables:");
    for node in registry.nodes() {
        let mut line = format!("  {:<10} {}", node.keyword(), node.kind());
        if let Some(wgname) = node.wgname() {
            line.push_str(&format!("  {}", wgname));
        }
        if let Some(num) = node.num() {
            line.push_str(&format!("  num={}", num));
        }
        if !node.unit().is_empty() {
            line.push_str(&format!("  [{}]", node.unit()));
        }
        println!("{}", line);
    }
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    mode: RunMode,
    steps: i32,
    results: &[String],
    seed: u64,
) -> MemberResult<()> {
    let config = Arc::new(en_config::load_yaml(config_path)?);
    println!(
        "Running ensemble '{}' with {} realizations",
        config.model.case_name, config.model.num_realizations
    );

    let queue = Arc::new(JobQueue::new(
        Arc::new(ScriptDriver::new()),
        config.site.max_running,
    ));
    let shared = Arc::new(SharedInfo::new(config, queue));
    println!("  Case id: {}", shared.case_id());

    let mut ensemble = EnsembleDriver::new(shared, seed);
    for key in results {
        ensemble.add_result_node(key);
    }

    let init = RunInit {
        mode,
        active: true,
        init_step_parameters: 0,
        init_state_parameter: StateKind::Analyzed,
        init_state_dynamic: StateKind::Forecast,
        load_start: 1,
        step1: 0,
        step2: steps,
    };
    let report = ensemble.run(&init)?;

    println!(
        "✓ Ensemble finished: {} succeeded, {} failed",
        report.num_successful, report.num_failed
    );
    for member in ensemble.members() {
        let status = member.simple_run_status();
        let marker = match status {
            RunStatus::RunOk => "✓",
            RunStatus::RunFailure | RunStatus::LoadFailure => "✗",
            _ => "-",
        };
        let mut line = format!("  {} member {:04}: {:?}", marker, member.iens(), status);
        if let Some(path) = member.run_path() {
            line.push_str(&format!("  ({})", path.display()));
        }
        println!("{}", line);
    }
    Ok(())
}
