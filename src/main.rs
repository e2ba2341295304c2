// =============================================================================
// vk-objmgmt-cts - command line runner
// =============================================================================
//
// RUN FLOW:
// 1. Load config.toml, apply command line overrides
// 2. Build the object_management tree (no Vulkan needed)
// 3. --list: print selected case paths and stop
// 4. Create the Vulkan context, run selected cases, print totals
//
// Exit codes: 0 all selected cases passed (or were unsupported),
// 1 at least one case failed, 2 setup failed.
//
// =============================================================================

use anyhow::{Context as _, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use vk_objmgmt_cts::config::Config;
use vk_objmgmt_cts::objects::Context;
use vk_objmgmt_cts::runner::{ResultsFile, Runner};
use vk_objmgmt_cts::tree::{object_management_tests, CaseFilter, TestCaseGroup};

const SETUP_FAILED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "vk-objmgmt-cts", version, about = "Vulkan object management conformance tests")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Case path pattern, `*` matches anything; repeat to select more
    #[arg(long = "case", value_name = "PATTERN")]
    cases: Vec<String>,

    /// Print selected case paths without running them
    #[arg(long)]
    list: bool,

    /// Workers per multithreaded case
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    threads: Option<u32>,

    /// 1-based physical device index
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    device_id: Option<u32>,

    /// 1-based physical device group index
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    device_group_id: Option<u32>,

    /// Enable VK_LAYER_KHRONOS_validation and fail cases that trigger errors
    #[arg(long)]
    validation: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,

    /// Write `path result message` per case to this file
    #[arg(long)]
    results_file: Option<String>,
}

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            return ExitCode::from(SETUP_FAILED);
        }
    };

    init_logging(&config);

    let root = object_management_tests(config.device.device_id, config.device.device_group_id);
    let runner = Runner::new(CaseFilter::new(config.runner.cases.clone()));

    if cli.list {
        for path in runner.selected_paths(&root) {
            println!("{}", path);
        }
        return ExitCode::SUCCESS;
    }

    match run(&config, runner, &root) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{:?}", e);
            ExitCode::from(SETUP_FAILED)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_from_path(&cli.config)?;

    if !cli.cases.is_empty() {
        config.runner.cases = cli.cases.clone();
    }
    if let Some(threads) = cli.threads {
        config.runner.threads = threads;
    }
    if let Some(device_id) = cli.device_id {
        config.device.device_id = device_id;
    }
    if let Some(device_group_id) = cli.device_group_id {
        config.device.device_group_id = device_group_id;
    }
    if cli.validation {
        config.debug.validation_layers = true;
    }
    if let Some(level) = &cli.log_level {
        config.debug.log_level = level.clone();
    }
    if let Some(results_file) = &cli.results_file {
        config.runner.results_file = results_file.clone();
    }

    Ok(config)
}

fn run(config: &Config, mut runner: Runner, root: &TestCaseGroup) -> Result<u8> {
    log::info!("Starting object management tests");

    if !config.runner.results_file.is_empty() {
        runner = runner.with_results_file(ResultsFile::create(&config.runner.results_file)?);
    }

    let context = Context::new(config).context("Failed to create Vulkan context")?;

    let summary = runner.run(root, &context);
    summary.log();

    context.vk.wait_idle()?;

    Ok(summary.exit_code() as u8)
}

/// Initialize logging, optionally into a file
fn init_logging(config: &Config) {
    use env_logger::{Builder, Target};

    let mut builder = Builder::from_default_env();
    builder.filter_level(config.get_log_level());

    if config.debug.log_to_file {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "=== Object Management Test Log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                let _ = writeln!(file);
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", config.debug.log_file, e),
        }
    }

    builder.init();
}
