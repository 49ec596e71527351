use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use serde_json::json;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use diag_collector::archive::Archive;
use diag_collector::cli::{Args, Commands};
use diag_collector::collectors::DataCollector;
use diag_collector::config::{load_or_default, BlacklistReport, ClientConfig, RemoveConf, RemoveConfLoader};
use diag_collector::models::CollectionSpecs;
use diag_collector::obfuscate::ReportCleaner;
use diag_collector::runner::{move_path, run_jobs, CollectionJob, RunContext};
use diag_collector::specs::{categorize, DataSource};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Load configuration, command-line flags win
    let mut config = load_or_default(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd, &config);
    }

    info!("Starting collection");

    let rm_conf = RemoveConfLoader::new(&config).get_rm_conf()?;
    let blacklist_report = BlacklistReport::from_conf(rm_conf.as_ref(), &config);
    let branch_info = load_branch_info(args.branch_info.as_deref())?;

    match args.specs.as_slice() {
        [] => bail!("No collection catalog given, pass at least one --specs"),
        [catalog] if !args.parallel => {
            collect_single(catalog, config, rm_conf, &branch_info, &blacklist_report)?
        }
        catalogs => {
            let ctx = RunContext {
                output_root: config
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("output")),
                config,
                rm_conf,
                branch_info,
                blacklist_report,
            };
            collect_many(catalogs, &ctx, args.parallel)?
        }
    }

    info!("Collection completed successfully");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands (validate, spec-report and init-config)
fn handle_subcommand(cmd: &Commands, config: &ClientConfig) -> Result<()> {
    match cmd {
        Commands::Validate => {
            let loader = RemoveConfLoader::new(config);
            if !loader.validate()? {
                bail!("{} is not a valid remove file", loader.remove_file().display());
            }
            info!("{} is valid", loader.remove_file().display());
            Ok(())
        }
        Commands::SpecReport { path } => {
            let content = fs::read_to_string(path)
                .context(format!("Failed to read data sources: {}", path.display()))?;
            let sources: Vec<DataSource> = serde_json::from_str(&content)
                .context("Failed to parse data sources JSON")?;

            let report = categorize(&sources);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::InitConfig { path } => {
            config.save_to_yaml_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
    }
}

fn load_branch_info(path: Option<&Path>) -> Result<serde_json::Value> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .context(format!("Failed to read branch info: {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse branch info JSON")
        }
        None => Ok(json!({"remote_branch": -1, "remote_leaf": -1})),
    }
}

/// Collect one catalog and hand over its output
fn collect_single(
    catalog: &Path,
    config: ClientConfig,
    rm_conf: Option<RemoveConf>,
    branch_info: &serde_json::Value,
    blacklist_report: &BlacklistReport,
) -> Result<()> {
    config.check_output_dir()?;
    let specs = CollectionSpecs::from_json_file(catalog)?;
    let archive = Archive::new(&config)?;
    let mut collector = DataCollector::new(config.clone(), archive);

    collector.run_collection(&specs, rm_conf.as_ref(), branch_info, blacklist_report)?;
    let Some(output) = collector.done(rm_conf.as_ref(), &mut ReportCleaner::new())? else {
        bail!("Failed to package collected data");
    };

    match &config.output_dir {
        Some(output_dir) => {
            move_path(&output, output_dir)?;
            info!("Collected data written to {}", output_dir.display());
        }
        None if config.keep_archive => info!("Archive: {}", output.display()),
        None => warn!(
            "Archive {} is removed on exit, pass --keep-archive to retain it",
            output.display()
        ),
    }
    Ok(())
}

/// Collect several catalogs, each into `<output root>/<catalog name>`
fn collect_many(catalogs: &[PathBuf], ctx: &RunContext, parallel: bool) -> Result<()> {
    let jobs = catalogs
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .context(format!("Catalog path has no file name: {}", path.display()))?;
            Ok(CollectionJob {
                name,
                specs: CollectionSpecs::from_json_file(path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let outcomes = run_jobs(&jobs, ctx, parallel)?;
    let failed = outcomes.iter().filter(|o| o.output.is_err()).count();
    for outcome in &outcomes {
        if let Ok(path) = &outcome.output {
            info!("{}: {}", outcome.name, path.display());
        }
    }

    if failed == outcomes.len() {
        bail!("All {} collection jobs failed", failed);
    }
    if failed > 0 {
        error!("{} of {} collection jobs failed", failed, outcomes.len());
    }
    Ok(())
}
