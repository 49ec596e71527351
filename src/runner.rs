//! Running several independent catalogs.
//!
//! Each job gets its own copy of the configuration and its own archive, so
//! workers share nothing but the read-only [`RunContext`]. A failing job is
//! reported in its [`JobOutcome`] and does not affect the others.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::archive::Archive;
use crate::collectors::DataCollector;
use crate::config::{BlacklistReport, ClientConfig, RemoveConf};
use crate::constants::MIN_WORKERS;
use crate::models::CollectionSpecs;
use crate::obfuscate::ReportCleaner;

/// One named catalog to collect
#[derive(Debug, Clone)]
pub struct CollectionJob {
    pub name: String,
    pub specs: CollectionSpecs,
}

/// State shared read-only by every job
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: ClientConfig,
    pub rm_conf: Option<RemoveConf>,
    pub branch_info: serde_json::Value,
    pub blacklist_report: BlacklistReport,
    /// Each job's result is moved to `<output_root>/<job name>/`
    pub output_root: PathBuf,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub output: Result<PathBuf>,
}

/// Half the available processors, never fewer than two
pub fn worker_count() -> usize {
    (num_cpus::get() / 2).max(MIN_WORKERS)
}

/// Collect every job on the current thread, in order
pub fn run_serial(jobs: &[CollectionJob], ctx: &RunContext) -> Vec<JobOutcome> {
    jobs.iter().map(|job| run_job(job, ctx)).collect()
}

/// Collect jobs on a dedicated pool of `workers` threads
pub fn run_parallel(jobs: &[CollectionJob], ctx: &RunContext, workers: usize) -> Result<Vec<JobOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    info!("Collecting {} jobs on {} workers", jobs.len(), workers);
    Ok(pool.install(|| jobs.par_iter().map(|job| run_job(job, ctx)).collect()))
}

pub fn run_jobs(jobs: &[CollectionJob], ctx: &RunContext, parallel: bool) -> Result<Vec<JobOutcome>> {
    if parallel {
        run_parallel(jobs, ctx, worker_count())
    } else {
        Ok(run_serial(jobs, ctx))
    }
}

fn run_job(job: &CollectionJob, ctx: &RunContext) -> JobOutcome {
    let output = collect_job(job, ctx);
    match &output {
        Ok(path) => info!("Job {} finished: {}", job.name, path.display()),
        Err(e) => error!("Job {} failed: {:#}", job.name, e),
    }
    JobOutcome {
        name: job.name.clone(),
        output,
    }
}

fn collect_job(job: &CollectionJob, ctx: &RunContext) -> Result<PathBuf> {
    let config = ctx.config.clone();
    let archive = Archive::new(&config)?;
    let mut collector = DataCollector::new(config, archive);

    collector.run_collection(
        &job.specs,
        ctx.rm_conf.as_ref(),
        &ctx.branch_info,
        &ctx.blacklist_report,
    )?;
    let produced = collector
        .done(ctx.rm_conf.as_ref(), &mut ReportCleaner::new())?
        .context("Packaging produced no output")?;

    let destination_dir = ctx.output_root.join(&job.name);
    fs::create_dir_all(&destination_dir)
        .context(format!("Failed to create {}", destination_dir.display()))?;
    let file_name = produced
        .file_name()
        .context("Collected output has no file name")?;
    let destination = destination_dir.join(file_name);

    move_path(&produced, &destination)?;
    Ok(destination)
}

/// Rename `from` to `to`, copying when they are on different filesystems
pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    if from.is_dir() {
        for entry in WalkDir::new(from) {
            let entry = entry.context("Failed to walk collected output")?;
            let target = to.join(entry.path().strip_prefix(from)?);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &target)
                    .context(format!("Failed to copy {}", entry.path().display()))?;
            }
        }
        fs::remove_dir_all(from).context(format!("Failed to remove {}", from.display()))?;
    } else {
        fs::copy(from, to).context(format!("Failed to copy {} to {}", from.display(), to.display()))?;
        fs::remove_file(from).context(format!("Failed to remove {}", from.display()))?;
    }
    Ok(())
}
