use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use autosnap_runner::config::{self, Config, Settings};
use autosnap_runner::provider::{self, Provider};
use autosnap_runner::{Orchestrator, RunOptions};
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Args {
    config_path: Option<PathBuf>,
    dry_run: bool,
    provider: Provider,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    let cfg = match &args.config_path {
        Some(path) => {
            info!(?path, "loading config file");
            config::load_config(path)?
        }
        None => Config::default(),
    };

    let settings =
        Settings::resolve(&cfg, |key| env::var(key).ok()).context("invalid configuration")?;

    let now = Utc::now();
    let gateway = provider::connect(&args.provider, &settings, now).await?;

    let options = RunOptions {
        now: now.with_timezone(&settings.utc_offset),
        policy: settings.policy,
        concurrency: settings.concurrency,
        dry_run: args.dry_run,
    };
    info!(
        instances = ?settings.instances,
        policy = ?settings.policy,
        provider = ?args.provider,
        region = %settings.region,
        now = %options.now,
        dry_run = options.dry_run,
        "starting snapshot run"
    );

    let report = Orchestrator::new(gateway, options)
        .run(&settings.instances)
        .await
        .context("listing snapshots")?;

    info!(
        created = report.created(),
        retained = report.retained(),
        deleted = report.deleted(),
        failures = report.failures(),
        dry_run = report.dry_run,
        "snapshot run finished"
    );

    if report.is_partial_failure() {
        let failed = report.failed_instances();
        error!(?failed, "run finished with failures");
        bail!(
            "{} provider call(s) failed for instance(s): {}",
            report.failures(),
            failed.join(", ")
        );
    }
    Ok(())
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config_path: None,
        dry_run: false,
        provider: Provider::Lightsail,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() {
                    bail!("--config requires a path argument");
                }
                parsed.config_path = Some(PathBuf::from(&args[i]));
            }
            "--dry-run" => parsed.dry_run = true,
            "--local" => {
                i += 1;
                if i >= args.len() {
                    bail!("--local requires a snapshot listing path");
                }
                parsed.provider = Provider::Local(PathBuf::from(&args[i]));
            }
            other => bail!("unexpected argument: {other}"),
        }
        i += 1;
    }

    Ok(parsed)
}
