mod cli;

use batchjpg::{
    config::{self, Config},
    context::RunContext,
    conversion::CjpegConverter,
    pipeline,
    scanner::{ExclusionSet, TreeWalker, WalkRules},
    shutdown,
    stats::RunSummary,
};
use batchjpg_tools::ToolRegistry;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::Cli;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "batchjpg=debug,batchjpg_core=debug,batchjpg_tools=debug".to_string()
        } else {
            "batchjpg=info,batchjpg_core=info,batchjpg_tools=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(root) = cli.root.clone() else {
        return match Cli::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    };

    match run(&cli, &root) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, root: &Path) -> Result<ExitCode> {
    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, cli);
    config::validate_config(&config)?;

    let root = resolve_root(root)?;
    let exclusions = ExclusionSet::new(&cli.exclude);

    let rt = tokio::runtime::Runtime::new()?;

    if cli.dry_run {
        return rt.block_on(dry_run(&config, &root, exclusions));
    }

    let registry = ToolRegistry::discover(&config.conversion);
    for info in registry.check_all() {
        tracing::debug!(
            tool = %info.name,
            available = info.available,
            version = info.version.as_deref().unwrap_or("unknown"),
            "External tool"
        );
    }
    let converter = CjpegConverter::from_registry(&registry, &config.conversion)
        .context("cjpeg is required; install libjpeg-turbo or mozjpeg, or set conversion.cjpeg_path")?;

    let ctx = RunContext::new(config, exclusions, Arc::new(converter));
    rt.block_on(convert(ctx, &root, cli.json))
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.delete_original {
        config.conversion.delete_original = true;
    }
    if let Some(quality) = cli.quality {
        config.conversion.quality = quality;
    }
    if let Some(jobs) = cli.jobs {
        config.workers.max_workers = Some(jobs);
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    let resolved = root
        .canonicalize()
        .with_context(|| format!("Root directory does not exist: {}", root.display()))?;
    if !resolved.is_dir() {
        anyhow::bail!("Root is not a directory: {}", root.display());
    }
    Ok(resolved)
}

async fn convert(ctx: RunContext, root: &Path, json: bool) -> Result<ExitCode> {
    let listener = ctx.shutdown.spawn_signal_listener();
    let result = pipeline::run(&ctx, root).await;
    // The pipeline terminates the coordinator, which stops the listener.
    shutdown::join_listener(listener).await;

    match result {
        Ok(summary) => {
            print_summary(&summary, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Run did not shut down cleanly");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn dry_run(config: &Config, root: &Path, exclusions: ExclusionSet) -> Result<ExitCode> {
    let rules = WalkRules::from_config(&config.scan, Arc::new(exclusions));
    let target = config.conversion.normalized_extension();
    let mut walker = TreeWalker::new(root, rules, config.scan.max_files_per_batch);

    while let Some(batch) = walker.next_batch().await {
        for task in batch {
            println!(
                "{} -> {}",
                task.path().display(),
                task.destination(&target).display()
            );
        }
    }

    let stats = walker.stats();
    tracing::info!(
        files = stats.files_found,
        dirs = stats.dirs_visited,
        dirs_skipped = stats.dirs_skipped,
        "Dry run complete; nothing converted"
    );
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else if summary.interrupted {
        tracing::warn!("Interrupted: {}", summary);
    } else {
        tracing::info!("Done: {}", summary);
    }
    Ok(())
}
