mod config;
mod logging;
mod render;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use footprint_core::{InstallScope, UninstallOutcome, UninstallPolicy, UninstallReport};
use footprint_installer::{
    default_state_root, record_installation, BaselineStore, InstallRequest, StateLayout,
    UninstallOptions, Uninstaller,
};
use footprint_integrity::bundle_info_from_file;
use serde::Serialize;
use tracing::debug;

use crate::config::FootprintConfig;
use crate::render::{
    current_output_style, format_integrity_lines, format_record_lines, format_status_lines,
    format_uninstall_lines, OutputStyle, TerminalProgress,
};

#[derive(Parser, Debug)]
#[command(name = "footprint")]
#[command(
    about = "Record what an installer wrote and remove exactly that",
    long_about = None,
    version
)]
struct Cli {
    #[arg(long, global = true)]
    state_root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint installed files and save them as the scope's baseline.
    Record {
        #[arg(long, value_parser = InstallScope::parse)]
        scope: InstallScope,
        #[arg(long)]
        target: PathBuf,
        #[arg(long)]
        bundle: PathBuf,
        /// Newline-separated list of installed files.
        #[arg(long)]
        files_from: Option<PathBuf>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        replace: bool,
        files: Vec<PathBuf>,
    },
    /// Compare tracked files against the baseline without changing anything.
    Verify {
        #[arg(long, value_parser = InstallScope::parse)]
        scope: InstallScope,
        #[arg(long)]
        json: bool,
    },
    /// Verify, then remove installed files according to a policy.
    Uninstall {
        #[arg(long, value_parser = InstallScope::parse)]
        scope: InstallScope,
        #[arg(long)]
        target: PathBuf,
        /// complete, smart, or custom. Defaults to the configured policy.
        #[arg(long)]
        policy: Option<String>,
        /// Path to remove under the custom policy.
        #[arg(long = "select")]
        select: Vec<PathBuf>,
        /// File the user added after install.
        #[arg(long = "user-file")]
        user_files: Vec<PathBuf>,
        #[arg(long)]
        backup: bool,
        #[arg(long)]
        backup_root: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List recorded installations.
    Status,
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    logging::init_logging();
    run_cli(Cli::parse())
}

fn run_cli(cli: Cli) -> Result<()> {
    let layout = StateLayout::new(match cli.state_root {
        Some(root) => root,
        None => default_state_root()?,
    });
    debug!(state_root = %layout.root().display(), "resolved state root");
    let style = current_output_style();

    match cli.command {
        Commands::Record {
            scope,
            target,
            bundle,
            files_from,
            concurrency,
            replace,
            files,
        } => {
            let config = FootprintConfig::load(&layout)?;
            let mut installed = files;
            if let Some(list) = files_from {
                installed.extend(read_file_list(&list)?);
            }
            if installed.is_empty() {
                return Err(anyhow!(
                    "no installed files given; pass paths or --files-from"
                ));
            }

            let request = InstallRequest {
                scope,
                target_root: absolute_path(&target)?,
                bundle: bundle_info_from_file(&bundle)?,
                files: installed,
                policy: Default::default(),
                concurrency: concurrency.unwrap_or(config.concurrency),
                replace_existing: replace,
            };
            let store = BaselineStore::new(layout);
            let progress = TerminalProgress::start(style, "record");
            let result = {
                let observer = |percent: u8, message: &str| progress.update(percent, message);
                record_installation(&store, &request, &observer)
            };
            match result {
                Ok(outcome) => {
                    progress.finish(outcome.baseline.files.len() as u64);
                    print_lines(&format_record_lines(&outcome, style));
                }
                Err(err) => {
                    progress.abandon();
                    return Err(err);
                }
            }
        }
        Commands::Verify { scope, json } => {
            let uninstaller = Uninstaller::new(BaselineStore::new(layout));
            let report = uninstaller.inspect(scope)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("failed to serialize integrity report")?
                );
            } else {
                print_lines(&format_integrity_lines(&report, style));
            }
        }
        Commands::Uninstall {
            scope,
            target,
            policy,
            select,
            user_files,
            backup,
            backup_root,
            json,
        } => {
            let config = FootprintConfig::load(&layout)?;
            let policy = resolve_policy(policy.as_deref(), &select, &config)?;
            let options = UninstallOptions {
                scope,
                policy,
                target_dir: target,
                create_backup: backup || config.create_backup,
                user_created: user_files,
                backup_root: Some(backup_root.unwrap_or_else(|| config.backup_root(&layout))),
            };
            let uninstaller = Uninstaller::new(BaselineStore::new(layout));
            let progress = TerminalProgress::start(
                if json { OutputStyle::Plain } else { style },
                "uninstall",
            );
            let result = {
                let observer = |percent: u8, message: &str| progress.update(percent, message);
                uninstaller.uninstall(&options, &observer)
            };
            let report = match result {
                Ok(report) => {
                    progress.finish(report.removed.len() as u64);
                    report
                }
                Err(err) => {
                    progress.abandon();
                    return Err(err.into());
                }
            };
            print_uninstall_report(&report, style, json)?;
            if !report.success() {
                return Err(anyhow!(
                    "uninstall finished with {} failures",
                    report.failed.len()
                ));
            }
        }
        Commands::Status => {
            let uninstaller = Uninstaller::new(BaselineStore::new(layout));
            print_lines(&format_status_lines(&uninstaller.status()?, style));
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

fn resolve_policy(
    requested: Option<&str>,
    select: &[PathBuf],
    config: &FootprintConfig,
) -> Result<UninstallPolicy> {
    let name = match requested {
        Some(name) => name,
        None if !select.is_empty() => "custom",
        None => config.default_policy.as_str(),
    };
    let policy = UninstallPolicy::parse(name, select)?;
    if !select.is_empty() && !matches!(policy, UninstallPolicy::Custom(_)) {
        return Err(anyhow!(
            "--select only applies to the custom policy (got '{}')",
            policy.as_str()
        ));
    }
    Ok(policy)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UninstallReportJson<'a> {
    #[serde(flatten)]
    report: &'a UninstallReport,
    success: bool,
    outcome: UninstallOutcome,
    errors: Vec<String>,
}

fn uninstall_report_json(report: &UninstallReport) -> Result<String> {
    serde_json::to_string_pretty(&UninstallReportJson {
        report,
        success: report.success(),
        outcome: report.outcome(),
        errors: report.errors(),
    })
    .context("failed to serialize uninstall report")
}

fn print_uninstall_report(report: &UninstallReport, style: OutputStyle, json: bool) -> Result<()> {
    if json {
        println!("{}", uninstall_report_json(report)?);
    } else {
        print_lines(&format_uninstall_lines(report, style));
    }
    Ok(())
}

fn read_file_list(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read file list: {}", path.display()))?;
    Ok(parse_file_list(&raw))
}

fn parse_file_list(raw: &str) -> Vec<PathBuf> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join(path))
}

fn write_completions_script<W: Write>(shell: Shell, writer: &mut W) -> Result<()> {
    let mut command = Cli::command();
    let mut generated = Vec::new();
    clap_complete::generate(shell, &mut command, "footprint", &mut generated);
    writer
        .write_all(&generated)
        .with_context(|| "failed writing generated completion script")
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests;
