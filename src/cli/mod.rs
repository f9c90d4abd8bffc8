use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::core::Report;
use crate::engine::{BatchRunner, Progress, RunnerOptions};
use crate::environment::Environment;
use crate::registry::{CheckRegistry, ListFilter};
use crate::store::{self, ReportStore};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "siteaudit",
    version,
    about = "Runs site audit checks against an environment snapshot and aggregates the verdicts into a scored report"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Run(RunArgs),
    Checks(ChecksArgs),
    Reports(ReportsArgs),
    Show(ShowArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run only checks from this category.
    #[arg(long)]
    pub category: Option<String>,
    /// Run only the named check ids (repeatable).
    #[arg(long)]
    pub only: Vec<String>,
    /// Consume one batch step and persist the state for a later
    /// invocation instead of running to completion.
    #[arg(long)]
    pub step: bool,
    /// State file for `--step` runs.
    #[arg(long)]
    pub state: Option<PathBuf>,
    /// Environment snapshot (TOML). Missing file means an empty
    /// snapshot; gated checks then skip.
    #[arg(long)]
    pub env: Option<PathBuf>,
    /// Merge the new verdicts into this saved report instead of
    /// starting an empty one.
    #[arg(long)]
    pub amend: Option<PathBuf>,
    #[arg(long = "no-save")]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct ChecksArgs {
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long = "enabled-only")]
    pub enabled_only: bool,
}

#[derive(Debug, Args)]
pub struct ReportsArgs {}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = effective_home_dir()?;

    let env_config_path = std::env::var_os("SITEAUDIT_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let registry = crate::checks::builtin_registry()?;

    match cli.command {
        Commands::Run(args) => {
            let env_path = args
                .env
                .clone()
                .unwrap_or_else(|| home_dir.join(".config/siteaudit/environment.toml"));
            let env = Environment::load_or_default(&env_path)?;

            let ids = select_ids(&registry, &args.only, args.category.as_deref())?;

            let opts = RunnerOptions {
                checks_per_step: cfg.batch.checks_per_step,
                recent_window: cfg.batch.recent_messages_window,
                check_timeout: Duration::from_secs(cli.timeout),
            };
            let runner = BatchRunner::new(&registry, &env, opts);

            let reports_dir = cfg
                .report
                .reports_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| store::reports_dir(&home_dir));
            let report_store = ReportStore::new(reports_dir);

            if args.step {
                let state_path = args
                    .state
                    .clone()
                    .unwrap_or_else(|| store::default_state_path(&home_dir));

                let mut state = if state_path.exists() {
                    let state = store::read_state(&state_path)?;
                    runner
                        .resume(state)
                        .map_err(|err| crate::exit::audit_failed_err(err.into()))?
                } else {
                    runner.begin(&ids)?
                };

                let outcome = runner.step(&mut state);
                match outcome.finished {
                    Some(summary) => {
                        let report = merge_amended(summary.report, args.amend.as_deref())?;
                        emit_report(&report, &cfg, &ui_cfg, cli.json)?;
                        if !args.no_save {
                            save_report(&report_store, &report, &ui_cfg)?;
                        }
                        if state_path.exists() {
                            std::fs::remove_file(&state_path).with_context(|| {
                                format!(
                                    "failed to remove finished audit state: {}",
                                    state_path.display()
                                )
                            })?;
                        }
                    }
                    None => {
                        store::write_state(&state_path, &state)?;
                        if !ui_cfg.quiet {
                            eprintln_progress(&outcome.progress);
                        }
                    }
                }
            } else {
                let pb = progress_bar(&ui_cfg, cli.json);
                let summary = runner.run_to_completion(&ids, |progress| {
                    if let Some(pb) = &pb {
                        pb.set_message(format_progress(progress));
                    }
                })?;
                if let Some(pb) = pb {
                    pb.finish_and_clear();
                }

                let report = merge_amended(summary.report, args.amend.as_deref())?;
                emit_report(&report, &cfg, &ui_cfg, cli.json)?;
                if !args.no_save {
                    save_report(&report_store, &report, &ui_cfg)?;
                }
            }
        }
        Commands::Checks(args) => {
            let filter = ListFilter {
                category: args.category.clone(),
                enabled_only: args.enabled_only,
            };
            let descriptors = registry.list(&filter);
            if cli.json {
                write_json(&descriptors)?;
            } else {
                crate::ui::print_checks(&descriptors, &ui_cfg);
            }
        }
        Commands::Reports(_args) => {
            let reports_dir = cfg
                .report
                .reports_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| store::reports_dir(&home_dir));
            let paths = ReportStore::new(reports_dir).list()?;
            if cli.json {
                write_json(&paths)?;
            } else {
                crate::ui::print_report_list(&paths, &ui_cfg);
            }
        }
        Commands::Show(args) => {
            let report = ReportStore::load(&args.path)?;
            emit_report(&report, &cfg, &ui_cfg, cli.json)?;
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `siteaudit config --show`");
            }
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "siteaudit", &mut out);
        }
    }

    Ok(())
}

/// Resolves the ids a `run` invocation covers. `--only` ids must exist;
/// a typo fails fast with a sample of known ids rather than silently
/// auditing nothing.
fn select_ids(
    registry: &CheckRegistry,
    only: &[String],
    category: Option<&str>,
) -> Result<Vec<String>> {
    if !only.is_empty() {
        let unknown: Vec<&str> = only
            .iter()
            .filter(|id| !registry.contains(id))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            let mut known = registry.ids(&ListFilter::default());
            known.truncate(8);
            return Err(crate::exit::invalid_args(format!(
                "unknown check id(s): {} (known ids include: {})",
                unknown.join(", "),
                known.join(", ")
            )));
        }
        return Ok(only.to_vec());
    }

    let filter = ListFilter {
        category: category.map(ToOwned::to_owned),
        enabled_only: true,
    };
    let ids = registry.ids(&filter);
    if ids.is_empty() {
        if let Some(category) = category {
            return Err(crate::exit::invalid_args(format!(
                "no enabled checks in category: {category}"
            )));
        }
    }
    Ok(ids)
}

fn merge_amended(new: Report, amend: Option<&std::path::Path>) -> Result<Report> {
    let Some(path) = amend else {
        return Ok(new);
    };
    let mut base = ReportStore::load(path)?;
    for verdict in new.verdicts {
        base.add_verdict(verdict);
    }
    Ok(base)
}

fn emit_report(
    report: &Report,
    cfg: &crate::config::EffectiveConfig,
    ui_cfg: &UiConfig,
    json: bool,
) -> Result<()> {
    if json {
        write_json(report)
    } else {
        crate::ui::print_report(report, &cfg.score, ui_cfg);
        Ok(())
    }
}

fn save_report(store: &ReportStore, report: &Report, ui_cfg: &UiConfig) -> Result<()> {
    let path = store.save(report)?;
    if !ui_cfg.quiet {
        eprintln!("saved: {}", path.display());
    }
    Ok(())
}

fn progress_bar(ui_cfg: &UiConfig, json: bool) -> Option<indicatif::ProgressBar> {
    if !(ui_cfg.stderr_is_tty && !ui_cfg.quiet && !json) {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    pb.set_message("running checks...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn format_progress(progress: &Progress) -> String {
    let percent = (progress.fraction * 100.0).round() as u32;
    match &progress.current_label {
        Some(label) => format!(
            "{}/{} ({percent}%) {label}",
            progress.position, progress.total
        ),
        None => format!("{}/{} ({percent}%)", progress.position, progress.total),
    }
}

fn eprintln_progress(progress: &Progress) {
    eprintln!("progress: {}", format_progress(progress));
    let recent = progress.recent_text.trim_end();
    if !recent.is_empty() {
        for line in recent.lines().rev().take(3).collect::<Vec<_>>().into_iter().rev() {
            eprintln!("  {line}");
        }
    }
}

fn write_json<T: serde::Serialize>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("the HOME environment variable is not set"))
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_only_id_fails_with_a_sample_of_known_ids() {
        let registry = crate::checks::builtin_registry().expect("registry");
        let err = select_ids(&registry, &["no-such-check".to_string()], None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no-such-check"), "msg={msg}");
        assert!(msg.contains("runtime-version"), "msg={msg}");
    }

    #[test]
    fn only_ids_are_used_verbatim() {
        let registry = crate::checks::builtin_registry().expect("registry");
        let ids = select_ids(&registry, &["core-debug-mode".to_string()], None).expect("select");
        assert_eq!(ids, vec!["core-debug-mode"]);
    }

    #[test]
    fn category_filter_selects_enabled_checks_in_that_category() {
        let registry = crate::checks::builtin_registry().expect("registry");
        let ids = select_ids(&registry, &[], Some("security")).expect("select");
        assert!(ids.contains(&"security-https-login".to_string()));
        assert!(!ids.contains(&"runtime-version".to_string()));
    }

    #[test]
    fn empty_category_is_an_invalid_args_error() {
        let registry = crate::checks::builtin_registry().expect("registry");
        let err = select_ids(&registry, &[], Some("nonexistent")).unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn parse_shell_accepts_known_shells_case_insensitively() {
        assert!(parse_shell("Bash").is_ok());
        assert!(parse_shell(" zsh ").is_ok());
        assert!(parse_shell("powershell").is_err());
    }
}
