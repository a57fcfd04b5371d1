//! Scan command - run probes and emit a report

use anyhow::{Context, Result};
use console::style;
use hostaudit::config::load_config;
use hostaudit::engine::ComplianceEngine;
use hostaudit::models::CheckOutcome;
use hostaudit::organizer::rank_top_issues;
use hostaudit::probes::default_query;
use hostaudit::reporters::{self, ReportContext, ReportFormat};
use hostaudit::scoring::ScoreBreakdown;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::debug;

/// Top issues shown in the terminal summary
const SUMMARY_ISSUES: usize = 3;

pub(super) struct ScanOptions {
    pub config_path: Option<PathBuf>,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub only: Vec<String>,
    pub disable: Vec<String>,
    pub workers: Option<usize>,
    pub explain_score: bool,
    pub fail_under: Option<u8>,
}

pub(super) fn run(opts: ScanOptions) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(opts.config_path.as_deref(), &cwd)?;
    let workers = opts.workers.unwrap_or(config.scan.workers);

    let bar = ProgressBar::new(0);
    bar.set_style(create_bar_style());

    let progress = bar.clone();
    let mut engine = ComplianceEngine::with_default_probes(default_query(), config.policy)
        .with_workers(workers)
        .with_progress_callback(Box::new(move |name: &str, done: usize, total: usize| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
            progress.set_message(name.to_string());
        }));

    config.apply_module_flags(&mut engine);
    warn_unknown_modules(&engine, &opts.disable);
    for name in &opts.disable {
        engine.set_module_enabled(name, false);
    }

    let selected = if opts.only.is_empty() {
        &config.scan.selected
    } else {
        &opts.only
    };
    warn_unknown_modules(&engine, selected);
    if selected.is_empty() {
        engine.run_full_scan();
    } else {
        debug!("Scanning selected modules: {:?}", selected);
        engine.run_selected_scan(selected);
    }
    bar.finish_and_clear();

    let ctx = ReportContext::from_engine(&config.report, &engine);
    match &opts.output {
        Some(path) => {
            reporters::write_report(&ctx, opts.format, path)?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => {
            let rendered =
                reporters::render(&ctx, opts.format).context("Failed to render report")?;
            print!("{}", rendered);
        }
    }

    if opts.format != ReportFormat::Json {
        print_terminal_summary(engine.overall_score(), engine.results());
    }

    if opts.explain_score {
        eprint!(
            "\n{}",
            ScoreBreakdown::from_outcomes(engine.results()).explain()
        );
    }

    check_fail_under(opts.fail_under, engine.overall_score());
    Ok(())
}

/// Names that match no registered module are reported, then ignored
fn warn_unknown_modules(engine: &ComplianceEngine, names: &[String]) {
    for name in names {
        if engine.is_module_enabled(name).is_none() {
            eprintln!(
                "{} Unknown module '{}' (see `hostaudit modules`)",
                style("warning:").yellow(),
                name
            );
        }
    }
}

/// Colored score line plus the most severe issues, on stderr
fn print_terminal_summary(overall: u8, outcomes: &[CheckOutcome]) {
    let score = match overall {
        90..=100 => style(format!("{}%", overall)).green().bold(),
        70..=89 => style(format!("{}%", overall)).yellow().bold(),
        _ => style(format!("{}%", overall)).red().bold(),
    };
    eprintln!(
        "\n{} {} ({} modules, {})",
        style("Compliance score:").bold(),
        score,
        outcomes.len(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let top = rank_top_issues(outcomes);
    if top.is_empty() {
        eprintln!("  {} No failing or warning modules", style("✓").green());
        return;
    }
    for o in top.iter().take(SUMMARY_ISSUES) {
        eprintln!(
            "  {} {} [{}] {}",
            style("✗").red(),
            style(o.module_name()).bold(),
            o.severity(),
            style(o.recommendation()).dim()
        );
    }
    if top.len() > SUMMARY_ISSUES {
        eprintln!(
            "  {} and {} more",
            style("→").dim(),
            top.len() - SUMMARY_ISSUES
        );
    }
}

/// Exit with code 1 when the score is below the threshold
fn check_fail_under(threshold: Option<u8>, overall: u8) {
    if let Some(min) = threshold {
        if overall < min {
            eprintln!(
                "Failing due to --fail-under={} (score {})",
                min, overall
            );
            std::process::exit(1);
        }
    }
}

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("█▓▒░  ")
}
