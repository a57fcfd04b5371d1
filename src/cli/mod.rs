//! CLI command definitions and handlers

mod init;
mod modules;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hostaudit::config::MAX_WORKERS;
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > MAX_WORKERS {
        Err(format!("workers cannot exceed {}", MAX_WORKERS))
    } else {
        Ok(n)
    }
}

/// Parse a score threshold (0-100)
fn parse_score(s: &str) -> Result<u8, String> {
    let n: u8 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid score", s))?;
    if n > 100 {
        Err("score cannot exceed 100".to_string())
    } else {
        Ok(n)
    }
}

/// HostAudit - host security posture auditing
#[derive(Parser, Debug)]
#[command(name = "hostaudit")]
#[command(
    version,
    about = "Host compliance auditing: firewall, antivirus, patching, accounts, encryption and more, rolled into one weighted score",
    long_about = "HostAudit runs a catalog of compliance probes against the local machine \
(firewall profiles, antivirus, password policy, Windows Update, local accounts, BitLocker, \
audit logging, installed software and network shares) and combines their scores into a \
single severity-weighted compliance score.\n\n\
Probes only read system state. Nothing is changed on the host.",
    after_help = "\
Examples:
  hostaudit scan                              Summary report for all enabled modules
  hostaudit scan --format detailed            Add top issues and severity buckets
  hostaudit scan --format json -o audit.json  Write a JSON report
  hostaudit scan --fail-under 70              Exit code 1 if the score is below 70
  hostaudit modules                           List modules and their enabled flags"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: ./hostaudit.toml, then the user config)
    #[arg(long, global = true, env = "HOSTAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run compliance probes and report the results
    #[command(after_help = "\
Examples:
  hostaudit scan                                       Summary of all enabled modules
  hostaudit scan --format detailed                     Top issues, buckets, worst-first order
  hostaudit scan --format json -o audit.json           JSON report written to a file
  hostaudit scan --only \"Firewall Status\"              Scan a single module
  hostaudit scan --disable \"Installed Software Audit\"  Skip a module for this run
  hostaudit scan --workers 4                           Run probes on 4 threads
  hostaudit scan --explain-score                       Show how the overall score was computed
  hostaudit scan --fail-under 80                       Exit code 1 below 80 (CI mode)")]
    Scan {
        /// Output format: summary, detailed, json
        #[arg(long, short = 'f', default_value = "summary", value_parser = ["summary", "detailed", "json"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Scan only these modules (repeatable)
        #[arg(long)]
        only: Vec<String>,

        /// Disable these modules for this run (repeatable)
        #[arg(long)]
        disable: Vec<String>,

        /// Number of parallel probe workers (1-64, default from config)
        #[arg(long, value_parser = parse_workers)]
        workers: Option<usize>,

        /// Print the per-module score breakdown to stderr
        #[arg(long)]
        explain_score: bool,

        /// Exit with code 1 if the overall score is below this value
        #[arg(long, value_parser = parse_score)]
        fail_under: Option<u8>,
    },

    /// List available modules in registration order
    Modules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write an example hostaudit.toml in the current directory
    Init,

    /// Show version info
    Version,
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            format,
            output,
            only,
            disable,
            workers,
            explain_score,
            fail_under,
        } => scan::run(scan::ScanOptions {
            config_path: cli.config,
            format: format.parse()?,
            output,
            only,
            disable,
            workers,
            explain_score,
            fail_under,
        }),

        Commands::Modules { json } => modules::run(cli.config.as_deref(), json),

        Commands::Init => init::run(&std::env::current_dir()?),

        Commands::Version => {
            println!("hostaudit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hostaudit::probes::{default_probes, StatusPolicy, UnsupportedQuery};
    use std::sync::Arc;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("four").is_err());
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("0"), Ok(0));
        assert_eq!(parse_score("100"), Ok(100));
        assert!(parse_score("101").is_err());
        assert!(parse_score("-1").is_err());
    }

    #[test]
    fn test_scan_flags() {
        let cli = Cli::try_parse_from([
            "hostaudit",
            "scan",
            "--format",
            "json",
            "--only",
            "Firewall Status",
            "--only",
            "Antivirus Status",
            "--fail-under",
            "75",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan {
                format,
                only,
                fail_under,
                workers,
                ..
            } => {
                assert_eq!(format, "json");
                assert_eq!(only, ["Firewall Status", "Antivirus Status"]);
                assert_eq!(fail_under, Some(75));
                assert_eq!(workers, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["hostaudit", "scan", "--format", "sarif"]).is_err());
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = Cli::try_parse_from(["hostaudit", "modules", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_scan_help_names_registered_modules() {
        let cmd = Cli::command();
        let help = cmd
            .find_subcommand("scan")
            .and_then(|scan| scan.get_after_help())
            .unwrap()
            .to_string();
        let registered: Vec<String> =
            default_probes(Arc::new(UnsupportedQuery::new("test")), StatusPolicy::default())
                .iter()
                .map(|p| p.name().to_string())
                .collect();

        let quoted = regex::Regex::new(r#"--(?:only|disable) "([^"]+)""#).unwrap();
        let names: Vec<&str> = quoted
            .captures_iter(&help)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        assert_eq!(names.len(), 2);
        for name in names {
            assert!(registered.iter().any(|r| r == name), "unknown module {name:?} in help");
        }
    }
}
