use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use codemlp::{
    about,
    bootstrap::{format_series_text, parse_reports, write_spread_csv, BootstrapSet},
    config::AnalysisConfig,
    report::{format_summary_text, likelihood_ratio, load_report, summarize, write_sites_csv},
    ModelId,
};
use log::{info, Level};
use serde::Serialize;
use simple_logger::init_with_level;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "codemlp",
    about = "Per-site dN/dS statistics from codeml rst reports",
    disable_version_flag = true
)]
struct Args {
    #[arg(
        value_name = "REPORT",
        required_unless_present = "version",
        help = "codeml rst report(s); several reports are read as bootstrap replicates"
    )]
    reports: Vec<PathBuf>,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "JSON file with parser windows and job count"
    )]
    config: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "THREADS",
        help = "Threads used to parse replicate reports"
    )]
    jobs: Option<usize>,

    #[arg(
        long = "lrt",
        value_name = "NULL_ID:ALT_ID",
        help = "Print the likelihood-ratio statistic between two models of one report"
    )]
    lrt: Option<String>,

    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet", help = "Debug logging")]
    verbose: bool,

    #[arg(short = 'q', long = "quiet", help = "Only log warnings and errors")]
    quiet: bool,

    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue, help = "Print version")]
    version: bool,
}

fn parse_model_pair(text: &str) -> Result<(ModelId, ModelId)> {
    let (null_id, alt_id) = text
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected NULL_ID:ALT_ID, got '{text}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<ModelId>()
            .with_context(|| format!("Invalid model id '{v}'"))
    };
    Ok((parse(null_id)?, parse(alt_id)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    if args.version {
        println!("{}", about::version_cli_text());
        return Ok(());
    }

    let level = if args.verbose {
        Level::Debug
    } else if args.quiet {
        Level::Warn
    } else {
        Level::Info
    };
    init_with_level(level).context("Could not initialise logging")?;

    let start = std::time::Instant::now();
    let mut config = AnalysisConfig::load(args.config.as_deref())?;
    if let Some(jobs) = args.jobs {
        config.jobs = (jobs > 0).then_some(jobs);
    }

    if let Some(pair) = &args.lrt {
        let [path] = args.reports.as_slice() else {
            bail!("--lrt takes exactly one report");
        };
        let (null_id, alt_id) = parse_model_pair(pair)?;
        let report = load_report(path, &config.limits)?;
        let statistic = likelihood_ratio(&report, null_id, alt_id)?;
        println!("2*dlnL (model {null_id} vs model {alt_id}) = {statistic:.6}");
        return Ok(());
    }

    if let [path] = args.reports.as_slice() {
        let report = load_report(path, &config.limits)?;
        let source = path.display().to_string();
        match args.format {
            OutputFormat::Text => print!("{}", format_summary_text(&summarize(&source, &report))),
            OutputFormat::Json => print_json(&summarize(&source, &report))?,
            OutputFormat::Csv => write_sites_csv(&report, io::stdout().lock())?,
        }
    } else {
        let reports = parse_reports(&args.reports, &config.limits, config.jobs)?;
        let set = BootstrapSet::new(reports)?;
        let series = set.all_series()?;
        match args.format {
            OutputFormat::Text => {
                for s in &series {
                    print!("{}", format_series_text(s));
                }
            }
            OutputFormat::Json => print_json(&series)?,
            OutputFormat::Csv => write_spread_csv(&series, io::stdout().lock())?,
        }
    }

    info!("Elapsed time: {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_pair() {
        assert_eq!(parse_model_pair("1:2").unwrap(), (1, 2));
        assert_eq!(parse_model_pair(" 7 : 8 ").unwrap(), (7, 8));
        assert!(parse_model_pair("1-2").is_err());
        assert!(parse_model_pair("a:2").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["codemlp", "-f", "json", "-j", "4", "a.rst", "b.rst"])
            .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.reports.len(), 2);
        assert!(Args::try_parse_from(["codemlp"]).is_err());
        assert!(Args::try_parse_from(["codemlp", "-V"]).unwrap().version);
        assert!(Args::try_parse_from(["codemlp", "-v", "-q", "a.rst"]).is_err());
    }
}
