//! boardfab CLI - design rule checks and fabrication output from the command line.

use anyhow::{Context, Result};
use boardfab::{
    ApprovalSet, BoardFabCore, DrcOptions, DrcReport, FabricationSettings, RuleCheckMessage,
    RulesEngine, Severity,
};
use boardfab::drc::Rule;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boardfab")]
#[command(about = "PCB design rule check and fabrication output tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the design rule check on a board snapshot
    Drc {
        /// Path to the board snapshot (.json)
        #[arg(value_name = "BOARD")]
        board: PathBuf,

        /// DRC options file (JSON), missing fields use the defaults
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Approved messages file (JSON list of approval keys)
        #[arg(long, value_name = "FILE")]
        approvals: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if messages of this severity or higher remain
        #[arg(long, value_enum)]
        fail_on: Option<FailOnSeverity>,
    },

    /// Generate Gerber, Excellon and pick-and-place files
    Export {
        /// Path to the board snapshot (.json)
        #[arg(value_name = "BOARD")]
        board: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "fabrication")]
        output: PathBuf,

        /// Fabrication settings file (JSON), missing fields use the defaults
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Write plated and non-plated holes into a single drill file
        #[arg(long)]
        merge_drills: bool,

        /// Write slots as G85 canned cycles
        #[arg(long)]
        g85_slots: bool,
    },

    /// List the design rules in evaluation order
    Rules {
        /// Show whether each rule is enabled by default
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
    /// GitHub Actions format
    Github,
    /// GitLab CI format
    Gitlab,
}

#[derive(Clone, ValueEnum)]
enum FailOnSeverity {
    Error,
    Warning,
    Hint,
}

impl FailOnSeverity {
    fn severity(&self) -> Severity {
        match self {
            FailOnSeverity::Error => Severity::Error,
            FailOnSeverity::Warning => Severity::Warning,
            FailOnSeverity::Hint => Severity::Hint,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BOARDFAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Drc {
            board,
            options,
            approvals,
            format,
            fail_on,
        } => handle_drc(&board, options.as_deref(), approvals.as_deref(), format, fail_on),
        Commands::Export {
            board,
            output,
            settings,
            merge_drills,
            g85_slots,
        } => handle_export(&board, &output, settings.as_deref(), merge_drills, g85_slots),
        Commands::Rules { verbose } => {
            handle_rules(verbose);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn handle_drc(
    board: &Path,
    options: Option<&Path>,
    approvals: Option<&Path>,
    format: OutputFormat,
    fail_on: Option<FailOnSeverity>,
) -> Result<ExitCode> {
    let options = match options {
        Some(path) => DrcOptions::load_json(path)
            .with_context(|| format!("failed to load DRC options from {}", path.display()))?,
        None => DrcOptions::default(),
    };
    let approvals = match approvals {
        Some(path) => ApprovalSet::load_json(path)
            .with_context(|| format!("failed to load approvals from {}", path.display()))?,
        None => ApprovalSet::new(),
    };
    tracing::debug!("Using {} approved messages", approvals.len());

    let report = BoardFabCore::check_file(board, options, &approvals)
        .with_context(|| format!("design rule check of {} failed", board.display()))?;
    output_report(board, &report, &format)?;

    if let Some(severity) = fail_on {
        if report.has_at_least(severity.severity()) {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_export(
    board: &Path,
    output: &Path,
    settings: Option<&Path>,
    merge_drills: bool,
    g85_slots: bool,
) -> Result<ExitCode> {
    let mut settings = match settings {
        Some(path) => FabricationSettings::load_json(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => FabricationSettings::default(),
    };
    settings.merge_drill_files |= merge_drills;
    settings.use_g85_slot_command |= g85_slots;

    let written = BoardFabCore::export_file(board, settings, output)
        .with_context(|| format!("export of {} failed", board.display()))?;
    for path in &written {
        println!("{}", path.display());
    }
    println!("\n{} files written to {}", written.len(), output.display());
    Ok(ExitCode::SUCCESS)
}

fn output_report(file: &Path, report: &DrcReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => output_human(file, report),
        OutputFormat::Json => output_json(file, report)?,
        OutputFormat::Github => output_github(file, report),
        OutputFormat::Gitlab => output_gitlab(file, report)?,
    }
    Ok(())
}

fn output_human(file: &Path, report: &DrcReport) {
    println!("\nBoard: {} ({})", report.board, file.display());
    println!("{}", "─".repeat(60));

    if report.total_messages() == 0 {
        println!("  No issues found");
    }

    for (severity, title) in [
        (Severity::Error, "ERRORS"),
        (Severity::Warning, "WARNINGS"),
        (Severity::Hint, "HINTS"),
    ] {
        let messages: Vec<&RuleCheckMessage> = report
            .messages
            .iter()
            .filter(|m| m.severity == severity)
            .collect();
        if messages.is_empty() {
            continue;
        }
        println!("\n  {}:", title);
        for message in messages {
            println!("    - {}", message.message);
            println!("      Rule: {}", message.rule_id);
        }
    }

    println!("\n  Summary:");
    println!("    Errors:   {}", report.stats.errors);
    println!("    Warnings: {}", report.stats.warnings);
    println!("    Hints:    {}", report.stats.hints);
    if report.approved > 0 {
        println!("    Approved: {}", report.approved);
    }
}

fn output_json(file: &Path, report: &DrcReport) -> Result<()> {
    let output = serde_json::json!({
        "file": file.display().to_string(),
        "board": report.board,
        "messages": report.messages,
        "stats": report.stats,
        "approved": report.approved,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn severity_to_github(message: &RuleCheckMessage) -> &'static str {
    match message.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Hint => "notice",
    }
}

fn output_github(file: &Path, report: &DrcReport) {
    for message in &report.messages {
        println!(
            "::{} file={},title={}::{}",
            severity_to_github(message),
            file.display(),
            message.rule_id,
            message.message.replace('\n', " ")
        );
    }
}

fn severity_to_gitlab(message: &RuleCheckMessage) -> &'static str {
    match message.severity {
        Severity::Error => "blocker",
        Severity::Warning => "major",
        Severity::Hint => "info",
    }
}

fn output_gitlab(file: &Path, report: &DrcReport) -> Result<()> {
    let reports: Vec<serde_json::Value> = report
        .messages
        .iter()
        .map(|message| {
            serde_json::json!({
                "description": message.message,
                "check_name": message.rule_id,
                "fingerprint": message.approval,
                "severity": severity_to_gitlab(message),
                "location": {
                    "path": file.display().to_string(),
                }
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn handle_rules(verbose: bool) {
    println!("Design rules in evaluation order:\n");

    let defaults = DrcOptions::default();
    let engine = RulesEngine::with_default_rules();
    for rule in engine.rules() {
        println!("  {}", rule.id());
        println!("    {}", rule.name().trim_end_matches("..."));
        if verbose {
            let state = if rule.enabled(&defaults) {
                "enabled"
            } else {
                "disabled"
            };
            println!("    {} by default", state);
        }
        println!();
    }
}
