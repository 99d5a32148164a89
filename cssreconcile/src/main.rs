use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cssreconcile_lib::pipeline::{bundle, extract, split, validate};
use cssreconcile_lib::style::css_diff::Verdict;
use cssreconcile_lib::Settings;
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;

const CSSRECONCILE_INTRO: &str = r#"
      ___________ ____
     / ___/ ___/ ___/________  _________  ____  _____(_) /__
    / /   \__ \\__ \/ ___/ _ \/ ___/ __ \/ __ \/ ___/ / / _ \
   / /___ ___/ /__/ / /  /  __/ /__/ /_/ / / / / /__/ / /  __/
   \____//____/____/_/   \___/\___/\____/_/ /_/\___/_/_/\___/

    Separates theme customizations from library CSS.
"#;

const EXIT_CRITICAL: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "cssreconcile")]
#[command(about = "Reconcile a compiled theme stylesheet with its library stylesheets")]
struct Args {
    /// Settings file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remove library rules from a theme stylesheet and substitute variables.
    Extract {
        /// Compiled theme stylesheet.
        stylesheet: PathBuf,

        /// Reference stylesheet; repeat for several.
        #[arg(short, long = "reference", required = true)]
        references: Vec<PathBuf>,

        /// Variables file with `$name: value;` definitions.
        #[arg(long)]
        variables: Option<PathBuf>,

        /// Output file name.
        #[arg(short, long)]
        output: PathBuf,

        /// Where removed rules are listed for review.
        #[arg(long)]
        audit: PathBuf,

        /// Drop `/*! ... */` comments from references before parsing.
        #[arg(long)]
        strip_preserved_comments: bool,

        /// Only remove exact matches.
        #[arg(long)]
        no_patterns: bool,
    },

    /// Compare two snapshots of a stylesheet.
    Validate {
        before: PathBuf,
        after: PathBuf,

        /// Report file name.
        #[arg(short, long)]
        report: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Concatenate library stylesheets into one reference file.
    Bundle {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Output file name.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Derive a library reference from a compiled theme using the
    /// configured custom selectors.
    Split {
        stylesheet: PathBuf,

        /// Output file name.
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for validate::ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => validate::ReportFormat::Text,
            Format::Json => validate::ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    println!("{}", CSSRECONCILE_INTRO);

    // parse the args given in terminal
    let args: Args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let settings = Settings::load_or_default(args.config.as_deref()).context("loading settings")?;

    match args.command {
        Command::Extract {
            stylesheet,
            references,
            variables,
            output,
            audit,
            strip_preserved_comments,
            no_patterns,
        } => {
            let options = extract::ExtractOptions {
                stylesheet,
                references,
                variables,
                output,
                audit,
                strip_preserved_comments,
                use_patterns: !no_patterns,
            };
            let summary = extract::run(&options, &settings).context("extraction failed")?;
            println!("✓ Extraction complete!");
            println!("  Rules:        {}", summary.original_rules);
            println!("  Kept:         {}", summary.kept);
            println!(
                "  Removed:      {} ({} exact, {} pattern)",
                summary.exact + summary.pattern,
                summary.exact,
                summary.pattern
            );
            println!("  Pruned:       {} empty at-rules", summary.pruned_at_rules);
            println!("  Replacements: {}", summary.replacements);
            println!("  Output:       {}", options.output.display());
            println!("  Audit:        {}", options.audit.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            before,
            after,
            report,
            format,
        } => {
            let options = validate::ValidateOptions {
                before,
                after,
                report,
                format: format.into(),
            };
            let diff = validate::run(&options, &settings).context("validation failed")?;
            println!("Report saved to: {}", options.report.display());
            match diff.verdict() {
                Verdict::Identical => {
                    println!("✓ VALIDATION PASSED - Files are identical");
                    Ok(ExitCode::SUCCESS)
                }
                Verdict::Pass => {
                    println!("✓ VALIDATION PASSED - No critical differences");
                    println!("  ({} non-critical differences found)", diff.entries.len());
                    Ok(ExitCode::SUCCESS)
                }
                Verdict::Fail => {
                    println!("✗ VALIDATION FAILED - Critical differences detected");
                    println!("  Total differences: {}", diff.entries.len());
                    println!("  Critical differences: {}", diff.critical_count());
                    Ok(ExitCode::from(EXIT_CRITICAL))
                }
            }
        }
        Command::Bundle { sources, output } => {
            let sources: Vec<bundle::BundleSource> =
                sources.into_iter().map(bundle::BundleSource::from_path).collect();
            let bytes = bundle::run(&sources, &output).context("bundling failed")?;
            println!(
                "✓ Reference libraries built successfully ({:.2} KB)",
                bytes as f64 / 1024.0
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Split { stylesheet, output } => {
            let summary = split::run(&stylesheet, &output, &settings).context("split failed")?;
            println!("✓ Reference extracted successfully");
            println!("  Library rules:        {}", summary.kept);
            println!("  Custom rules skipped: {}", summary.dropped);
            println!("  Output:               {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
