mod reports;
mod util;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, debug};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use localesync_core::{
    EditPlan, LocaleConfig, LocaleStore, Policy, PropagateOptions, UsageManifest, apply_plan,
    check_locales, coverage_locales, gate, propagate, validate_tag,
};
use reports::ReportFormat;
use util::split_csv;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "localesync.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Add missing keys only; existing translations are kept
    Fill,
    /// Replace every target with a copy of canonical (destroys translations)
    Overwrite,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Fill => Self::Fill,
            PolicyArg::Overwrite => Self::Overwrite,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare every target's keys against canonical
    Check,
    /// Bring targets in line with canonical
    Propagate {
        #[arg(long, value_enum, default_value_t = PolicyArg::Fill)]
        policy: PolicyArg,
        /// Write keys in sorted order
        #[arg(long)]
        sort_keys: bool,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Fail when source code references keys canonical does not define
    Gate {
        /// Usage manifest produced by the source scanner
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Apply a structural edit plan to canonical and every target
    Edit {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long)]
        sort_keys: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Report translated share of canonical keys per locale
    Coverage {
        /// Fail when any locale is below this percentage
        #[arg(long)]
        min_coverage: Option<f64>,
    },
    /// List the key paths of one locale
    Keys {
        /// Locale to list (defaults to canonical)
        #[arg(long)]
        locale: Option<String>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "localesync", version)]
#[command(about = "Keep nested JSON locale catalogs consistent with a canonical locale")]
struct Args {
    /// Configuration file (defaults to ./localesync.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding <tag>.json documents
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Canonical locale tag
    #[arg(long, global = true)]
    canonical: Option<String>,

    /// Target locales (comma-separated)
    #[arg(long, global = true)]
    locales: Option<String>,

    /// Output report format
    #[arg(long, value_enum, global = true, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !run(&args)? {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn resolve_config(args: &Args) -> Result<LocaleConfig> {
    let mut config = match &args.config {
        Some(path) => LocaleConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            LocaleConfig::load(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("failed to load config {DEFAULT_CONFIG}"))?
        }
        None => LocaleConfig::default(),
    };

    if let Some(root) = &args.root {
        config.storage_root.clone_from(root);
    }
    if let Some(canonical) = &args.canonical {
        config.canonical.clone_from(canonical);
        config.targets.retain(|tag| tag != canonical);
    }
    if let Some(locales) = &args.locales {
        config.targets = split_csv(locales);
    }
    config.validate().context("invalid locale configuration")?;
    debug!(
        "canonical '{}', targets {:?}, root {}",
        config.canonical,
        config.targets,
        config.storage_root.display()
    );
    Ok(config)
}

fn propagate_options(sort_keys: bool, dry_run: bool) -> PropagateOptions {
    PropagateOptions { sort_keys, dry_run }
}

/// Execute the selected command and write its report. Returns whether the
/// run passed.
fn run(args: &Args) -> Result<bool> {
    let config = resolve_config(args)?;
    let store = LocaleStore::from_config(&config);
    let mut output_target = OutputTarget::new(args.output.clone())?;
    if output_target.is_file() {
        colored::control::set_override(false);
    }
    let out = output_target.writer();

    let passed = match &args.command {
        Command::Check => {
            let run = check_locales(&config, &store).context("consistency check aborted")?;
            reports::check_report(out, args.report, &run)?;
            run.passed()
        }
        Command::Propagate {
            policy,
            sort_keys,
            dry_run,
        } => {
            let summary = propagate(
                &config,
                &store,
                Policy::from(*policy),
                propagate_options(*sort_keys, *dry_run),
            )
            .context("propagation aborted")?;
            reports::propagation_report(out, args.report, &summary)?;
            summary.passed()
        }
        Command::Gate { manifest } => {
            let manifest = UsageManifest::load(manifest)
                .with_context(|| format!("failed to read usage manifest {}", manifest.display()))?;
            let canonical = store
                .load(&config.canonical)
                .context("failed to load canonical locale")?;
            canonical
                .keys(config.array_policy)
                .context("canonical locale is malformed")?;
            let result = gate(&manifest.references, &canonical);
            reports::gate_report(out, args.report, &result)?;
            result.passed
        }
        Command::Edit {
            plan,
            sort_keys,
            dry_run,
        } => {
            let plan = EditPlan::load(plan)
                .with_context(|| format!("failed to read edit plan {}", plan.display()))?;
            let summary = apply_plan(
                &config,
                &store,
                &plan,
                propagate_options(*sort_keys, *dry_run),
            )
            .context("edit plan could not be applied to the canonical locale")?;
            reports::edit_report(out, args.report, &summary)?;
            summary.passed()
        }
        Command::Coverage { min_coverage } => {
            let min_pct = min_coverage.unwrap_or(0.0);
            if !(0.0..=100.0).contains(&min_pct) {
                bail!("--min-coverage must be between 0 and 100, got {min_pct}");
            }
            let report = coverage_locales(&config, &store).context("coverage aborted")?;
            reports::coverage_report(out, args.report, &report, min_pct)?;
            report.below(min_pct).is_empty()
        }
        Command::Keys { locale } => {
            let tag = locale.as_deref().unwrap_or(&config.canonical);
            validate_tag(tag)?;
            let doc = store
                .load(tag)
                .with_context(|| format!("failed to load locale '{tag}'"))?;
            let keys = doc
                .keys(config.array_policy)
                .with_context(|| format!("locale '{tag}' is malformed"))?;
            reports::keys_report(out, args.report, tag, &keys)?;
            true
        }
    };

    output_target.flush_inner()?;
    Ok(passed)
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    const fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
