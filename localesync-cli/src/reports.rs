use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use localesync_core::{
    CheckStatus, ConsistencyRun, CoverageReport, EditSummary, GateResult, KeyPath, OutcomeStatus,
    PropagationSummary, TargetOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored human-readable summary
    Console,
    /// Machine-readable JSON envelope
    Json,
    /// Markdown suitable for CI job summaries
    Markdown,
}

/// Keys listed per locale before the console report truncates.
const CONSOLE_KEY_LIMIT: usize = 20;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    command: &'a str,
    passed: bool,
    generated_at: String,
    report: &'a T,
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn write_json<T: Serialize>(
    out: &mut dyn Write,
    command: &str,
    passed: bool,
    report: &T,
) -> Result<()> {
    let envelope = Envelope {
        command,
        passed,
        generated_at: timestamp(),
        report,
    };
    serde_json::to_writer_pretty(&mut *out, &envelope)?;
    writeln!(out)?;
    Ok(())
}

fn markdown_header(out: &mut dyn Write, title: &str, passed: bool) -> Result<()> {
    let status = if passed { "✅ passed" } else { "❌ failed" };
    writeln!(out, "# {title}\n")?;
    writeln!(out, "_Generated {} · {status}_\n", timestamp())?;
    Ok(())
}

fn console_keys(out: &mut dyn Write, label: &str, keys: &[KeyPath]) -> Result<()> {
    if keys.is_empty() {
        return Ok(());
    }
    writeln!(out, "   {label}:")?;
    for key in keys.iter().take(CONSOLE_KEY_LIMIT) {
        writeln!(out, "     • {key}")?;
    }
    if keys.len() > CONSOLE_KEY_LIMIT {
        writeln!(out, "     … and {} more", keys.len() - CONSOLE_KEY_LIMIT)?;
    }
    Ok(())
}

fn markdown_keys(out: &mut dyn Write, label: &str, keys: &[KeyPath]) -> Result<()> {
    if keys.is_empty() {
        return Ok(());
    }
    writeln!(out, "- **{label}** ({}):", keys.len())?;
    for key in keys {
        writeln!(out, "  - `{key}`")?;
    }
    Ok(())
}

pub fn check_report(out: &mut dyn Write, format: ReportFormat, run: &ConsistencyRun) -> Result<()> {
    match format {
        ReportFormat::Json => write_json(out, "check", run.passed(), run),
        ReportFormat::Markdown => {
            markdown_header(out, "Locale Consistency", run.passed())?;
            writeln!(
                out,
                "Canonical `{}` defines {} keys.\n",
                run.canonical, run.canonical_keys
            )?;
            writeln!(out, "| Locale | Status | Missing | Orphaned | Untranslated |")?;
            writeln!(out, "|---|---|---|---|---|")?;
            for locale in &run.locales {
                writeln!(
                    out,
                    "| {} | {:?} | {} | {} | {} |",
                    locale.tag,
                    locale.status,
                    locale.missing.len(),
                    locale.orphaned.len(),
                    locale.untranslated.len()
                )?;
            }
            writeln!(out)?;
            for locale in run.locales.iter().filter(|l| !l.passed()) {
                writeln!(out, "## {}\n", locale.tag)?;
                if let Some(error) = &locale.error {
                    writeln!(out, "- **Error**: {error}")?;
                }
                markdown_keys(out, "Missing", &locale.missing)?;
                writeln!(out)?;
            }
            Ok(())
        }
        ReportFormat::Console => {
            writeln!(
                out,
                "{}",
                format!(
                    "🔎 Locale consistency (canonical: {}, {} keys)",
                    run.canonical, run.canonical_keys
                )
                .bright_cyan()
                .bold()
            )?;
            for locale in &run.locales {
                let status = match locale.status {
                    CheckStatus::Ok => "✅ OK      ".green(),
                    CheckStatus::Diverged => "❌ DIVERGED".red(),
                    CheckStatus::Failed => "💥 FAILED  ".red().bold(),
                };
                writeln!(out, "{status} {}", locale.tag.bold())?;
                if let Some(error) = &locale.error {
                    writeln!(out, "   {}", error.red())?;
                }
                console_keys(out, "missing", &locale.missing)?;
                console_keys(out, "orphaned", &locale.orphaned)?;
                if !locale.untranslated.is_empty() {
                    writeln!(
                        out,
                        "   {} placeholder values",
                        locale.untranslated.len().to_string().yellow()
                    )?;
                }
            }
            let failed = run.locales.iter().filter(|l| !l.passed()).count();
            writeln!(
                out,
                "\nLocales: {}  Passed: {}  Failed: {}",
                run.locales.len(),
                (run.locales.len() - failed).to_string().green(),
                failed.to_string().red()
            )?;
            Ok(())
        }
    }
}

fn console_outcome(out: &mut dyn Write, outcome: &TargetOutcome) -> Result<()> {
    let status = match outcome.status {
        OutcomeStatus::Updated => "✏️  UPDATED  ".yellow(),
        OutcomeStatus::Unchanged => "✅ UNCHANGED".green(),
        OutcomeStatus::Failed => "💥 FAILED   ".red().bold(),
    };
    writeln!(out, "{status} {}", outcome.tag.bold())?;
    if let Some(error) = &outcome.error {
        writeln!(out, "   {}", error.red())?;
    }
    for note in &outcome.notes {
        writeln!(out, "   {note}")?;
    }
    console_keys(out, "added", &outcome.added)
}

fn markdown_outcomes(out: &mut dyn Write, outcomes: &[&TargetOutcome]) -> Result<()> {
    writeln!(out, "| Locale | Status | Keys added | Notes |")?;
    writeln!(out, "|---|---|---|---|")?;
    for outcome in outcomes {
        let notes = outcome
            .error
            .clone()
            .unwrap_or_else(|| outcome.notes.join("; "));
        writeln!(
            out,
            "| {} | {:?} | {} | {} |",
            outcome.tag,
            outcome.status,
            outcome.added.len(),
            notes.replace('|', "\\|")
        )?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn propagation_report(
    out: &mut dyn Write,
    format: ReportFormat,
    summary: &PropagationSummary,
) -> Result<()> {
    match format {
        ReportFormat::Json => write_json(out, "propagate", summary.passed(), summary),
        ReportFormat::Markdown => {
            markdown_header(out, "Locale Propagation", summary.passed())?;
            writeln!(
                out,
                "Policy `{:?}` from canonical `{}`{}.\n",
                summary.policy,
                summary.canonical,
                if summary.dry_run { " (dry run)" } else { "" }
            )?;
            let outcomes: Vec<&TargetOutcome> = summary.locales.iter().collect();
            markdown_outcomes(out, &outcomes)
        }
        ReportFormat::Console => {
            let mut title = format!(
                "🔁 Propagating from {} with {:?} policy",
                summary.canonical, summary.policy
            );
            if summary.dry_run {
                title.push_str(" (dry run)");
            }
            writeln!(out, "{}", title.bright_cyan().bold())?;
            if summary.policy.discards_translations() {
                writeln!(
                    out,
                    "{}",
                    "⚠️  overwrite discards existing translations".yellow()
                )?;
            }
            for outcome in &summary.locales {
                console_outcome(out, outcome)?;
            }
            Ok(())
        }
    }
}

pub fn edit_report(out: &mut dyn Write, format: ReportFormat, summary: &EditSummary) -> Result<()> {
    match format {
        ReportFormat::Json => write_json(out, "edit", summary.passed(), summary),
        ReportFormat::Markdown => {
            markdown_header(out, &format!("Edit plan: {}", summary.plan), summary.passed())?;
            let outcomes: Vec<&TargetOutcome> = std::iter::once(&summary.canonical)
                .chain(summary.locales.iter())
                .collect();
            markdown_outcomes(out, &outcomes)
        }
        ReportFormat::Console => {
            let mut title = format!("🛠️  Applying edit plan '{}'", summary.plan);
            if summary.dry_run {
                title.push_str(" (dry run)");
            }
            writeln!(out, "{}", title.bright_cyan().bold())?;
            console_outcome(out, &summary.canonical)?;
            for outcome in &summary.locales {
                console_outcome(out, outcome)?;
            }
            Ok(())
        }
    }
}

pub fn gate_report(out: &mut dyn Write, format: ReportFormat, result: &GateResult) -> Result<()> {
    match format {
        ReportFormat::Json => write_json(out, "gate", result.passed, result),
        ReportFormat::Markdown => {
            markdown_header(out, "Translation Key Gate", result.passed)?;
            writeln!(
                out,
                "- **Checked**: {}\n- **Exempted**: {}\n- **Missing**: {}\n",
                result.checked,
                result.exempted,
                result.missing.len()
            )?;
            for key in &result.missing {
                writeln!(out, "- `{key}`")?;
            }
            Ok(())
        }
        ReportFormat::Console => {
            writeln!(out, "{}", "🚦 Translation key gate".bright_cyan().bold())?;
            writeln!(
                out,
                "Checked {} references ({} exempted)",
                result.checked, result.exempted
            )?;
            if result.passed {
                writeln!(out, "{}", "✅ every referenced key exists".green())?;
            } else {
                writeln!(
                    out,
                    "{}",
                    format!("❌ {} keys missing from canonical", result.missing.len()).red()
                )?;
                for key in &result.missing {
                    writeln!(out, "   • {key}")?;
                }
            }
            Ok(())
        }
    }
}

pub fn coverage_report(
    out: &mut dyn Write,
    format: ReportFormat,
    report: &CoverageReport,
    min_pct: f64,
) -> Result<()> {
    let passed = report.below(min_pct).is_empty();
    match format {
        ReportFormat::Json => write_json(out, "coverage", passed, report),
        ReportFormat::Markdown => {
            markdown_header(out, "Translation Coverage", passed)?;
            writeln!(
                out,
                "Canonical `{}` defines {} keys; minimum {min_pct:.1}%.\n",
                report.canonical, report.canonical_keys
            )?;
            writeln!(
                out,
                "| Locale | Coverage | Present | Missing | Untranslated | Same as canonical |"
            )?;
            writeln!(out, "|---|---|---|---|---|---|")?;
            for locale in &report.locales {
                if let Some(error) = &locale.error {
                    writeln!(out, "| {} | error: {error} | | | | |", locale.tag)?;
                    continue;
                }
                writeln!(
                    out,
                    "| {} | {:.1}% | {} | {} | {} | {} |",
                    locale.tag,
                    locale.coverage_pct,
                    locale.present,
                    locale.missing.len(),
                    locale.untranslated.len(),
                    locale.identical_to_canonical.len()
                )?;
            }
            writeln!(out)?;
            markdown_keys(
                out,
                "Canonical placeholders",
                &report.canonical_placeholders,
            )
        }
        ReportFormat::Console => {
            writeln!(
                out,
                "{}",
                format!(
                    "📊 Translation coverage (canonical: {}, {} keys)",
                    report.canonical, report.canonical_keys
                )
                .bright_cyan()
                .bold()
            )?;
            for locale in &report.locales {
                if let Some(error) = &locale.error {
                    writeln!(out, "💥 {} {}", locale.tag.bold(), error.red())?;
                    continue;
                }
                let pct = format!("{:>6.1}%", locale.coverage_pct);
                let pct = if locale.coverage_pct >= min_pct {
                    pct.green()
                } else {
                    pct.red()
                };
                writeln!(
                    out,
                    "{pct} {}  ({} translated, {} missing, {} untranslated, {} same as canonical)",
                    locale.tag.bold(),
                    locale.translated(),
                    locale.missing.len(),
                    locale.untranslated.len(),
                    locale.identical_to_canonical.len()
                )?;
            }
            if !report.canonical_placeholders.is_empty() {
                writeln!(
                    out,
                    "{}",
                    format!(
                        "⚠️  canonical has {} placeholder values",
                        report.canonical_placeholders.len()
                    )
                    .yellow()
                )?;
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct KeyListing<'a> {
    locale: &'a str,
    keys: &'a [KeyPath],
}

pub fn keys_report(
    out: &mut dyn Write,
    format: ReportFormat,
    locale: &str,
    keys: &[KeyPath],
) -> Result<()> {
    match format {
        ReportFormat::Json => write_json(out, "keys", true, &KeyListing { locale, keys }),
        ReportFormat::Markdown => {
            markdown_header(out, &format!("Keys in {locale}"), true)?;
            for key in keys {
                writeln!(out, "- `{key}`")?;
            }
            Ok(())
        }
        ReportFormat::Console => {
            for key in keys {
                writeln!(out, "{key}")?;
            }
            Ok(())
        }
    }
}
