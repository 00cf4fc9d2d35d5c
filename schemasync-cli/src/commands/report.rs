//! Run report output: JSON for machines, tables for people.

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use schemasync_core::FixPolicy;
use schemasync_detector::Divergence;
use schemasync_sync::{RepairOutcome, RunReport};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "host")]
    host: String,
    #[tabled(rename = "object")]
    object: String,
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "detail")]
    detail: String,
}

#[derive(Tabled)]
struct RepairRow {
    #[tabled(rename = "host")]
    host: String,
    #[tabled(rename = "statement")]
    statement: String,
    #[tabled(rename = "outcome")]
    outcome: String,
}

pub fn print_json(report: &RunReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize run report")?
    );
    Ok(())
}

pub fn print_summary(report: &RunReport, policy: FixPolicy) {
    println!(
        "schemasync v{} | {} | {} divergences | {} applied | {} failed",
        env!("CARGO_PKG_VERSION"),
        mode_label(policy),
        report.findings.len(),
        report.applied_count(),
        report.failed_count(),
    );

    if report.is_clean() {
        println!("{} every replica matches the declared schema", "✓".green().bold());
        return;
    }

    if !report.findings.is_empty() {
        let rows: Vec<FindingRow> = report
            .findings
            .iter()
            .map(|f| FindingRow {
                host: f.host.clone(),
                object: format!("{}.{}", f.database, f.object),
                kind: divergence_kind(&f.divergence),
                detail: f.divergence.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if !report.repairs.is_empty() {
        let rows: Vec<RepairRow> = report
            .repairs
            .iter()
            .map(|r| RepairRow {
                host: r.host.clone(),
                statement: r.statement.clone(),
                outcome: match &r.outcome {
                    RepairOutcome::Applied => "applied".green().to_string(),
                    RepairOutcome::Failed { error } => format!("{} {error}", "failed:".red()),
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for skipped in &report.skipped {
        println!(
            "{} {} {}.{}: {}",
            "skipped".yellow().bold(),
            skipped.host,
            skipped.database,
            skipped.object,
            skipped.reason
        );
    }
    for unreadable in &report.unreadable {
        println!(
            "{} {} {}.{}: {}",
            "unreadable".red().bold(),
            unreadable.host,
            unreadable.database,
            unreadable.object,
            unreadable.error
        );
    }

    if !policy.applies_fixes() && !report.findings.is_empty() {
        println!("Run with --sync to repair.");
    }
}

fn mode_label(policy: FixPolicy) -> &'static str {
    if policy.drops_columns() {
        "sync + drop columns"
    } else if policy.applies_fixes() {
        "sync"
    } else {
        "check only"
    }
}

fn divergence_kind(divergence: &Divergence) -> &'static str {
    match divergence {
        Divergence::ObjectMissing => "MISSING OBJECT",
        Divergence::ColumnExcess { .. } => "EXCESS COLUMN",
        Divergence::ColumnMissing { .. } => "MISSING COLUMN",
        Divergence::TypeMismatch { .. } => "TYPE MISMATCH",
    }
}
