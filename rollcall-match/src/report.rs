//! Report rendering for the command-line surface

use crate::reconcile::RunReport;
use rollcall_common::{Error, Result};
use tabled::{settings::Style as TableStyle, Table, Tabled};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Bordered text table followed by the summary
    #[default]
    Table,
    /// Full report as pretty JSON
    Json,
    /// One status bit per line, roster order
    Binary,
}

pub fn render(report: &RunReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Table => Ok(render_table(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e))),
        ReportFormat::Binary => Ok(report.binary_export()),
    }
}

/// One table line per mentee
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Mentee")]
    mentee: String,
    #[tabled(rename = "Program")]
    program: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Minutes")]
    minutes: u32,
    #[tabled(rename = "Status")]
    status: u8,
    #[tabled(rename = "Source")]
    source: &'static str,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Conf")]
    confidence: String,
}

fn two_places(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn render_table(report: &RunReport) -> String {
    let rows: Vec<ResultRow> = report
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| ResultRow {
            position: i + 1,
            mentee: r.mentee.name.clone(),
            program: r.mentee.program.clone(),
            matched: r.matched_name.clone().unwrap_or_else(|| "-".to_string()),
            minutes: r.duration_minutes,
            status: r.status.as_bit(),
            source: r.match_meta.source.as_str(),
            score: two_places(r.match_meta.score),
            confidence: two_places(r.match_meta.confidence),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());

    let summary = &report.summary;
    format!(
        "{}\n\nTotal: {}  Present: {}  Absent: {}  (run {})\n",
        table, summary.total, summary.present, summary.absent, report.run_id
    )
}
