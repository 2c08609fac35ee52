use crate::application::mall::ActiveSessionReport;
use crate::error::Result;
use chrono::Local;
use serde::Serialize;
use std::io::Write;

pub const ENTRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "Entry Time")]
    entry_time: String,
    #[serde(rename = "Time Inside (mins)")]
    minutes_inside: f64,
    #[serde(rename = "Balance")]
    balance: String,
}

/// Writes the active-session report as CSV.
///
/// Entry times are rendered in local time.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new().from_writer(sink);
        Self { writer }
    }

    pub fn write_reports(&mut self, reports: &[ActiveSessionReport]) -> Result<()> {
        if reports.is_empty() {
            // serde only emits the header alongside the first record
            self.writer.write_record([
                "Name",
                "Phone",
                "Entry Time",
                "Time Inside (mins)",
                "Balance",
            ])?;
        }
        for report in reports {
            self.writer.serialize(ReportRow {
                name: &report.name,
                phone: &report.phone,
                entry_time: report
                    .entry_time
                    .with_timezone(&Local)
                    .format(ENTRY_TIME_FORMAT)
                    .to_string(),
                minutes_inside: report.minutes_inside,
                balance: report.balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
