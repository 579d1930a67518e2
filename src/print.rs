use colored::Colorize;
use ellipse::Ellipse;
use serde::Serialize;
use std::io::Write;
use terminal_size::{terminal_size, Width};

use crate::{
    engine::{DailyProjection, SimulationResult},
    model::*,
};

pub struct Format {
    summary_width: usize,
    value_width: usize,
}

impl Format {
    const DATE_WIDTH: usize = 10;
    const ALERT_WIDTH: usize = 12;
    const MINIMUM_SUMMARY: usize = 16;

    pub fn new(width: Option<u16>) -> Self {
        let maximum_width = match (width, terminal_size()) {
            (Some(w), _) | (None, Some((Width(w), _))) => w as usize,
            _ => 160,
        };

        let value_width = 14;
        let fixed = Self::DATE_WIDTH + Self::ALERT_WIDTH + value_width * 3 + 5;
        let summary_width = maximum_width
            .saturating_sub(fixed)
            .max(Self::MINIMUM_SUMMARY);

        Self {
            summary_width,
            value_width,
        }
    }

    fn header(&self) -> String {
        format!(
            "{:date_width$} {:>value_width$} {:>value_width$} {:>value_width$} {:alert_width$} {}",
            "date",
            "start",
            "change",
            "end",
            "alert",
            "transactions",
            date_width = Self::DATE_WIDTH,
            value_width = self.value_width,
            alert_width = Self::ALERT_WIDTH,
        )
    }

    fn row(&self, day: &DailyProjection) -> String {
        format!(
            "{:date_width$} {:>value_width$} {:>value_width$} {:>value_width$} {:alert_width$} {}",
            day.date.format("%Y-%m-%d").to_string(),
            format_amount(&day.start_balance),
            format_amount(&day.net_change),
            format_amount(&day.end_balance),
            day.alert_type,
            day.transactions_summary
                .as_str()
                .truncate_ellipse(self.summary_width - 3),
            date_width = Self::DATE_WIDTH,
            value_width = self.value_width,
            alert_width = Self::ALERT_WIDTH,
        )
    }
}

pub fn write_table(
    writer: &mut impl Write,
    result: &SimulationResult,
    format: &Format,
) -> Result<()> {
    writeln!(writer, "{}", format.header().bold())?;
    for day in result.iter() {
        let row = format.row(day);
        if day.is_alert() {
            writeln!(writer, "{}", row.red())?;
        } else {
            writeln!(writer, "{}", row.normal())?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'r> {
    date: String,
    start_balance: String,
    transactions_summary: &'r str,
    net_change: String,
    end_balance: String,
    alert_type: &'static str,
}

impl<'r> From<&'r DailyProjection> for CsvRow<'r> {
    fn from(day: &'r DailyProjection) -> Self {
        Self {
            date: day.date.format("%Y-%m-%d").to_string(),
            start_balance: format_amount(&day.start_balance),
            transactions_summary: &day.transactions_summary,
            net_change: format_amount(&day.net_change),
            end_balance: format_amount(&day.end_balance),
            alert_type: day.alert_type.as_str(),
        }
    }
}

pub fn write_csv(writer: impl Write, result: &SimulationResult) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for day in result.iter() {
        writer.serialize(CsvRow::from(day))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(writer: impl Write, result: &SimulationResult) -> Result<()> {
    serde_json::to_writer(writer, result)?;
    Ok(())
}
