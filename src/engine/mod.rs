use chrono::Days;
use regex::Regex;
use serde::{ser::SerializeStruct, Serialize};
use std::{collections::HashMap, str::FromStr, time::Instant};
use thiserror::Error;
use tracing::{debug, info, span, Level};

use crate::model::*;

pub mod advisor;
pub mod orchestrator;


#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("simulation window must be at least one day")]
    EmptyWindow,
    #[error("a {days} day window starting {start} runs past the supported calendar")]
    DateOutOfRange { start: NaiveDate, days: usize },
    #[error("row {row}: malformed amount '{value}'")]
    MalformedAmount { row: usize, value: String },
    #[error("row {row}: malformed date '{value}'")]
    MalformedDate { row: usize, value: String },
    #[error("malformed month '{0}', expected YYYYMM")]
    MalformedMonth(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AlertType {
    Ok,
    BelowTarget,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Ok => "OK",
            AlertType::BelowTarget => "BELOW_TARGET",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct DailyProjection {
    pub date: NaiveDate,
    pub start_balance: BigDecimal,
    pub net_change: BigDecimal,
    pub end_balance: BigDecimal,
    pub alert_type: AlertType,
    /// Amount needed to bring the end balance back up to target, present only
    /// on `BelowTarget` days. Mirrors the note embedded in the summary.
    pub shortfall: Option<BigDecimal>,
    pub transactions_summary: String,
}

impl DailyProjection {
    pub fn is_alert(&self) -> bool {
        self.alert_type == AlertType::BelowTarget
    }
}

impl Serialize for DailyProjection {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DailyProjection", 7)?;
        state.serialize_field("date", &self.date.format("%Y-%m-%d").to_string())?;
        state.serialize_field("start_balance", &format_amount(&self.start_balance))?;
        state.serialize_field("net_change", &format_amount(&self.net_change))?;
        state.serialize_field("end_balance", &format_amount(&self.end_balance))?;
        state.serialize_field("alert_type", self.alert_type.as_str())?;
        state.serialize_field("shortfall", &self.shortfall.as_ref().map(format_amount))?;
        state.serialize_field("transactions_summary", &self.transactions_summary)?;
        state.end()
    }
}

/// One projection per calendar day, contiguous from the start date.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SimulationResult {
    days: Vec<DailyProjection>,
}

impl SimulationResult {
    pub fn days(&self) -> &[DailyProjection] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailyProjection> {
        self.days.iter()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &DailyProjection> {
        self.days.iter().filter(|d| d.is_alert())
    }

    /// Index of the last day of the first month found in the window, that is
    /// the first `i` where `days[i]` and `days[i + 1]` fall in different months.
    pub fn first_month_boundary(&self) -> Option<usize> {
        use chrono::Datelike;

        self.days
            .iter()
            .tuple_windows()
            .position(|(today, tomorrow)| today.date.month() != tomorrow.date.month())
    }
}

impl Serialize for SimulationResult {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.days.serialize(serializer)
    }
}

const ADD_FUNDS: &str = "SYSTEM: Add funds";

/// The shortfall note appended to alert days. Downstream reports extract the
/// amount with a pattern match so the wording and precision are fixed.
pub fn add_funds_note(shortfall: &BigDecimal) -> String {
    format!("{} ({})", ADD_FUNDS, format_amount(shortfall))
}

pub fn parse_add_funds(summary: &str) -> Option<BigDecimal> {
    use lazy_static::lazy_static;
    lazy_static! {
        static ref ADD_FUNDS_RE: Regex =
            Regex::new(r"SYSTEM: Add funds \(([0-9]+\.[0-9]{2})\)").unwrap();
    }

    ADD_FUNDS_RE
        .captures(summary)
        .and_then(|c| c.get(1))
        .and_then(|m| BigDecimal::from_str(m.as_str()).ok())
}

pub fn simulate(
    start_balance: &BigDecimal,
    target_balance: &BigDecimal,
    transactions: &[Transaction],
    start_date: NaiveDate,
    window_days: usize,
) -> std::result::Result<SimulationResult, ValidationError> {
    let _span = span!(Level::INFO, "simulate").entered();
    let started = Instant::now();

    let dates = window_dates(start_date, window_days)?;

    let by_date: HashMap<NaiveDate, Vec<&Transaction>> =
        transactions.iter().into_group_map_by(|tx| tx.date);

    let mut running = start_balance.clone();
    let mut days = Vec::with_capacity(window_days);

    for date in dates {
        let start = running;

        let (net_change, summary) = match by_date.get(&date) {
            Some(todays) => (
                todays.iter().map(|tx| &tx.amount).sum::<BigDecimal>(),
                todays.iter().map(|tx| tx.to_fragment()).join(", "),
            ),
            None => (BigDecimal::zero(), String::new()),
        };

        let end = &start + &net_change;

        let (alert_type, shortfall, transactions_summary) = if &end < target_balance {
            let shortfall = target_balance - &end;
            let note = add_funds_note(&shortfall);

            debug!("{} below target by {}", date, format_amount(&shortfall));

            let summary = if summary.is_empty() {
                note
            } else {
                format!("{}, {}", summary, note)
            };

            (AlertType::BelowTarget, Some(shortfall), summary)
        } else {
            (AlertType::Ok, None, summary)
        };

        running = end.clone();

        days.push(DailyProjection {
            date,
            start_balance: start,
            net_change,
            end_balance: end,
            alert_type,
            shortfall,
            transactions_summary,
        });
    }

    let elapsed = Instant::now() - started;
    info!("projected {} days in {:?}", window_days, elapsed);

    Ok(SimulationResult { days })
}

fn window_dates(
    start_date: NaiveDate,
    window_days: usize,
) -> std::result::Result<Vec<NaiveDate>, ValidationError> {
    if window_days == 0 {
        return Err(ValidationError::EmptyWindow);
    }

    (0..window_days)
        .map(|offset| {
            start_date
                .checked_add_days(Days::new(offset as u64))
                .ok_or(ValidationError::DateOutOfRange {
                    start: start_date,
                    days: window_days,
                })
        })
        .collect()
}
