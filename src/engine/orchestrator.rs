use bigdecimal::Signed;
use tracing::{debug, info, span, Level};

use super::{advisor, simulate, SimulationResult, ValidationError};
use crate::model::*;

pub const SURPLUS_TRANSFER: &str = "Surplus Transfer";

/// Days after a month end whose balances bound the surplus that may leave.
pub const LOOK_AHEAD_DAYS: usize = 30;

#[derive(Debug, PartialEq, Clone)]
pub struct TransferRecommendation {
    /// Zero means nothing should be moved.
    pub amount: BigDecimal,
    /// First day of the month following the evaluated month end.
    pub effective_date: Option<NaiveDate>,
}

impl TransferRecommendation {
    pub fn none() -> Self {
        Self {
            amount: BigDecimal::zero(),
            effective_date: None,
        }
    }

    pub fn is_recommended(&self) -> bool {
        self.amount.is_positive()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Simulation {
    pub result: SimulationResult,
    pub recommendation: TransferRecommendation,
}

/// Projects the window, sizes a transfer at the first month end and, if one
/// is recommended, projects the whole window again with the transfer booked.
/// Only the first month end in the window is considered.
pub fn generate(
    start_balance: &BigDecimal,
    target_balance: &BigDecimal,
    transactions: &[Transaction],
    start_date: NaiveDate,
    window_days: usize,
) -> std::result::Result<Simulation, ValidationError> {
    let _span = span!(Level::INFO, "generate").entered();

    let initial = simulate(
        start_balance,
        target_balance,
        transactions,
        start_date,
        window_days,
    )?;

    let boundary = match initial.first_month_boundary() {
        Some(boundary) => boundary,
        None => {
            debug!("no month end within {} days", window_days);
            return Ok(Simulation {
                result: initial,
                recommendation: TransferRecommendation::none(),
            });
        }
    };

    let days = initial.days();
    let month_end = &days[boundary];
    let first_of_month = days[boundary + 1].date;
    let future_balances = days[boundary + 1..]
        .iter()
        .take(LOOK_AHEAD_DAYS)
        .map(|d| d.end_balance.clone())
        .collect_vec();

    let amount = advisor::recommend(&month_end.end_balance, target_balance, &future_balances);

    info!(
        "month end {} balance {} recommends {}",
        month_end.date,
        format_amount(&month_end.end_balance),
        format_amount(&amount)
    );

    let recommendation = TransferRecommendation {
        amount,
        effective_date: Some(first_of_month),
    };

    if !recommendation.is_recommended() {
        return Ok(Simulation {
            result: initial,
            recommendation,
        });
    }

    let transfer = surplus_transfer(first_of_month, &recommendation.amount);

    let augmented = transactions
        .iter()
        .cloned()
        .chain(std::iter::once(transfer))
        .collect_vec();

    let result = simulate(
        start_balance,
        target_balance,
        &augmented,
        start_date,
        window_days,
    )?;

    Ok(Simulation {
        result,
        recommendation,
    })
}

fn surplus_transfer(date: NaiveDate, amount: &BigDecimal) -> Transaction {
    Transaction::new(date, -amount.clone(), SURPLUS_TRANSFER, SYSTEM_CATEGORY, true)
}
