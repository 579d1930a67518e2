use bigdecimal::Signed;
use tracing::debug;

use crate::model::*;

/// How much of a month-end surplus can leave the account while still holding
/// back enough to cover the deepest dip below target in `future_balances`.
pub fn recommend(
    month_end_balance: &BigDecimal,
    target_balance: &BigDecimal,
    future_balances: &[BigDecimal],
) -> BigDecimal {
    let surplus = month_end_balance - target_balance;
    if !surplus.is_positive() {
        return BigDecimal::zero();
    }

    let holdback = match future_balances.iter().min() {
        Some(lowest) => non_negative(target_balance - lowest),
        None => BigDecimal::zero(),
    };

    debug!(
        "surplus {} holdback {}",
        format_amount(&surplus),
        format_amount(&holdback)
    );

    non_negative(surplus - holdback)
}

fn non_negative(value: BigDecimal) -> BigDecimal {
    if value.is_negative() {
        BigDecimal::zero()
    } else {
        value
    }
}
