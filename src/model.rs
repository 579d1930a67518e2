use serde::{ser::SerializeStruct, Serialize};

pub use anyhow::Result;
pub use bigdecimal::{BigDecimal, RoundingMode, Zero};
pub use chrono::NaiveDate;
pub use itertools::Itertools;

pub const SYSTEM_CATEGORY: &str = "System";

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub description: String,
    pub category: String,
    pub forecast: bool,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: BigDecimal,
        description: impl Into<String>,
        category: impl Into<String>,
        forecast: bool,
    ) -> Self {
        Self {
            date,
            amount,
            description: description.into(),
            category: category.into(),
            forecast,
        }
    }

    /// The `description: amount` fragment used in daily summaries.
    pub fn to_fragment(&self) -> String {
        format!("{}: {}", self.description, format_amount(&self.amount))
    }
}

impl Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Transaction", 5)?;
        state.serialize_field("date", &self.date.format("%Y-%m-%d").to_string())?;
        state.serialize_field("amount", &format_amount(&self.amount))?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("category", &self.category)?;
        state.serialize_field("forecast", if self.forecast { "1" } else { "0" })?;
        state.end()
    }
}

/// Renders a value rounded half-even to cents with exactly two fractional digits.
pub fn format_amount(value: &BigDecimal) -> String {
    format!("{:.2}", value.with_scale_round(2, RoundingMode::HalfEven))
}
