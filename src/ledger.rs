use csv::StringRecord;
use std::{io::Read, path::Path, time::Instant};
use tracing::{debug, info, span, Level};

use crate::{
    config::{open, ConfigurationError, UserDirectory},
    engine::ValidationError,
    model::*,
    parsing::{parse_amount, parse_date, parse_forecast},
};

/// Position of each known column in the header, if present.
#[derive(Debug)]
struct Columns {
    date: Option<usize>,
    amount: Option<usize>,
    description: Option<usize>,
    category: Option<usize>,
    forecast: Option<usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);

        Self {
            date: position("date"),
            amount: position("amount"),
            description: position("description"),
            category: position("category"),
            forecast: position("forecast"),
        }
    }
}

/// A ledger row exactly as stored, before any normalization. Cells past the
/// end of a short record read as empty.
#[derive(Debug)]
struct LedgerRow {
    date: String,
    amount: String,
    description: String,
    category: String,
    forecast: String,
}

impl LedgerRow {
    fn new(record: &StringRecord, columns: &Columns) -> Self {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_owned()
        };

        Self {
            date: cell(columns.date),
            amount: cell(columns.amount),
            description: cell(columns.description),
            category: cell(columns.category),
            forecast: cell(columns.forecast),
        }
    }

    fn normalize(self, row: usize) -> std::result::Result<Transaction, ValidationError> {
        let date = parse_date(&self.date).ok_or_else(|| ValidationError::MalformedDate {
            row,
            value: self.date.clone(),
        })?;

        let amount = parse_amount(&self.amount).ok_or_else(|| ValidationError::MalformedAmount {
            row,
            value: self.amount.clone(),
        })?;

        Ok(Transaction {
            date,
            amount,
            description: self.description.trim().to_owned(),
            category: self.category.trim().to_owned(),
            forecast: parse_forecast(&self.forecast),
        })
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn load(user: &UserDirectory) -> Result<Self> {
        let path = user.ledger_path();
        let file = open(&path)?;
        Self::read(&path, file)
    }

    pub fn read(path: &Path, reader: impl Read) -> Result<Self> {
        let _span = span!(Level::INFO, "ledger").entered();
        let started = Instant::now();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let csv_error = |source: csv::Error| ConfigurationError::Csv {
            path: path.to_owned(),
            source,
        };

        let columns = Columns::new(reader.headers().map_err(csv_error)?);
        debug!("{:?}", columns);

        let transactions = reader
            .records()
            .enumerate()
            .map(|(i, record)| {
                let record = record.map_err(csv_error)?;
                Ok(LedgerRow::new(&record, &columns).normalize(i + 1)?)
            })
            .collect::<Result<Vec<_>>>()?;

        let elapsed = Instant::now() - started;
        info!(
            "loaded {} transactions from {:?} in {:?}",
            transactions.len(),
            path,
            elapsed
        );

        Ok(Self::new(transactions))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Projected entries only, in ledger order.
    pub fn forecast(&self) -> Vec<Transaction> {
        let forecast = self.iter().filter(|tx| tx.forecast).cloned().collect_vec();
        debug!("{} of {} transactions are forecast", forecast.len(), self.len());
        forecast
    }
}

pub fn write_transactions<'a>(
    writer: impl std::io::Write,
    transactions: impl Iterator<Item = &'a Transaction>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for tx in transactions {
        writer.serialize(tx)?;
    }
    writer.flush()?;
    Ok(())
}
