use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use super::domain::Transaction;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read transactions: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid transaction CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed transaction on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

/// What the importer does when a row cannot be turned into a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecordPolicy {
    /// Record the row in [`ImportReport::rejected`] and continue.
    #[default]
    Skip,
    /// Stop at the first malformed row with [`IngestError::InvalidRecord`].
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown malformed record policy '{0}' (expected 'skip' or 'abort')")]
pub struct ParsePolicyError(pub String);

impl FromStr for MalformedRecordPolicy {
    type Err = ParsePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

impl fmt::Display for MalformedRecordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRecordPolicy::Skip => write!(f, "skip"),
            MalformedRecordPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// A row the importer refused, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRecord>,
}

pub struct TransactionImporter {
    policy: MalformedRecordPolicy,
}

impl TransactionImporter {
    pub fn new(policy: MalformedRecordPolicy) -> Self {
        Self { policy }
    }

    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<ImportReport, IngestError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file)
    }

    pub fn from_reader<R: Read>(&self, reader: R) -> Result<ImportReport, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: csv::StringRecord = csv_reader
            .headers()?
            .iter()
            .map(normalize_header)
            .collect();
        if !headers.iter().any(|name| name == "viaapp" || name == "channel") {
            return Err(IngestError::InvalidRecord {
                line: 1,
                reason: "header has neither a viaApp nor a channel column".to_string(),
            });
        }
        csv_reader.set_headers(headers.clone());

        let mut report = ImportReport::default();
        for result in csv_reader.records() {
            let parsed = match result {
                Ok(record) => {
                    let line = record.position().map(|pos| pos.line()).unwrap_or_default();
                    parse_record(&record, &headers)
                        .map_err(|reason| RejectedRecord { line, reason })
                }
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => Err(RejectedRecord {
                    line: err.position().map(|pos| pos.line()).unwrap_or_default(),
                    reason: err.to_string(),
                }),
            };

            match parsed {
                Ok(transaction) => report.transactions.push(transaction),
                Err(rejected) => match self.policy {
                    MalformedRecordPolicy::Abort => {
                        return Err(IngestError::InvalidRecord {
                            line: rejected.line,
                            reason: rejected.reason,
                        })
                    }
                    MalformedRecordPolicy::Skip => {
                        warn!(
                            line = rejected.line,
                            reason = %rejected.reason,
                            "skipping malformed transaction"
                        );
                        report.rejected.push(rejected);
                    }
                },
            }
        }

        Ok(report)
    }
}

impl Default for TransactionImporter {
    fn default() -> Self {
        Self::new(MalformedRecordPolicy::default())
    }
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(rename = "timestamp")]
    timestamp: String,
    #[serde(rename = "productname")]
    product_name: String,
    #[serde(rename = "expirydate")]
    expiry_date: String,
    #[serde(rename = "quantity")]
    quantity: String,
    #[serde(rename = "unitprice")]
    unit_price: String,
    #[serde(rename = "viaapp", default)]
    via_app: Option<String>,
    #[serde(rename = "channel", default)]
    channel: Option<String>,
    #[serde(rename = "paymentmethod")]
    payment_method: String,
}

fn parse_record(
    record: &csv::StringRecord,
    headers: &csv::StringRecord,
) -> Result<Transaction, String> {
    let row: TransactionRow = record
        .deserialize(Some(headers))
        .map_err(|err| err.to_string())?;

    let occurred_on = parse_timestamp(&row.timestamp)
        .ok_or_else(|| format!("timestamp '{}' is not a date or RFC 3339 time", row.timestamp))?;
    let expiry_date = parse_date(&row.expiry_date)
        .ok_or_else(|| format!("expiry date '{}' is not YYYY-MM-DD", row.expiry_date))?;

    let product_name = row.product_name.trim().to_string();
    if product_name.is_empty() {
        return Err("product name is empty".to_string());
    }

    let quantity = row
        .quantity
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("quantity '{}' is not a non-negative integer", row.quantity))?;
    let unit_price = row
        .unit_price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| format!("unit price '{}' is not a number", row.unit_price))?;

    let via_app = is_flag_set(row.via_app.as_deref(), "true")
        || is_flag_set(row.channel.as_deref(), "app");

    Ok(Transaction {
        occurred_on,
        product_name,
        expiry_date,
        quantity,
        unit_price,
        via_app,
        payment_method: row.payment_method.trim().to_string(),
    })
}

fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\u{feff}' | '\u{200b}' | '_' | ' ' | '-'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_flag_set(value: Option<&str>, expected: &str) -> bool {
    value
        .map(|raw| raw.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    parse_date(trimmed)
}
