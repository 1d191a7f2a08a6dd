use chrono::{Local, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::domain::PricedOrder;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode order row: {0}")]
    Csv(#[from] csv::Error),
}

/// Persistence seam for priced orders, one row per transaction.
pub trait OrderSink {
    fn insert(&mut self, order: &PricedOrder) -> Result<(), SinkError>;

    /// Flushes buffered rows; called once the batch is done, successful or not.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Append-only seam for the human-readable discount trace.
pub trait TraceLog {
    fn record(&mut self, message: &str) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes orders as a CSV table with the persistence column names.
pub struct CsvOrderSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvOrderSink<File> {
    /// Opens `path` for appending; the header row is written only when the file is new or empty.
    /// A missing trailing newline on existing content is repaired before new rows go in.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        let writer = csv::WriterBuilder::new()
            .has_headers(len == 0)
            .from_writer(file);
        Ok(Self { writer })
    }
}

impl<W: Write> CsvOrderSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }
}

impl<W: Write> OrderSink for CsvOrderSink<W> {
    fn insert(&mut self, order: &PricedOrder) -> Result<(), SinkError> {
        self.writer.serialize(order)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryOrderSink {
    orders: Vec<PricedOrder>,
}

impl InMemoryOrderSink {
    pub fn orders(&self) -> &[PricedOrder] {
        &self.orders
    }

    pub fn into_orders(self) -> Vec<PricedOrder> {
        self.orders
    }
}

impl OrderSink for InMemoryOrderSink {
    fn insert(&mut self, order: &PricedOrder) -> Result<(), SinkError> {
        self.orders.push(order.clone());
        Ok(())
    }
}

pub fn format_trace_line(at: NaiveDateTime, message: &str) -> String {
    format!("{} INFO {}", at.format("%Y-%m-%d %H:%M:%S"), message)
}

/// Timestamped trace lines appended to a writer, usually a log file.
pub struct FileTraceLog<W: Write> {
    writer: BufWriter<W>,
}

impl FileTraceLog<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> FileTraceLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }
}

impl<W: Write> TraceLog for FileTraceLog<W> {
    fn record(&mut self, message: &str) -> Result<(), SinkError> {
        let line = format_trace_line(Local::now().naive_local(), message);
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTraceLog {
    lines: Vec<String>,
}

impl InMemoryTraceLog {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl TraceLog for InMemoryTraceLog {
    fn record(&mut self, message: &str) -> Result<(), SinkError> {
        self.lines.push(message.to_string());
        Ok(())
    }
}
