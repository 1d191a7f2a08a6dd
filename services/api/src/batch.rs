use crate::infra::{parse_date, parse_policy};
use chrono::NaiveDate;
use clap::Args;
use retail_discounts::config::AppConfig;
use retail_discounts::error::AppError;
use retail_discounts::pricing::{
    CsvOrderSink, DiscountEngine, DiscountOutcome, DiscountPipeline, FileTraceLog, ImportReport,
    MalformedRecordPolicy, PipelineSummary, Transaction, TransactionImporter,
};
use retail_discounts::telemetry;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Transactions CSV (defaults to DISCOUNT_INPUT_CSV)
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Priced orders CSV, appended to when it exists (defaults to DISCOUNT_OUTPUT_CSV)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Append-only discount trace log (defaults to DISCOUNT_TRACE_LOG)
    #[arg(long)]
    pub(crate) trace_log: Option<PathBuf>,
    /// What to do with malformed rows: skip or abort
    #[arg(long, value_parser = parse_policy)]
    pub(crate) on_malformed: Option<MalformedRecordPolicy>,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Purchase date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) occurred_on: NaiveDate,
    /// Product expiry date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) expiry_date: NaiveDate,
    #[arg(long)]
    pub(crate) product: String,
    #[arg(long)]
    pub(crate) quantity: u32,
    #[arg(long)]
    pub(crate) unit_price: f64,
    /// Purchase was made through the mobile app
    #[arg(long)]
    pub(crate) via_app: bool,
    #[arg(long, default_value = "Cash")]
    pub(crate) payment_method: String,
}

impl From<QuoteArgs> for Transaction {
    fn from(args: QuoteArgs) -> Self {
        Transaction {
            occurred_on: args.occurred_on,
            product_name: args.product,
            expiry_date: args.expiry_date,
            quantity: args.quantity,
            unit_price: args.unit_price,
            via_app: args.via_app,
            payment_method: args.payment_method,
        }
    }
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mut batch = config.batch;
    if let Some(input) = args.input {
        batch.input_csv = input;
    }
    if let Some(output) = args.output {
        batch.output_csv = output;
    }
    if let Some(trace_log) = args.trace_log {
        batch.trace_log = trace_log;
    }
    if let Some(policy) = args.on_malformed {
        batch.on_malformed = policy;
    }

    let report = TransactionImporter::new(batch.on_malformed).from_path(&batch.input_csv)?;
    info!(
        input = %batch.input_csv.display(),
        accepted = report.transactions.len(),
        rejected = report.rejected.len(),
        "transactions imported"
    );

    ensure_parent(&batch.output_csv)?;
    ensure_parent(&batch.trace_log)?;
    let mut sink = CsvOrderSink::open(&batch.output_csv)?;
    let mut trace = FileTraceLog::open(&batch.trace_log)?;

    let summary = DiscountPipeline::default().run(&report.transactions, &mut sink, &mut trace)?;
    render_batch_summary(&report, &summary, &batch.output_csv);

    Ok(())
}

pub(crate) fn run_quote(args: QuoteArgs) {
    let transaction = Transaction::from(args);
    let outcome = DiscountEngine::new().evaluate(&transaction);
    render_quote(&transaction, &outcome);
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn render_batch_summary(report: &ImportReport, summary: &PipelineSummary, output: &Path) {
    println!("Discount batch");
    println!(
        "- {} transactions priced, {} discounted",
        summary.processed, summary.discounted
    );
    println!(
        "- gross {:.2} | net {:.2} | savings {:.2}",
        summary.gross_total,
        summary.net_total,
        summary.savings()
    );
    println!("- orders written to {}", output.display());

    if report.rejected.is_empty() {
        println!("\nRejected rows: none");
    } else {
        println!("\nRejected rows");
        for rejected in &report.rejected {
            println!("- line {}: {}", rejected.line, rejected.reason);
        }
    }
}

fn render_quote(transaction: &Transaction, outcome: &DiscountOutcome) {
    println!(
        "{} x{} @ {:.2} on {}",
        transaction.product_name,
        transaction.quantity,
        transaction.unit_price,
        transaction.occurred_on
    );

    println!("\nRule contributions");
    for line in contribution_lines(outcome) {
        println!("{line}");
    }

    println!(
        "\nDiscount {}% | final price {:.2}",
        outcome.discount_percent, outcome.final_price
    );
}

/// Selected rules are marked with `*`.
fn contribution_lines(outcome: &DiscountOutcome) -> Vec<String> {
    let selected = outcome.selected_rules();
    outcome
        .components
        .iter()
        .map(|component| {
            let marker = if selected.contains(&component.rule) {
                " *"
            } else {
                ""
            };
            format!(
                "- {}: {}%{}",
                component.rule.label(),
                component.percent,
                marker
            )
        })
        .collect()
}
