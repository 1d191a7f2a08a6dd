pub mod domain;
pub mod engine;
pub mod ingest;
pub mod pipeline;
pub mod rules;
pub mod sink;

pub use domain::{DiscountOutcome, PricedOrder, RuleContribution, Transaction};
pub use engine::{evaluate, final_price, select_discount, DiscountEngine};
pub use ingest::{
    ImportReport, IngestError, MalformedRecordPolicy, ParsePolicyError, RejectedRecord,
    TransactionImporter,
};
pub use pipeline::{DiscountPipeline, PipelineError, PipelineSummary};
pub use rules::DiscountRule;
pub use sink::{
    CsvOrderSink, FileTraceLog, InMemoryOrderSink, InMemoryTraceLog, OrderSink, SinkError,
    TraceLog,
};
