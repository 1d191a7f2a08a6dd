use serde::Serialize;
use tracing::{debug, info};

use super::domain::{PricedOrder, Transaction};
use super::engine::DiscountEngine;
use super::sink::{OrderSink, SinkError, TraceLog};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to persist priced order: {0}")]
    Sink(#[source] SinkError),
    #[error("failed to write discount trace: {0}")]
    Trace(#[source] SinkError),
}

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub processed: usize,
    pub discounted: usize,
    pub gross_total: f64,
    pub net_total: f64,
}

impl PipelineSummary {
    fn add(&mut self, transaction: &Transaction, order: &PricedOrder) {
        self.processed += 1;
        if order.discount > 0.0 {
            self.discounted += 1;
        }
        self.gross_total += transaction.gross_amount();
        self.net_total += order.final_price;
    }

    pub fn savings(&self) -> f64 {
        self.gross_total - self.net_total
    }
}

/// Prices transactions one at a time, handing each row to the injected sink and trace log.
pub struct DiscountPipeline {
    engine: DiscountEngine,
}

impl DiscountPipeline {
    pub fn new(engine: DiscountEngine) -> Self {
        Self { engine }
    }

    pub fn run<'a, I, S, T>(
        &self,
        transactions: I,
        sink: &mut S,
        trace: &mut T,
    ) -> Result<PipelineSummary, PipelineError>
    where
        I: IntoIterator<Item = &'a Transaction>,
        S: OrderSink + ?Sized,
        T: TraceLog + ?Sized,
    {
        let result = self.price_all(transactions, sink, trace);

        // Both handles are flushed even when a row failed part way through.
        let sink_flushed = sink.finish().map_err(PipelineError::Sink);
        let trace_flushed = trace.finish().map_err(PipelineError::Trace);

        let summary = result?;
        sink_flushed?;
        trace_flushed?;

        info!(
            processed = summary.processed,
            discounted = summary.discounted,
            net_total = summary.net_total,
            "discount batch complete"
        );
        Ok(summary)
    }

    fn price_all<'a, I, S, T>(
        &self,
        transactions: I,
        sink: &mut S,
        trace: &mut T,
    ) -> Result<PipelineSummary, PipelineError>
    where
        I: IntoIterator<Item = &'a Transaction>,
        S: OrderSink + ?Sized,
        T: TraceLog + ?Sized,
    {
        let mut summary = PipelineSummary::default();

        for transaction in transactions {
            let outcome = self.engine.evaluate(transaction);
            let order = PricedOrder::from_outcome(transaction, &outcome);
            debug!(
                product = %order.product_name,
                discount = order.discount,
                final_price = order.final_price,
                "priced transaction"
            );

            // Only persisted rows reach the trace.
            sink.insert(&order).map_err(PipelineError::Sink)?;
            trace
                .record(&order.trace_message())
                .map_err(PipelineError::Trace)?;
            summary.add(transaction, &order);
        }

        Ok(summary)
    }
}

impl Default for DiscountPipeline {
    fn default() -> Self {
        Self::new(DiscountEngine::new())
    }
}
