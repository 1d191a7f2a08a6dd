use crate::infra::{deserialize_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use retail_discounts::error::AppError;
use retail_discounts::pricing::{
    DiscountEngine, DiscountPipeline, DiscountRule, InMemoryOrderSink, InMemoryTraceLog,
    MalformedRecordPolicy, PipelineSummary, PricedOrder, RejectedRecord, Transaction,
    TransactionImporter,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) occurred_on: NaiveDate,
    pub(crate) product_name: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) expiry_date: NaiveDate,
    pub(crate) quantity: u32,
    pub(crate) unit_price: f64,
    #[serde(default)]
    pub(crate) via_app: bool,
    #[serde(default)]
    pub(crate) payment_method: String,
}

impl From<QuoteRequest> for Transaction {
    fn from(request: QuoteRequest) -> Self {
        Transaction {
            occurred_on: request.occurred_on,
            product_name: request.product_name,
            expiry_date: request.expiry_date,
            quantity: request.quantity,
            unit_price: request.unit_price,
            via_app: request.via_app,
            payment_method: request.payment_method,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ComponentView {
    pub(crate) rule: DiscountRule,
    pub(crate) label: &'static str,
    pub(crate) percent: f64,
    pub(crate) selected: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuoteResponse {
    pub(crate) discount_percent: f64,
    pub(crate) final_price: f64,
    pub(crate) components: Vec<ComponentView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) on_malformed: MalformedRecordPolicy,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchResponse {
    pub(crate) summary: PipelineSummary,
    pub(crate) orders: Vec<PricedOrder>,
    pub(crate) rejected: Vec<RejectedRecord>,
    pub(crate) trace: Vec<String>,
}

pub(crate) fn discount_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/discounts/quote", post(quote_endpoint))
        .route("/api/v1/discounts/batch", post(batch_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn quote_endpoint(Json(payload): Json<QuoteRequest>) -> Json<QuoteResponse> {
    let transaction = Transaction::from(payload);
    let outcome = DiscountEngine::new().evaluate(&transaction);
    let selected = outcome.selected_rules();

    let components = outcome
        .components
        .iter()
        .map(|component| ComponentView {
            rule: component.rule,
            label: component.rule.label(),
            percent: component.percent,
            selected: selected.contains(&component.rule),
        })
        .collect();

    Json(QuoteResponse {
        discount_percent: outcome.discount_percent,
        final_price: outcome.final_price,
        components,
    })
}

pub(crate) async fn batch_endpoint(
    Json(payload): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let BatchRequest { csv, on_malformed } = payload;

    let reader = Cursor::new(csv.into_bytes());
    let report = TransactionImporter::new(on_malformed).from_reader(reader)?;

    let mut sink = InMemoryOrderSink::default();
    let mut trace = InMemoryTraceLog::default();
    let summary = DiscountPipeline::default().run(&report.transactions, &mut sink, &mut trace)?;

    Ok(Json(BatchResponse {
        summary,
        orders: sink.into_orders(),
        rejected: report.rejected,
        trace: trace.lines().to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    const CSV_HEADER: &str =
        "timestamp,product_name,expiry_date,quantity,unit_price,channel,payment_method\n";

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn scenario_request() -> QuoteRequest {
        QuoteRequest {
            occurred_on: NaiveDate::from_ymd_opt(2025, 3, 23).expect("valid date"),
            product_name: "Cheddar Cheese".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
            quantity: 8,
            unit_price: 50.0,
            via_app: true,
            payment_method: "visa".to_string(),
        }
    }

    #[tokio::test]
    async fn quote_endpoint_marks_selected_rules() {
        let Json(body) = quote_endpoint(Json(scenario_request())).await;

        assert_eq!(body.discount_percent, 35.5);
        assert!((body.final_price - 258.0).abs() < 1e-9);
        let selected: Vec<DiscountRule> = body
            .components
            .iter()
            .filter(|component| component.selected)
            .map(|component| component.rule)
            .collect();
        assert_eq!(selected, vec![DiscountRule::Expiry, DiscountRule::SpecialDate]);
    }

    #[tokio::test]
    async fn batch_endpoint_skips_malformed_rows_by_default() {
        let request = BatchRequest {
            csv: format!(
                "{CSV_HEADER}2023-01-23T11:39:00Z,Wine - Red,2023-02-01,7,6.5,Store,Cash\n\
2023-01-23T11:40:00Z,Wine - Red,2023-02-01,7,,Store,Cash\n"
            ),
            on_malformed: MalformedRecordPolicy::default(),
        };

        let Json(body) = batch_endpoint(Json(request)).await.expect("batch runs");

        assert_eq!(body.summary.processed, 1);
        assert_eq!(body.orders[0].discount, 13.0);
        assert_eq!(body.rejected.len(), 1);
        assert_eq!(body.rejected[0].line, 3);
        assert_eq!(body.trace, vec!["Discount 13% applied to Wine - Red".to_string()]);
    }

    #[tokio::test]
    async fn batch_endpoint_aborts_with_bad_request() {
        let request = BatchRequest {
            csv: format!("{CSV_HEADER}2023-01-23T11:39:00Z,Wine - Red,never,7,6.5,Store,Cash\n"),
            on_malformed: MalformedRecordPolicy::Abort,
        };

        let err = batch_endpoint(Json(request))
            .await
            .expect_err("malformed row aborts");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn router_serves_health_and_readiness() {
        let app = discount_routes().layer(Extension(app_state(false)));

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health responds");
        assert_eq!(health.status(), StatusCode::OK);

        let ready = app
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("ready responds");
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn router_accepts_quote_json() {
        let app = discount_routes().layer(Extension(app_state(true)));
        let body = json!({
            "occurred_on": "2023-06-01",
            "product_name": "Bread",
            "expiry_date": "2023-09-01",
            "quantity": 2,
            "unit_price": 3.25
        });

        let response = app
            .oneshot(
                Request::post("/api/v1/discounts/quote")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("quote responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
