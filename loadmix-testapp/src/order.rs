use std::ops::Range;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::RejectBody;
use crate::{AppState, unix_millis};

const VALIDATE_MS: Range<u64> = 100..300;
const PAYMENT_MS: Range<u64> = 200..500;
const SHIPMENT_MS: Range<u64> = 100..200;
const PAYMENT_FAILURE_PCT: u8 = 10;

const PAYMENT_METHODS: [&str; 3] = ["credit_card", "paypal", "bank_transfer"];
const CARRIERS: [&str; 3] = ["USPS", "FedEx", "UPS"];

#[derive(Debug, Default, Deserialize)]
struct OrderRequest {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderReceipt {
    order_id: String,
    status: &'static str,
    amount: u64,
    payment_method: &'static str,
    carrier: &'static str,
    timestamp_ms: u64,
}

#[derive(Debug, Serialize)]
struct PaymentDeclined {
    error: &'static str,
    order_id: String,
}

/// Order pipeline simulation: validate, charge, schedule shipment, each
/// stage with its own latency band and the payment stage with a 10%
/// simulated decline.
pub(crate) async fn handle_order(State(state): State<AppState>, body: Bytes) -> Response {
    state.stats.inc_requests_total();

    let req: OrderRequest = if body.is_empty() {
        OrderRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(RejectBody {
                        error: "invalid json body",
                    }),
                )
                    .into_response();
            }
        }
    };

    let order_id = req
        .id
        .unwrap_or_else(|| format!("ORD-{:05}", state.jitter.number(1..100_000)));

    // validate
    sleep(state.jitter.delay_ms(VALIDATE_MS)).await;

    // charge
    sleep(state.jitter.delay_ms(PAYMENT_MS)).await;
    let payment_method = state.jitter.pick(&PAYMENT_METHODS);
    if state.jitter.chance(PAYMENT_FAILURE_PCT) {
        tracing::warn!(order_id = %order_id, payment_method, "payment declined");
        return (
            StatusCode::BAD_GATEWAY,
            Json(PaymentDeclined {
                error: "payment failed: insufficient funds",
                order_id,
            }),
        )
            .into_response();
    }

    // schedule shipment
    sleep(state.jitter.delay_ms(SHIPMENT_MS)).await;
    let carrier = state.jitter.pick(&CARRIERS);
    let amount = state.jitter.number(10..1001);

    tracing::info!(order_id = %order_id, amount, payment_method, carrier, "order processed");

    Json(OrderReceipt {
        order_id,
        status: "processed",
        amount,
        payment_method,
        carrier,
        timestamp_ms: unix_millis(),
    })
    .into_response()
}
