//! Payment gateway webhook

use api_types::payment::{WebhookAck, WebhookEvent};
use axum::{Json, extract::State};
use chrono::Utc;
use engine::{EngineError, MarkerStatus, ReconcileCmd};

use crate::{ServerError, mapping, server::ServerState};

const CHARGE_SUCCESS: &str = "charge.success";

/// Reconciles the reference of a successful charge.
///
/// The body is not trusted: the reference is verified again with the
/// gateway. An unmatched reference is acknowledged so the gateway stops
/// retrying; it is parked for manual reconciliation.
pub async fn gateway(
    State(state): State<ServerState>,
    Json(payload): Json<WebhookEvent>,
) -> Result<Json<WebhookAck>, ServerError> {
    if payload.event != CHARGE_SUCCESS {
        tracing::debug!(event = %payload.event, "ignoring gateway event");
        return Ok(Json(WebhookAck {
            received: true,
            status: None,
        }));
    }

    match state
        .engine
        .reconcile(ReconcileCmd::new(payload.data.reference, Utc::now()))
        .await
    {
        Ok(outcome) => Ok(Json(WebhookAck {
            received: true,
            status: Some(mapping::marker_status(outcome.status)),
        })),
        Err(EngineError::NoMatchingPendingTransaction(_)) => Ok(Json(WebhookAck {
            received: true,
            status: Some(mapping::marker_status(MarkerStatus::Unmatched)),
        })),
        Err(err) => Err(err.into()),
    }
}
