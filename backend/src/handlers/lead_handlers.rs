use std::sync::Arc;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
};
use serde_json::json;

use crate::{
    AppState,
    error::LeadError,
    models::lead_models::{AbandonBeacon, LeadRecord, LeadStatus},
    utils::notification_utils,
};

/// Page-unload beacon. The visitor is usually gone by the time this runs,
/// so the email goes out on a detached task and delivery problems only
/// reach the logs.
pub async fn abandon_beacon(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let beacon = match AbandonBeacon::from_raw(&body) {
        Ok(beacon) => beacon,
        Err(e) => {
            tracing::error!("Rejected abandon beacon ({} bytes): {}", body.len(), e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error"})),
            );
        }
    };

    tracing::info!("Abandon beacon received for {}", beacon.email);
    tokio::spawn(async move {
        notification_utils::notify_abandoned_session(&state, &beacon).await;
    });

    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub async fn save_lead(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, LeadError> {
    let lead = LeadRecord::from_json_bytes(&body).map_err(|e| {
        tracing::warn!("Rejected save-lead request: {}", e);
        e
    })?;
    tracing::info!("Lead {} received with status {}", lead.email, lead.status.as_str());

    let message = match lead.status {
        LeadStatus::InitialCapture => "Lead captured",
        LeadStatus::Abandoned => "Transcript saved",
        LeadStatus::Updated => "Lead updated",
        LeadStatus::Unknown(_) | LeadStatus::Missing => "Lead received",
    };

    // Detached so a client disconnect can't cancel the send halfway.
    let task_state = state.clone();
    let task_lead = lead.clone();
    let outcome = tokio::spawn(async move {
        notification_utils::notify_for_lead(&task_state, &task_lead).await
    })
    .await
    .map_err(|e| {
        tracing::error!("Notification task for {} failed: {}", lead.email, e);
        LeadError::Internal(e.to_string())
    })?;
    tracing::debug!("Lead {} notification outcome: {:?}", lead.email, outcome);

    Ok(Json(json!({
        "status": "success",
        "message": message
    })))
}
