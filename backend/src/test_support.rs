use axum::{http::StatusCode, response::Response};
use http_body_util::BodyExt;
use std::sync::Arc;

use crate::AppState;
use crate::api::mailer::Mailer;
use crate::config::Config;
use crate::models::lead_models::{ChatEntry, LeadRecord, LeadStatus};
use crate::utils::lead_dedup::LeadDedup;

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "LEAD_NOTIFY_TO" => Some("sales@edge.local".to_string()),
        "STATIC_DIR" => Some("public".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn lead_state(mailer: impl Mailer + 'static) -> Arc<AppState> {
    let config = test_config();
    Arc::new(AppState {
        lead_dedup: LeadDedup::new(config.lead_notify.dedup_ttl),
        mailer: Arc::new(mailer),
        config,
    })
}

pub fn sample_lead(status: LeadStatus) -> LeadRecord {
    LeadRecord {
        email: "ada@example.com".into(),
        name: Some("Ada".into()),
        company: Some("Analytical Engines".into()),
        intent: Some("GPU colocation".into()),
        status,
        history: Some(vec![
            ChatEntry { role: "user".into(), text: "Hi".into() },
            ChatEntry { role: "assistant".into(), text: "Hello".into() },
        ]),
    }
}

pub async fn read_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}
