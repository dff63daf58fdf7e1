use serde::Deserialize;
use serde_json::Value;

use crate::error::LeadError;

/// Which pulse of the lead-capture flow a save-lead request represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadStatus {
    InitialCapture,
    Abandoned,
    Updated,
    Unknown(String),
    Missing,
}

impl LeadStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("INITIAL_CAPTURE") => LeadStatus::InitialCapture,
            Some("ABANDONED") => LeadStatus::Abandoned,
            Some("updated") => LeadStatus::Updated,
            Some(other) => LeadStatus::Unknown(other.to_string()),
            None => LeadStatus::Missing,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::InitialCapture => "INITIAL_CAPTURE",
            LeadStatus::Abandoned => "ABANDONED",
            LeadStatus::Updated => "updated",
            LeadStatus::Unknown(other) => other,
            LeadStatus::Missing => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: String,
    pub text: String,
}

impl ChatEntry {
    pub fn is_visitor(&self) -> bool {
        self.role == "user"
    }
}

/// A lead as received by the save-lead endpoint. Lives for one request only.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub intent: Option<String>,
    pub status: LeadStatus,
    pub history: Option<Vec<ChatEntry>>, // None when the client sent no array
}

impl LeadRecord {
    /// Parses a save-lead body.
    ///
    /// Only two things are fatal: bytes that are not JSON, and a missing or
    /// empty `user_email`. Optional fields with the wrong type are treated as
    /// absent, and a `history` that is not an array falls back to `None`.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, LeadError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| LeadError::InvalidBody(e.to_string()))?;

        let email = string_field(&value, "user_email")
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or(LeadError::MissingEmail)?;

        Ok(LeadRecord {
            email,
            name: non_empty(string_field(&value, "user_name")),
            company: non_empty(string_field(&value, "company")),
            intent: non_empty(string_field(&value, "lead_intent")),
            status: LeadStatus::parse(string_field(&value, "status")),
            history: value.get("history").and_then(parse_history),
        })
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_history(raw: &Value) -> Option<Vec<ChatEntry>> {
    let items = raw.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                Some(ChatEntry {
                    role: obj.get("role").and_then(Value::as_str).unwrap_or_default().to_string(),
                    text: obj.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
                })
            })
            .collect(),
    )
}

/// Payload of the page-unload beacon.
#[derive(Debug, Clone, Deserialize)]
pub struct AbandonBeacon {
    #[serde(rename = "user_email")]
    pub email: String,
    #[serde(rename = "lead_intent", default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl AbandonBeacon {
    /// Beacons usually arrive as `text/plain`, so the content type is ignored
    /// and the raw bytes are decoded as JSON.
    pub fn from_raw(body: &[u8]) -> Result<Self, LeadError> {
        let beacon: AbandonBeacon = serde_json::from_slice(body)
            .map_err(|e| LeadError::InvalidBody(e.to_string()))?;
        let email = beacon.email.trim();
        if email.is_empty() {
            return Err(LeadError::MissingEmail);
        }
        if !email.contains('@') {
            return Err(LeadError::InvalidBody(format!(
                "user_email is not an address: {}",
                email
            )));
        }
        Ok(AbandonBeacon {
            email: email.to_string(),
            ..beacon
        })
    }
}
