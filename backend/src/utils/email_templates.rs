use chrono::{DateTime, Utc};

use crate::models::lead_models::{AbandonBeacon, ChatEntry, LeadRecord, LeadStatus};

const NO_TRANSCRIPT: &str = "<p><em>No chat transcript was captured.</em></p>";
const DEFAULT_INTENT: &str = "General Inquiry";

/// Subject line and HTML body of one sales notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Subject tag for each status that triggers a notification.
/// Statuses that never send return `None`.
pub fn subject_tag(status: &LeadStatus) -> Option<&'static str> {
    match status {
        LeadStatus::InitialCapture => Some("[NEW LEAD]"),
        LeadStatus::Abandoned => Some("[CHAT TRANSCRIPT]"),
        LeadStatus::Updated => Some("[LEAD UPDATE]"),
        LeadStatus::Unknown(_) | LeadStatus::Missing => None,
    }
}

pub fn render_lead_email(lead: &LeadRecord, received_at: DateTime<Utc>) -> Option<RenderedEmail> {
    let tag = subject_tag(&lead.status)?;
    let who = lead.name.as_deref().unwrap_or(&lead.email);
    let intent = lead.intent.as_deref().unwrap_or(DEFAULT_INTENT);
    let subject = format!("{} {} - {}", tag, who, intent);

    let heading = match lead.status {
        LeadStatus::InitialCapture => "New lead captured",
        LeadStatus::Abandoned => "Chat ended - final transcript",
        _ => "Lead details updated",
    };

    let html = format!(
        "<h2>{heading}</h2>\
         <table>\
         <tr><td><strong>Name:</strong></td><td>{name}</td></tr>\
         <tr><td><strong>Email:</strong></td><td>{email}</td></tr>\
         <tr><td><strong>Company:</strong></td><td>{company}</td></tr>\
         <tr><td><strong>Intent:</strong></td><td>{intent}</td></tr>\
         <tr><td><strong>Received:</strong></td><td>{received}</td></tr>\
         </table>\
         <h3>Transcript</h3>\
         {transcript}",
        heading = heading,
        name = escape_html(lead.name.as_deref().unwrap_or("-")),
        email = escape_html(&lead.email),
        company = escape_html(lead.company.as_deref().unwrap_or("-")),
        intent = escape_html(intent),
        received = received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        transcript = render_transcript(lead.history.as_deref()),
    );

    Some(RenderedEmail {
        subject: strip_newlines(&subject),
        html,
    })
}

pub fn render_abandon_email(beacon: &AbandonBeacon, received_at: DateTime<Utc>) -> RenderedEmail {
    let intent = beacon
        .intent
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(DEFAULT_INTENT);
    let summary = beacon
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No summary provided.");

    let html = format!(
        "<h2>Visitor left the page</h2>\
         <p><strong>Email:</strong> {email}</p>\
         <p><strong>Intent:</strong> {intent}</p>\
         <p><strong>Left at:</strong> {left_at}</p>\
         <h3>Summary</h3>\
         <p>{summary}</p>",
        email = escape_html(&beacon.email),
        intent = escape_html(intent),
        left_at = received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary = escape_html(summary).replace('\n', "<br>"),
    );

    RenderedEmail {
        subject: strip_newlines(&format!("[ABANDONED SESSION] {} - {}", intent, beacon.email)),
        html,
    }
}

/// One `<p>` per message, `User:` for the visitor and `Edge:` for the assistant.
pub fn render_transcript(history: Option<&[ChatEntry]>) -> String {
    match history {
        Some(entries) if !entries.is_empty() => entries
            .iter()
            .map(|entry| {
                let speaker = if entry.is_visitor() { "User" } else { "Edge" };
                format!(
                    "<p><strong>{}:</strong> {}</p>",
                    speaker,
                    escape_html(&entry.text)
                )
            })
            .collect(),
        _ => NO_TRANSCRIPT.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// header injection guard
fn strip_newlines(subject: &str) -> String {
    subject.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn lead(status: LeadStatus, history: Option<Vec<ChatEntry>>) -> LeadRecord {
        LeadRecord {
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            company: Some("Analytical Engines".into()),
            intent: Some("GPU colocation".into()),
            status,
            history,
        }
    }

    fn entry(role: &str, text: &str) -> ChatEntry {
        ChatEntry { role: role.into(), text: text.into() }
    }

    #[test]
    fn transcript_lines_are_prefixed_and_ordered() {
        let html = render_transcript(Some(&[entry("user", "Hi"), entry("assistant", "Hello")]));
        let user = html.find("<strong>User:</strong> Hi").unwrap();
        let edge = html.find("<strong>Edge:</strong> Hello").unwrap();
        assert!(user < edge);
    }

    #[test]
    fn missing_transcript_uses_placeholder() {
        assert_eq!(render_transcript(None), NO_TRANSCRIPT);
        assert_eq!(render_transcript(Some(&[])), NO_TRANSCRIPT);
    }

    #[test]
    fn subjects_are_tagged_by_status() {
        let cases = [
            (LeadStatus::InitialCapture, "[NEW LEAD] Ada - GPU colocation"),
            (LeadStatus::Abandoned, "[CHAT TRANSCRIPT] Ada - GPU colocation"),
            (LeadStatus::Updated, "[LEAD UPDATE] Ada - GPU colocation"),
        ];
        for (status, expected) in cases {
            let email = render_lead_email(&lead(status, None), received()).unwrap();
            assert_eq!(email.subject, expected);
        }
    }

    #[test]
    fn silent_statuses_render_nothing() {
        assert!(render_lead_email(&lead(LeadStatus::Missing, None), received()).is_none());
        assert!(render_lead_email(&lead(LeadStatus::Unknown("draft".into()), None), received()).is_none());
    }

    #[test]
    fn lead_body_embeds_fields_and_transcript() {
        let email = render_lead_email(
            &lead(LeadStatus::Abandoned, Some(vec![entry("user", "Need 2MW")])),
            received(),
        )
        .unwrap();
        assert!(email.html.contains("Analytical Engines"));
        assert!(email.html.contains("ada@example.com"));
        assert!(email.html.contains("2026-03-14 09:26:53 UTC"));
        assert!(email.html.contains("<strong>User:</strong> Need 2MW"));
    }

    #[test]
    fn lead_supplied_text_is_escaped() {
        let mut record = lead(LeadStatus::Updated, Some(vec![entry("user", "<script>x</script>")]));
        record.company = Some("A & B".into());
        let email = render_lead_email(&record, received()).unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("A &amp; B"));
    }

    #[test]
    fn subject_falls_back_to_email_and_default_intent() {
        let mut record = lead(LeadStatus::InitialCapture, None);
        record.name = None;
        record.intent = None;
        let email = render_lead_email(&record, received()).unwrap();
        assert_eq!(email.subject, "[NEW LEAD] ada@example.com - General Inquiry");
    }

    #[test]
    fn abandon_email_carries_summary() {
        let beacon = AbandonBeacon {
            email: "ada@example.com".into(),
            intent: Some("Bare metal\r\nBcc: x@y.z".into()),
            summary: Some("Asked about pricing\nthen left".into()),
        };
        let email = render_abandon_email(&beacon, received());
        assert!(!email.subject.contains('\n'));
        assert!(email.subject.starts_with("[ABANDONED SESSION] Bare metal"));
        assert!(email.html.contains("Asked about pricing<br>then left"));
    }
}
