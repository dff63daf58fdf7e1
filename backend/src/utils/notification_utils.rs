use chrono::Utc;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing;

use crate::AppState;
use crate::api::mailer::{Mailer, OutboundEmail};
use crate::error::MailError;
use crate::models::lead_models::{AbandonBeacon, LeadRecord, LeadStatus};
use crate::utils::email_templates::{self, RenderedEmail};

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 60_000;

/// What the save-lead flow did with a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    DeliveryFailed, // provider error, already logged
    SuppressedDuplicate,
    NotRequired,
}

/// Sends an email, retrying with exponential backoff.
///
/// `max_attempts` of 1 means exactly one try. Delays are 500ms, 1000ms,
/// 2000ms and so on between attempts.
///
/// # Arguments
/// * `mailer` - The configured email provider
/// * `email` - The message to deliver
/// * `max_attempts` - Upper bound on provider calls
///
/// # Returns
/// * `Ok(())` once any attempt succeeds
/// * `Err(MailError)` - The last provider error if all attempts fail
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    email: &OutboundEmail,
    max_attempts: u32,
) -> Result<(), MailError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match mailer.send(email).await {
            Ok(()) => {
                if attempt > 0 {
                    tracing::info!(
                        "Sent \"{}\" via {} after {} retries",
                        email.subject,
                        mailer.backend(),
                        attempt
                    );
                }
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to send \"{}\" via {} (attempt {}/{}): {}",
                    email.subject,
                    mailer.backend(),
                    attempt + 1,
                    max_attempts,
                    e
                );
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(e);
                }
                sleep(backoff_delay(attempt)).await;
            }
        }
    }
}

/// Delay before retry number `retry` (1-based): 500ms, 1000ms, 2000ms...
/// capped at one minute.
fn backoff_delay(retry: u32) -> Duration {
    let factor = 2_u64.saturating_pow(retry.saturating_sub(1));
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
}

/// Delivers a rendered notification to the sales mailbox.
///
/// Never fails: provider errors are logged and reported to Sentry, then
/// swallowed. The return value only says whether the email went out.
pub async fn notify_sales(state: &Arc<AppState>, rendered: RenderedEmail) -> bool {
    let email = OutboundEmail {
        from: state.config.lead_notify.from.clone(),
        to: state.config.lead_notify.to.clone(),
        subject: rendered.subject,
        html: rendered.html,
    };

    match send_with_retry(state.mailer.as_ref(), &email, state.config.lead_notify.max_attempts).await {
        Ok(()) => {
            tracing::info!("Sales notification sent: {}", email.subject);
            true
        }
        Err(e) => {
            tracing::error!("Failed to send sales notification \"{}\": {}", email.subject, e);
            sentry::capture_message(
                &format!("Lead notification \"{}\" was lost: {}", email.subject, e),
                sentry::Level::Error,
            );
            false
        }
    }
}

/// Applies the per-status send policy for a save-lead request.
///
/// * `INITIAL_CAPTURE` sends once per lead inside the dedup window
/// * `ABANDONED` and `updated` always send
/// * anything else sends nothing
pub async fn notify_for_lead(state: &Arc<AppState>, lead: &LeadRecord) -> NotifyOutcome {
    if lead.status == LeadStatus::InitialCapture && !state.lead_dedup.try_claim(&lead.email) {
        tracing::debug!("Initial capture for {} already notified, skipping", lead.email);
        return NotifyOutcome::SuppressedDuplicate;
    }

    let Some(rendered) = email_templates::render_lead_email(lead, Utc::now()) else {
        tracing::debug!(
            "No notification for status {} from {}",
            lead.status.as_str(),
            lead.email
        );
        return NotifyOutcome::NotRequired;
    };

    if notify_sales(state, rendered).await {
        NotifyOutcome::Sent
    } else {
        NotifyOutcome::DeliveryFailed
    }
}

pub async fn notify_abandoned_session(state: &Arc<AppState>, beacon: &AbandonBeacon) -> bool {
    let rendered = email_templates::render_abandon_email(beacon, Utc::now());
    notify_sales(state, rendered).await
}
