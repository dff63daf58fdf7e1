use anyhow::{Context, Result, bail};
use std::time::Duration;

pub const MAX_EMAIL_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBackend {
    Resend { api_key: String },
    Smtp(SmtpSettings),
    LogOnly,
}

#[derive(Debug, Clone)]
pub struct LeadNotifyConfig {
    pub from: String,
    pub to: Vec<String>,
    pub dedup_ttl: Duration,
    pub max_attempts: u32, // 1 means a single attempt, no retry
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub frontend_url: String,
    pub static_dir: String,
    pub sentry_dsn: Option<String>,
    pub mail_backend: MailBackend,
    pub lead_notify: LeadNotifyConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "production".to_string());
        let port = match environment.as_str() {
            "staging" => 3100,
            _ => parse_or("PORT", get("PORT"), 3000u16)?,
        };

        let to: Vec<String> = get("LEAD_NOTIFY_TO")
            .context("LEAD_NOTIFY_TO must be set")?
            .split(',')
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();
        if to.is_empty() {
            bail!("LEAD_NOTIFY_TO must contain at least one address");
        }

        let max_attempts = parse_or("LEAD_EMAIL_MAX_ATTEMPTS", get("LEAD_EMAIL_MAX_ATTEMPTS"), 1u32)?;
        if !(1..=MAX_EMAIL_ATTEMPTS).contains(&max_attempts) {
            bail!("LEAD_EMAIL_MAX_ATTEMPTS must be between 1 and {}", MAX_EMAIL_ATTEMPTS);
        }

        let mail_backend = if let Some(api_key) = get("RESEND_API_KEY") {
            MailBackend::Resend { api_key }
        } else if let Some(host) = get("SMTP_HOST") {
            MailBackend::Smtp(SmtpSettings {
                host,
                port: parse_or("SMTP_PORT", get("SMTP_PORT"), 587u16)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
            })
        } else {
            MailBackend::LogOnly
        };

        Ok(Config {
            environment,
            port,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "public".to_string()),
            sentry_dsn: get("SENTRY_DSN"),
            mail_backend,
            lead_notify: LeadNotifyConfig {
                from: get("LEAD_FROM_ADDRESS")
                    .unwrap_or_else(|| "Edge Leads <leads@edge.local>".to_string()),
                to,
                dedup_ttl: Duration::from_secs(parse_or(
                    "LEAD_DEDUP_TTL_SECS",
                    get("LEAD_DEDUP_TTL_SECS"),
                    86_400u64,
                )?),
                max_attempts,
            },
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_recipients() {
        let config = config_from(&[("LEAD_NOTIFY_TO", "sales@edge.local")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.mail_backend, MailBackend::LogOnly);
        assert_eq!(config.lead_notify.to, vec!["sales@edge.local".to_string()]);
        assert_eq!(config.lead_notify.dedup_ttl, Duration::from_secs(86_400));
        assert_eq!(config.lead_notify.max_attempts, 1);
        assert_eq!(config.static_dir, "public");
        assert!(!config.is_development());
    }

    #[test]
    fn recipients_are_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("LEAD_NOTIFY_TO", " , ")]).is_err());
    }

    #[test]
    fn recipients_split_on_commas() {
        let config = config_from(&[("LEAD_NOTIFY_TO", "a@edge.local, b@edge.local,")]).unwrap();
        assert_eq!(config.lead_notify.to, vec!["a@edge.local", "b@edge.local"]);
    }

    #[test]
    fn resend_wins_over_smtp() {
        let config = config_from(&[
            ("LEAD_NOTIFY_TO", "sales@edge.local"),
            ("RESEND_API_KEY", "re_123"),
            ("SMTP_HOST", "smtp.edge.local"),
        ])
        .unwrap();
        assert_eq!(config.mail_backend, MailBackend::Resend { api_key: "re_123".into() });
    }

    #[test]
    fn smtp_settings_are_read() {
        let config = config_from(&[
            ("LEAD_NOTIFY_TO", "sales@edge.local"),
            ("SMTP_HOST", "smtp.edge.local"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USERNAME", "leads"),
        ])
        .unwrap();
        assert_eq!(
            config.mail_backend,
            MailBackend::Smtp(SmtpSettings {
                host: "smtp.edge.local".into(),
                port: 2525,
                username: Some("leads".into()),
                password: None,
            })
        );
    }

    #[test]
    fn staging_uses_fixed_port_and_bad_numbers_fail() {
        let config = config_from(&[("LEAD_NOTIFY_TO", "s@e.io"), ("ENVIRONMENT", "staging"), ("PORT", "9")]).unwrap();
        assert_eq!(config.port, 3100);
        assert!(config_from(&[("LEAD_NOTIFY_TO", "s@e.io"), ("PORT", "eighty")]).is_err());
        assert!(config_from(&[("LEAD_NOTIFY_TO", "s@e.io"), ("LEAD_EMAIL_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config_from(&[("LEAD_NOTIFY_TO", "s@e.io"), ("LEAD_EMAIL_MAX_ATTEMPTS", "64")]).is_err());
        let config = config_from(&[("LEAD_NOTIFY_TO", "s@e.io"), ("LEAD_EMAIL_MAX_ATTEMPTS", "10")]).unwrap();
        assert_eq!(config.lead_notify.max_attempts, MAX_EMAIL_ATTEMPTS);
    }
}
