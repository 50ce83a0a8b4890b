use std::env;

use async_trait::async_trait;
use tracing::{error, info, warn};

/// Outbound SMS gateway. `is_configured` is checked once per broadcast; when
/// it reports false the caller records "not attempted" instead of failing.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Sends one message, returning the gateway's delivery sid on success or
    /// a diagnostic message on failure.
    async fn send_sms(&self, to_number: &str, body: &str) -> Result<String, String>;
}

pub struct TwilioSms {
    client: Option<twilio::Client>,
    from_number: String,
}

impl TwilioSms {
    pub fn from_env() -> Self {
        let account_sid = env::var("TWILIO_ACCOUNT_SID").ok();
        let auth_token = env::var("TWILIO_AUTH_TOKEN").ok();
        let from_number = env::var("TWILIO_PHONE_NUMBER").unwrap_or_default();

        // Live account SIDs always start with "AC"; anything else is a
        // placeholder left in the environment.
        let client = match (account_sid, auth_token) {
            (Some(sid), Some(token)) if sid.starts_with("AC") => {
                Some(twilio::Client::new(&sid, &token))
            }
            _ => None,
        };

        if client.is_none() || from_number.is_empty() {
            warn!("Twilio not configured - SMS alerts will be skipped");
        } else {
            info!("Twilio SMS service initialized");
        }

        Self {
            client,
            from_number,
        }
    }
}

#[async_trait]
impl SmsGateway for TwilioSms {
    fn is_configured(&self) -> bool {
        self.client.is_some() && !self.from_number.is_empty()
    }

    async fn send_sms(&self, to_number: &str, body: &str) -> Result<String, String> {
        let Some(client) = &self.client else {
            return Err("Twilio not configured".to_string());
        };
        if self.from_number.is_empty() {
            return Err("TWILIO_PHONE_NUMBER not set".to_string());
        }

        match client
            .send_message(twilio::OutboundMessage::new(
                &self.from_number,
                to_number,
                body,
            ))
            .await
        {
            Ok(message) => {
                info!("SMS sent to {}: {}", to_number, message.sid);
                crate::metrics::increment_sms_sent();
                Ok(message.sid)
            }
            Err(e) => {
                error!("Failed to send SMS to {}: {}", to_number, e);
                crate::metrics::increment_sms_failed();
                Err(format!("Twilio error: {}", e))
            }
        }
    }
}
