use std::env;

use crate::services::contact::EmailHint;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub cal_com_api_key: String,
    pub cal_com_event_type_id: String,
    pub cal_com_base_url: String,
    pub meeting_duration_minutes: i64,
    pub gateway_timeout_seconds: u64,
    pub session_ttl_minutes: i64,
    pub session_sweep_seconds: u64,
    pub email_hints: Vec<EmailHint>,
    pub booking_note: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: parse_var("PORT", 3000),
            cal_com_api_key: env::var("CAL_COM_API_KEY").unwrap_or_default(),
            cal_com_event_type_id: env::var("CAL_COM_EVENT_TYPE_ID").unwrap_or_default(),
            cal_com_base_url: env::var("CAL_COM_BASE_URL")
                .unwrap_or_else(|_| "https://api.cal.com/v1".to_string()),
            meeting_duration_minutes: parse_var("MEETING_DURATION_MINUTES", 30),
            gateway_timeout_seconds: parse_var("GATEWAY_TIMEOUT_SECONDS", 10),
            session_ttl_minutes: parse_var("SESSION_TTL_MINUTES", 30),
            session_sweep_seconds: parse_var("SESSION_SWEEP_SECONDS", 60),
            email_hints: env::var("EMAIL_HINTS")
                .map(|raw| EmailHint::parse_list(&raw))
                .unwrap_or_default(),
            booking_note: env::var("BOOKING_NOTE")
                .unwrap_or_else(|_| "Meeting booked via voice AI assistant".to_string()),
        };

        if config.cal_com_api_key.is_empty() {
            tracing::warn!("CAL_COM_API_KEY not set, scheduling calls will fail");
        }
        if config.cal_com_event_type_id.is_empty() {
            tracing::warn!("CAL_COM_EVENT_TYPE_ID not set, scheduling calls will fail");
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
