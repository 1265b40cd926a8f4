use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SchedulingGateway;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{BookingOutcome, BookingRequest, Slot};

const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Told to the caller whenever the booking request itself failed. Details stay in the logs.
pub const BOOKING_UNAVAILABLE: &str = "the scheduling service could not be reached";

pub struct CalComGateway {
    api_key: String,
    event_type_id: String,
    base_url: String,
    meeting_duration: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SlotsResponse {
    #[serde(default)]
    slots: BTreeMap<String, Vec<SlotEntry>>,
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    time: Option<String>,
}

impl CalComGateway {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.gateway_timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: config.cal_com_api_key.clone(),
            event_type_id: config.cal_com_event_type_id.clone(),
            base_url: config.cal_com_base_url.trim_end_matches('/').to_string(),
            meeting_duration: Duration::minutes(config.meeting_duration_minutes),
            client,
        })
    }

    async fn fetch_slots(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<Vec<Slot>> {
        let start_time = format!("{}T00:00:00.000Z", from.format("%Y-%m-%d"));
        let end_time = format!("{}T23:59:59.999Z", to.format("%Y-%m-%d"));

        let resp = self
            .client
            .get(format!("{}/slots", self.base_url))
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("eventTypeId", self.event_type_id.as_str()),
                ("startTime", start_time.as_str()),
                ("endTime", end_time.as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to call Cal.com slots API")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("Cal.com slots API returned error")?;

        let data: SlotsResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to parse Cal.com slots response")?;

        Ok(flatten_slots(data))
    }

    async fn post_booking(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome> {
        let body = booking_payload(&self.event_type_id, request, self.meeting_duration)?;

        let resp = self
            .client
            .post(format!("{}/bookings", self.base_url))
            .query(&[("apiKey", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to call Cal.com bookings API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to parse Cal.com bookings response")?;

        tracing::info!(status = %status, "Cal.com booking response");
        Ok(parse_booking_response(status, &data))
    }
}

#[async_trait]
impl SchedulingGateway for CalComGateway {
    async fn get_available_slots(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Vec<Slot> {
        let today = Utc::now().date_naive();
        let from = date_from.unwrap_or(today);
        let to = date_to.unwrap_or(today + Duration::days(DEFAULT_WINDOW_DAYS));

        match self.fetch_slots(from, to).await {
            Ok(slots) => {
                tracing::debug!(count = slots.len(), "fetched available slots");
                slots
            }
            Err(e) => {
                let detail = format!("{e:#}");
                tracing::error!(error = %detail, "failed to fetch available slots");
                Vec::new()
            }
        }
    }

    async fn create_booking(&self, request: &BookingRequest) -> BookingOutcome {
        match self.post_booking(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let detail = format!("{e:#}");
                tracing::error!(error = %detail, "failed to create booking");
                BookingOutcome::failed(BOOKING_UNAVAILABLE)
            }
        }
    }
}

fn flatten_slots(data: SlotsResponse) -> Vec<Slot> {
    data.slots
        .into_values()
        .flatten()
        .filter_map(|entry| entry.time)
        .map(Slot::new)
        .collect()
}

fn booking_payload(
    event_type_id: &str,
    request: &BookingRequest,
    duration: Duration,
) -> anyhow::Result<Value> {
    let event_type_id: i64 = event_type_id
        .trim()
        .parse()
        .with_context(|| format!("invalid Cal.com event type id {event_type_id:?}"))?;

    let start = DateTime::parse_from_rfc3339(request.start.as_str())
        .with_context(|| format!("unreadable slot time {}", request.start))?;
    let end = (start + duration)
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S.000Z")
        .to_string();

    Ok(json!({
        "eventTypeId": event_type_id,
        "start": request.start.as_str(),
        "end": end,
        "responses": {
            "name": request.name,
            "email": request.email,
            "notes": request.message,
        },
        "timeZone": "UTC",
        "language": "en",
        "metadata": {},
    }))
}

fn parse_booking_response(status: StatusCode, data: &Value) -> BookingOutcome {
    if status == StatusCode::OK || status == StatusCode::CREATED {
        let booking_id = data.get("id").map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let meeting_url = data["videoCallUrl"].as_str().map(str::to_string);
        return BookingOutcome::booked(booking_id, meeting_url);
    }

    let error = data["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("API returned status {}", status.as_u16()));
    BookingOutcome::failed(error)
}
