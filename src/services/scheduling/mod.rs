pub mod calcom;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};

use crate::models::{BookingOutcome, BookingRequest, Slot};

pub const NO_SLOTS_MESSAGE: &str = "I don't see any available slots in the next week. Please check back later or visit the website to book directly.";

const UNREADABLE_SLOTS_MESSAGE: &str = "I'm having trouble reading the available times. Please visit the website to book directly.";

const MAX_SLOTS: usize = 10;
const MAX_DAYS: usize = 3;
const MAX_TIMES_PER_DAY: usize = 3;

/// The calendar provider behind the booking flow.
///
/// Implementations must not surface transport failures: an unreachable
/// provider yields an empty slot list or a failed [`BookingOutcome`].
#[async_trait]
pub trait SchedulingGateway: Send + Sync {
    /// Open start times between the two dates, defaulting to the coming week.
    async fn get_available_slots(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Vec<Slot>;

    async fn create_booking(&self, request: &BookingRequest) -> BookingOutcome;

    /// Availability summary meant to be read out as-is.
    async fn get_formatted_available_times(&self) -> String {
        let slots = self.get_available_slots(None, None).await;
        format_available_times(&slots)
    }
}

pub fn format_available_times(slots: &[Slot]) -> String {
    if slots.is_empty() {
        return NO_SLOTS_MESSAGE.to_string();
    }

    // Days in first-seen order
    let mut days: Vec<(String, Vec<String>)> = Vec::new();
    for slot in slots.iter().take(MAX_SLOTS) {
        let Ok(start) = DateTime::parse_from_rfc3339(slot.as_str()) else {
            tracing::debug!(slot = %slot, "skipping unparseable slot");
            continue;
        };
        let day = start.format("%A, %B %d").to_string();
        let time = start.format("%I:%M %p").to_string();

        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, times)) => times.push(time),
            None => days.push((day, vec![time])),
        }
    }

    if days.is_empty() {
        return UNREADABLE_SLOTS_MESSAGE.to_string();
    }

    let mut response = String::from("Here are some available times for a consultation call: ");
    for (day, times) in days.iter().take(MAX_DAYS) {
        let shown: Vec<&str> = times.iter().take(MAX_TIMES_PER_DAY).map(String::as_str).collect();
        response.push_str(&format!("On {day}, I have slots at {}. ", shown.join(", ")));
    }
    response.push_str(
        "Would you like to book one of these times, or would you prefer to see more options?",
    );
    response
}
