use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Booking conversation stages, in the only order they may be visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    #[default]
    Initial,
    ShowTimes,
    CollectInfo,
    ConfirmBooking,
    Completed,
}

impl BookingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStage::Initial => "initial",
            BookingStage::ShowTimes => "show_times",
            BookingStage::CollectInfo => "collect_info",
            BookingStage::ConfirmBooking => "confirm_booking",
            BookingStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSession {
    pub stage: BookingStage,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_fragments: Vec<String>,
    pub last_activity: DateTime<Utc>,
}

impl BookingSession {
    pub fn new() -> Self {
        Self {
            stage: BookingStage::Initial,
            name: None,
            email: None,
            email_fragments: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    /// Moves to `next` if it lies ahead of the current stage. Returns whether
    /// the stage changed.
    pub fn advance(&mut self, next: BookingStage) -> bool {
        if next > self.stage {
            self.stage = next;
            true
        } else {
            false
        }
    }

    pub fn has_contact(&self) -> bool {
        self.name.is_some() && self.email.is_some()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}
