//! Keyword checks over raw utterances.
//!
//! All checks are plain lower-cased substring matches. Speech-to-text output
//! is noisy, so a broad list with the occasional false positive is preferred
//! over missing a caller who wants to book.

const BOOKING_KEYWORDS: &[&str] = &[
    "book",
    "schedule",
    "meeting",
    "call",
    "consultation",
    "appointment",
    "talk",
    "discuss",
    "chat",
    "hire",
    "project",
    "work together",
    "collaborate",
];

const TIMES_KEYWORDS: &[&str] = &["available", "times"];

const CONFIRMATION_KEYWORDS: &[&str] = &[
    "yes",
    "book",
    "schedule",
    "confirm",
    "tomorrow",
    "today",
    "am",
    "pm",
    "morning",
    "afternoon",
];

const RESET_PHRASES: &[&str] = &[
    "start over",
    "start again",
    "never mind",
    "nevermind",
    "cancel that",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn is_booking_request(text: &str) -> bool {
    contains_any(text, BOOKING_KEYWORDS)
}

/// The caller is asking to hear the open slots.
pub fn wants_times(text: &str) -> bool {
    contains_any(text, TIMES_KEYWORDS)
}

/// Affirmative or time-ish answer to "which slot would you prefer?".
pub fn is_confirmation(text: &str) -> bool {
    contains_any(text, CONFIRMATION_KEYWORDS)
}

pub fn is_reset_request(text: &str) -> bool {
    contains_any(text, RESET_PHRASES)
}
