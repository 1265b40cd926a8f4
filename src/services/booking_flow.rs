use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration};

use crate::models::{BookingRequest, BookingSession, BookingStage, Slot};
use crate::services::contact::{
    email_from_fragments, is_email_address, is_name_like, ContactExtractor,
};
use crate::services::intent;
use crate::services::scheduling::SchedulingGateway;
use crate::services::session_store::SessionStore;

const DEFAULT_BOOKING_NOTE: &str = "Meeting booked via voice AI assistant";

const CONTACT_PROMPT: &str = "Great! To book a consultation call, I'll need your name and email address. You can say something like 'My name is John Smith and my email is john@example.com'";
const CONTINUE_SPELLING: &str = "Got it, continue spelling...";
const DOT_NOTED: &str = "Dot noted, continue...";
const ASK_FOR_NAME: &str = "I need both your name and email to book the meeting. You can provide them together or one at a time. What's your name?";
const ASK_FOR_TIME: &str = "Which specific time would you prefer? You can say something like 'tomorrow at 10 AM' or 'book the first available slot'.";
const NO_SLOTS: &str = "I'm sorry, but I don't see any available slots right now. Please check back later or visit the website to book directly.";
const MISSING_CONTACT: &str = "I'm sorry, I lost track of your contact details. Please say 'start over' to try again, or book directly on the website.";
const REENGAGE: &str = "I can help you schedule a consultation call! Would you like to see my available times this week?";
const ALREADY_BOOKED: &str = "You're all set, your consultation call is already booked. Check your inbox for the confirmation email.";
const INVALID_EMAIL: &str = "I couldn't make out a valid email address. Could you say it again, or spell it out letter by letter?";
const RESET_REPLY: &str = "No problem, let's start over. Just let me know whenever you'd like to book a consultation call.";

/// Drives the booking conversation one utterance at a time.
///
/// Utterances for the same session key are processed strictly one after the
/// other; different sessions proceed independently.
pub struct BookingFlowController {
    gateway: Arc<dyn SchedulingGateway>,
    store: Arc<dyn SessionStore>,
    extractor: ContactExtractor,
    booking_note: String,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BookingFlowController {
    pub fn new(gateway: Arc<dyn SchedulingGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            gateway,
            store,
            extractor: ContactExtractor::new(),
            booking_note: DEFAULT_BOOKING_NOTE.to_string(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_extractor(mut self, extractor: ContactExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_booking_note(mut self, note: impl Into<String>) -> Self {
        self.booking_note = note.into();
        self
    }

    pub fn gateway(&self) -> &dyn SchedulingGateway {
        self.gateway.as_ref()
    }

    /// Returns the spoken reply, or `None` when the utterance has nothing to
    /// do with booking and should be answered elsewhere.
    pub async fn handle_utterance(&self, session_key: &str, utterance: &str) -> Option<String> {
        let lock = self.session_lock(session_key);
        let _guard = lock.lock().await;

        let stored = self.store.get(session_key);
        let is_new = stored.is_none();
        let mut session = stored.unwrap_or_default();
        let before = session.stage;

        let reply = self.dispatch(session_key, &mut session, utterance).await;

        if is_new && reply.is_none() {
            tracing::debug!(session = session_key, "utterance not booking related");
            return None;
        }

        if session.stage != before {
            tracing::info!(
                session = session_key,
                from = before.as_str(),
                to = session.stage.as_str(),
                "booking stage changed"
            );
        }
        tracing::debug!(
            session = session_key,
            stage = session.stage.as_str(),
            handled = reply.is_some(),
            "processed utterance"
        );

        session.touch();
        self.store.update(session_key, session);
        reply
    }

    /// Discards the session so the next utterance starts from scratch.
    pub async fn reset(&self, session_key: &str) -> bool {
        let lock = self.session_lock(session_key);
        let _guard = lock.lock().await;
        let removed = self.store.evict(session_key);
        if removed {
            tracing::info!(session = session_key, "booking session reset");
        }
        removed
    }

    pub fn session(&self, session_key: &str) -> Option<BookingSession> {
        self.store.get(session_key)
    }

    /// Drops sessions idle for longer than `ttl` along with their locks.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let evicted = self.store.evict_expired(ttl);
        self.locks()
            .retain(|key, lock| Arc::strong_count(lock) > 1 || self.store.get(key).is_some());
        if evicted > 0 {
            tracing::info!(evicted, "evicted idle booking sessions");
        }
        evicted
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_lock(&self, session_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks().entry(session_key.to_string()).or_default())
    }

    async fn dispatch(
        &self,
        session_key: &str,
        session: &mut BookingSession,
        utterance: &str,
    ) -> Option<String> {
        if !matches!(session.stage, BookingStage::Initial | BookingStage::Completed)
            && intent::is_reset_request(utterance)
        {
            *session = BookingSession::new();
            return Some(RESET_REPLY.to_string());
        }

        let reply = match session.stage {
            BookingStage::Initial => self.initial(session, utterance).await,
            BookingStage::ShowTimes => {
                session.advance(BookingStage::CollectInfo);
                Some(CONTACT_PROMPT.to_string())
            }
            BookingStage::CollectInfo => Some(self.collect_info(session, utterance)),
            BookingStage::ConfirmBooking => {
                Some(self.confirm_booking(session_key, session, utterance).await)
            }
            BookingStage::Completed => None,
        };

        reply.or_else(|| intent::is_booking_request(utterance).then(|| REENGAGE.to_string()))
    }

    async fn initial(&self, session: &mut BookingSession, utterance: &str) -> Option<String> {
        if intent::is_booking_request(utterance) {
            session.advance(BookingStage::ShowTimes);
            let times = self.gateway.get_formatted_available_times().await;
            return Some(format!("I'd love to schedule a consultation call with you! {times}"));
        }

        if intent::wants_times(utterance) {
            session.advance(BookingStage::CollectInfo);
            return Some(CONTACT_PROMPT.to_string());
        }

        None
    }

    fn collect_info(&self, session: &mut BookingSession, utterance: &str) -> String {
        if session.has_contact() {
            session.advance(BookingStage::ConfirmBooking);
            return confirm_prompt(session);
        }

        if let Some(letter) = spelled_letter(utterance) {
            session.email_fragments.push(letter);
            return CONTINUE_SPELLING.to_string();
        }

        let lower = utterance.to_lowercase();
        let mut contact = self.extractor.extract(utterance);

        if lower.contains("at") && lower.contains("gmail") {
            if let Some(email) = email_from_fragments(&session.email_fragments) {
                session.email_fragments.clear();
                contact.email = Some(email);
            }
        } else if lower.contains("dot") && contact.name.is_none() && contact.email.is_none() {
            session.email_fragments.push(".".to_string());
            return DOT_NOTED.to_string();
        }

        // The latest turn wins; earlier values survive only when nothing new was heard.
        if contact.name.is_some() {
            session.name = contact.name;
        }
        if contact.email.is_some() {
            session.email = contact.email;
        }

        if session.has_contact() {
            session.advance(BookingStage::ConfirmBooking);
            return confirm_prompt(session);
        }

        match (&session.name, &session.email) {
            (Some(name), None) => format!(
                "Thanks {name}! Now I need your email address. You can spell it out letter by letter if needed."
            ),
            (None, Some(email)) => {
                format!("Great! I have your email as {email}. What's your name?")
            }
            _ => ASK_FOR_NAME.to_string(),
        }
    }

    async fn confirm_booking(
        &self,
        session_key: &str,
        session: &mut BookingSession,
        utterance: &str,
    ) -> String {
        if !intent::is_confirmation(utterance) {
            return ASK_FOR_TIME.to_string();
        }

        let (Some(name), Some(email)) = (session.name.clone(), session.email.clone()) else {
            tracing::warn!(session = session_key, "confirmation without stored contact details");
            return MISSING_CONTACT.to_string();
        };

        let slots = self.gateway.get_available_slots(None, None).await;
        let Some(start) = slots.into_iter().next() else {
            tracing::warn!(session = session_key, "no slots available at confirmation");
            return NO_SLOTS.to_string();
        };

        self.place_booking(session_key, session, name, email, start).await
    }

    /// Books straight from contact details the caller already has, without
    /// walking through the conversation. `preferred_time` picks a specific
    /// offered slot; otherwise the first available one is used.
    ///
    /// Shares the session key with [`handle_utterance`](Self::handle_utterance),
    /// so a session books at most once whichever path gets there first.
    pub async fn book_directly(
        &self,
        session_key: &str,
        name: &str,
        email: &str,
        preferred_time: Option<&str>,
    ) -> String {
        let lock = self.session_lock(session_key);
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .get(session_key)
            .unwrap_or_else(|| self.store.create(session_key));

        if session.stage == BookingStage::Completed {
            tracing::info!(session = session_key, "direct booking for completed session ignored");
            return ALREADY_BOOKED.to_string();
        }

        let name = name.trim();
        let email = email.trim();
        if !is_name_like(name) {
            return ASK_FOR_NAME.to_string();
        }
        if !is_email_address(email) {
            return INVALID_EMAIL.to_string();
        }

        let slots = self.gateway.get_available_slots(None, None).await;
        let Some(start) = pick_slot(slots, preferred_time) else {
            tracing::warn!(session = session_key, "no slots available for direct booking");
            return NO_SLOTS.to_string();
        };

        session.name = Some(name.to_string());
        session.email = Some(email.to_string());
        session.email_fragments.clear();
        self.place_booking(session_key, &mut session, name.to_string(), email.to_string(), start)
            .await
    }

    async fn place_booking(
        &self,
        session_key: &str,
        session: &mut BookingSession,
        name: String,
        email: String,
        start: Slot,
    ) -> String {
        // Persisted before the call so a dropped request cannot book twice.
        session.advance(BookingStage::Completed);
        session.touch();
        self.store.update(session_key, session.clone());

        tracing::info!(session = session_key, slot = %start, "creating booking");
        let request = BookingRequest {
            name,
            email: email.clone(),
            start,
            message: self.booking_note.clone(),
        };
        let outcome = self.gateway.create_booking(&request).await;

        if outcome.success {
            tracing::info!(
                session = session_key,
                booking_id = outcome.booking_id.as_deref().unwrap_or("unknown"),
                "booking created"
            );
            format!(
                "Perfect! I've successfully booked your consultation call. You should receive a confirmation email at {email} shortly with all the details. Looking forward to our conversation!"
            )
        } else {
            let error = outcome.error.as_deref().unwrap_or("Unknown error");
            tracing::warn!(session = session_key, error, "booking failed");
            format!(
                "I apologize, but there was an issue booking the meeting: {error}. Please try booking directly on the website or contact me via email."
            )
        }
    }
}

/// The offered slot at the same instant as `preferred`, or the earliest one.
fn pick_slot(slots: Vec<Slot>, preferred: Option<&str>) -> Option<Slot> {
    let wanted = preferred
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok());

    if let Some(wanted) = wanted {
        let matching = slots.iter().find(|slot| {
            DateTime::parse_from_rfc3339(slot.as_str()).is_ok_and(|t| t == wanted)
        });
        if let Some(slot) = matching {
            return Some(slot.clone());
        }
    }

    slots.into_iter().next()
}

fn confirm_prompt(session: &BookingSession) -> String {
    format!(
        "Perfect! I have your name as {} and email as {}. Which time slot would you prefer? Just tell me the day and time that works best for you.",
        session.name.as_deref().unwrap_or_default(),
        session.email.as_deref().unwrap_or_default(),
    )
}

/// A lone dictated letter such as "c" or "C.".
fn spelled_letter(utterance: &str) -> Option<String> {
    let mut words = utterance.split_whitespace();
    let word = words.next()?;
    if words.next().is_some() {
        return None;
    }

    let mut chars = word.trim_matches(|c: char| !c.is_alphanumeric()).chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Some(c.to_lowercase().collect()),
        _ => None,
    }
}
