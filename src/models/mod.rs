pub mod booking;
pub mod contact;
pub mod session;

pub use booking::{BookingOutcome, BookingRequest, Slot};
pub use contact::ContactInfo;
pub use session::{BookingSession, BookingStage};
