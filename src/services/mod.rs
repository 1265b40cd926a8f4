pub mod booking_flow;
pub mod contact;
pub mod intent;
pub mod scheduling;
pub mod session_store;
pub mod voice;
