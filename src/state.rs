use crate::config::AppConfig;
use crate::services::booking_flow::BookingFlowController;

pub struct AppState {
    pub config: AppConfig,
    pub booking: BookingFlowController,
}
