use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Booking;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    pub service_provider_id: Uuid,
    pub appointment_datetime: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RescheduleBookingRequest {
    pub appointment_datetime: DateTime<Utc>,
}

/// A booking as shown to clients: the stored row plus the derived
/// `completed` flag, computed against the clock at read time.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub completed: bool,
}

impl BookingView {
    pub fn at(booking: Booking, now: DateTime<Utc>) -> Self {
        let completed = booking.is_past(now);
        Self { booking, completed }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<BookingView>,
}
