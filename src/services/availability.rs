use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::bookings::{Column as BookingCol, Entity as Bookings},
    error::AppResult,
};

/// Appointments always occupy one hour, regardless of the stored
/// duration of the service being booked.
pub fn slot_window(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::hours(1))
}

/// Filter matching every booking that would make `start` unavailable for the
/// provider: any booking whose own start lies in `[start, start + 1h)`.
/// A booking that began earlier and still runs past `start` does not match.
pub fn conflict_condition(
    service_provider_id: Uuid,
    start: DateTime<Utc>,
    exclude_booking: Option<Uuid>,
) -> Condition {
    let (window_start, window_end) = slot_window(start);
    let mut condition = Condition::all()
        .add(BookingCol::ServiceProviderId.eq(service_provider_id))
        .add(BookingCol::AppointmentDatetime.gte(window_start))
        .add(BookingCol::AppointmentDatetime.lt(window_end));
    if let Some(id) = exclude_booking {
        condition = condition.add(BookingCol::Id.ne(id));
    }
    condition
}

/// Is the provider free for a one-hour appointment starting at `start`?
/// Read-only; safe to call any number of times.
pub async fn is_slot_available<C: ConnectionTrait>(
    conn: &C,
    service_provider_id: Uuid,
    start: DateTime<Utc>,
) -> AppResult<bool> {
    let conflicts = Bookings::find()
        .filter(conflict_condition(service_provider_id, start, None))
        .count(conn)
        .await?;
    Ok(conflicts == 0)
}

/// Same scan, minus one booking row. Used when rescheduling so a booking's
/// current slot does not conflict with itself.
pub async fn is_slot_available_excluding<C: ConnectionTrait>(
    conn: &C,
    service_provider_id: Uuid,
    start: DateTime<Utc>,
    exclude_booking: Uuid,
) -> AppResult<bool> {
    let conflicts = Bookings::find()
        .filter(conflict_condition(
            service_provider_id,
            start,
            Some(exclude_booking),
        ))
        .count(conn)
        .await?;
    Ok(conflicts == 0)
}
