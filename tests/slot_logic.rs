use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use salon_booking_api::{
    dto::bookings::BookingView,
    error::AppError,
    middleware::auth::{AuthUser, ensure_staff, is_staff},
    models::Booking,
    services::review_service::validate_rating,
    services::availability::slot_window,
};

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

#[test]
fn slot_window_is_one_hour_regardless_of_service_duration() {
    let start = at("2024-06-01T10:00:00Z");
    let (window_start, window_end) = slot_window(start);
    assert_eq!(window_start, start);
    assert_eq!(window_end - window_start, Duration::hours(1));
}

#[test]
fn rating_bounds() {
    assert!(validate_rating(1).is_ok());
    assert!(validate_rating(3).is_ok());
    assert!(validate_rating(5).is_ok());
    assert!(matches!(validate_rating(0), Err(AppError::InvalidInput(_))));
    assert!(matches!(validate_rating(6), Err(AppError::InvalidInput(_))));
    assert!(matches!(validate_rating(-1), Err(AppError::InvalidInput(_))));
}

#[test]
fn staff_roles() {
    let manager = AuthUser {
        user_id: Uuid::new_v4(),
        role: "manager".into(),
    };
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    };
    let customer = AuthUser {
        user_id: Uuid::new_v4(),
        role: "customer".into(),
    };
    assert!(is_staff(&manager));
    assert!(is_staff(&admin));
    assert!(!is_staff(&customer));
    assert!(ensure_staff(&manager).is_ok());
    assert!(matches!(ensure_staff(&customer), Err(AppError::Forbidden)));
}

#[test]
fn completed_is_derived_from_the_clock() {
    let booking = Booking {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        service_provider_id: Uuid::new_v4(),
        appointment_datetime: at("2024-06-01T10:00:00Z"),
        created_at: at("2024-05-01T09:00:00Z"),
    };

    assert!(!booking.is_past(at("2024-06-01T09:59:59Z")));
    assert!(booking.is_past(at("2024-06-01T10:00:00Z")));
    assert!(booking.is_past(at("2024-07-01T00:00:00Z")));

    let view = BookingView::at(booking, at("2024-07-01T00:00:00Z"));
    assert!(view.completed);
}
