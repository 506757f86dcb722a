use chrono::{DateTime, Duration, DurationRound, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tokio::sync::Mutex;
use uuid::Uuid;

use salon_booking_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        bookings::{CreateBookingRequest, RescheduleBookingRequest},
        reviews::UpsertReviewRequest,
    },
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        customers::ActiveModel as CustomerActive,
        provider_services::ActiveModel as ProviderServiceActive,
        reviews::{Column as ReviewCol, Entity as Reviews},
        service_providers::ActiveModel as ProviderActive,
        services::ActiveModel as ServiceActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{availability::is_slot_available, booking_service, review_service},
    state::AppState,
};

// Tests share one database; serialize them so migration DDL and row locks
// from one test never interleave with another.
static TEST_LOCK: Mutex<()> = Mutex::const_new(());

#[tokio::test]
async fn booking_and_review_flow() -> anyhow::Result<()> {
    let _guard = TEST_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let fixture = seed_salon(&state).await?;
    let t0 = base_slot();

    // Free slot: bookable.
    assert!(is_slot_available(&state.orm, fixture.provider_id, t0).await?);

    let booking = booking_service::create_booking(
        &state,
        &fixture.customer,
        CreateBookingRequest {
            service_id: fixture.service_id,
            service_provider_id: fixture.provider_id,
            appointment_datetime: t0,
        },
    )
    .await?
    .data
    .unwrap()
    .booking;
    assert_eq!(booking.service_provider_id, fixture.provider_id);
    assert_eq!(booking.appointment_datetime, t0);

    // Booked slot: gone. The next whole hour is a different slot.
    assert!(!is_slot_available(&state.orm, fixture.provider_id, t0).await?);
    assert!(is_slot_available(&state.orm, fixture.provider_id, t0 + Duration::hours(1)).await?);

    // The scan only looks at starts inside the candidate window, so a
    // candidate half an hour after an existing booking still reads as free,
    // while a candidate half an hour before it does not.
    assert!(is_slot_available(&state.orm, fixture.provider_id, t0 + Duration::minutes(30)).await?);
    assert!(
        !is_slot_available(&state.orm, fixture.provider_id, t0 - Duration::minutes(30)).await?
    );

    // Double-booking the exact slot fails.
    let conflict = booking_service::create_booking(
        &state,
        &fixture.customer,
        CreateBookingRequest {
            service_id: fixture.service_id,
            service_provider_id: fixture.provider_id,
            appointment_datetime: t0,
        },
    )
    .await;
    assert!(matches!(conflict, Err(AppError::SlotConflict)));

    // Past-dated appointments are rejected before any availability check.
    let past = booking_service::create_booking(
        &state,
        &fixture.customer,
        CreateBookingRequest {
            service_id: fixture.service_id,
            service_provider_id: fixture.provider_id,
            appointment_datetime: Utc::now() - Duration::hours(1),
        },
    )
    .await;
    assert!(matches!(past, Err(AppError::InvalidInput(_))));

    // A provider cannot be booked for a service it does not offer.
    let unoffered = booking_service::create_booking(
        &state,
        &fixture.customer,
        CreateBookingRequest {
            service_id: fixture.other_service_id,
            service_provider_id: fixture.provider_id,
            appointment_datetime: t0 + Duration::hours(2),
        },
    )
    .await;
    assert!(matches!(unoffered, Err(AppError::InvalidInput(_))));

    // Reschedule: moving onto an occupied slot fails and changes nothing.
    let second = booking_service::create_booking(
        &state,
        &fixture.customer,
        CreateBookingRequest {
            service_id: fixture.service_id,
            service_provider_id: fixture.provider_id,
            appointment_datetime: t0 + Duration::hours(2),
        },
    )
    .await?
    .data
    .unwrap()
    .booking;

    let blocked = booking_service::reschedule_booking(
        &state,
        &fixture.customer,
        second.id,
        RescheduleBookingRequest {
            appointment_datetime: t0,
        },
    )
    .await;
    assert!(matches!(blocked, Err(AppError::SlotConflict)));

    let stored = Bookings::find_by_id(second.id)
        .one(&state.orm)
        .await?
        .expect("booking still present");
    assert_eq!(
        stored.appointment_datetime.with_timezone(&Utc),
        t0 + Duration::hours(2)
    );

    // Moving a booking onto its own current time is not a conflict.
    booking_service::reschedule_booking(
        &state,
        &fixture.customer,
        second.id,
        RescheduleBookingRequest {
            appointment_datetime: t0 + Duration::hours(2),
        },
    )
    .await?;

    // A genuine move works.
    let moved = booking_service::reschedule_booking(
        &state,
        &fixture.customer,
        second.id,
        RescheduleBookingRequest {
            appointment_datetime: t0 + Duration::hours(3),
        },
    )
    .await?
    .data
    .unwrap()
    .booking;
    assert_eq!(moved.appointment_datetime, t0 + Duration::hours(3));

    // Only the owner (or staff) may touch someone else's booking.
    let stranger = seed_customer(&state).await?;
    let foreign_move = booking_service::reschedule_booking(
        &state,
        &stranger,
        second.id,
        RescheduleBookingRequest {
            appointment_datetime: t0 + Duration::hours(4),
        },
    )
    .await;
    assert!(matches!(foreign_move, Err(AppError::Forbidden)));

    let foreign_delete = booking_service::delete_booking(&state, &stranger, second.id).await;
    assert!(matches!(foreign_delete, Err(AppError::Forbidden)));

    // Reviews: bad rating, wrong owner, then a create-and-update cycle.
    let bad_rating = review_service::upsert_review(
        &state,
        &fixture.customer,
        booking.id,
        UpsertReviewRequest {
            rating: 6,
            comment: "out of range".into(),
        },
    )
    .await;
    assert!(matches!(bad_rating, Err(AppError::InvalidInput(_))));

    let foreign_review = review_service::upsert_review(
        &state,
        &stranger,
        booking.id,
        UpsertReviewRequest {
            rating: 3,
            comment: "not my booking".into(),
        },
    )
    .await;
    assert!(matches!(foreign_review, Err(AppError::Forbidden)));

    let review = review_service::upsert_review(
        &state,
        &fixture.customer,
        booking.id,
        UpsertReviewRequest {
            rating: 4,
            comment: "great haircut".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(review.rating, 4);
    assert_eq!(review.booking_id, booking.id);

    let updated = review_service::upsert_review(
        &state,
        &fixture.customer,
        booking.id,
        UpsertReviewRequest {
            rating: 5,
            comment: "even better on reflection".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.id, review.id, "upsert must update in place");
    assert_eq!(updated.rating, 5);

    let missing = review_service::upsert_review(
        &state,
        &fixture.customer,
        Uuid::new_v4(),
        UpsertReviewRequest {
            rating: 3,
            comment: "no such booking".into(),
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    // Cancelling frees the slot and takes the review with it.
    booking_service::delete_booking(&state, &fixture.customer, booking.id).await?;
    assert!(is_slot_available(&state.orm, fixture.provider_id, t0).await?);
    let orphan = Reviews::find()
        .filter(ReviewCol::BookingId.eq(booking.id))
        .one(&state.orm)
        .await?;
    assert!(orphan.is_none(), "review must cascade with its booking");

    // Staff may cancel anyone's booking.
    let manager = AuthUser {
        user_id: Uuid::new_v4(),
        role: "manager".into(),
    };
    booking_service::delete_booking(&state, &manager, second.id).await?;

    let gone = booking_service::delete_booking(&state, &manager, second.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_creates_persist_at_most_one_booking() -> anyhow::Result<()> {
    let _guard = TEST_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let fixture = seed_salon(&state).await?;
    let t0 = base_slot();

    let payload = || CreateBookingRequest {
        service_id: fixture.service_id,
        service_provider_id: fixture.provider_id,
        appointment_datetime: t0,
    };

    let state_a = state.clone();
    let state_b = state.clone();
    let user_a = fixture.customer.clone();
    let user_b = fixture.customer.clone();
    let (pa, pb) = (payload(), payload());

    let (first, second) = tokio::join!(
        tokio::spawn(async move { booking_service::create_booking(&state_a, &user_a, pa).await }),
        tokio::spawn(async move { booking_service::create_booking(&state_b, &user_b, pb).await }),
    );
    let results = [first?, second?];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two racing creates may win");
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::SlotConflict))),
        "the loser must see a slot conflict"
    );

    let persisted = Bookings::find()
        .filter(BookingCol::ServiceProviderId.eq(fixture.provider_id))
        .filter(BookingCol::AppointmentDatetime.eq(t0))
        .count(&state.orm)
        .await?;
    assert_eq!(persisted, 1);

    Ok(())
}

struct SalonFixture {
    customer: AuthUser,
    provider_id: Uuid,
    service_id: Uuid,
    other_service_id: Uuid,
}

// Allow skipping when no DB is configured in the environment.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

/// A whole-hour slot far enough out that "must be in the future" never flakes.
fn base_slot() -> DateTime<Utc> {
    (Utc::now() + Duration::days(30))
        .duration_trunc(Duration::hours(1))
        .expect("hour truncation")
}

/// Every fixture gets its own users, provider and services, so tests never
/// collide on the provider/start unique index.
async fn seed_salon(state: &AppState) -> anyhow::Result<SalonFixture> {
    let customer = seed_customer(state).await?;

    let provider_user = seed_user(state, "provider").await?;
    let provider = ProviderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(provider_user),
        phone: Set("+7-900-000-00-01".into()),
        specialization: Set("Hairdresser".into()),
    }
    .insert(&state.orm)
    .await?;

    let service = seed_service(state).await?;
    let other_service = seed_service(state).await?;

    ProviderServiceActive {
        service_provider_id: Set(provider.id),
        service_id: Set(service),
    }
    .insert(&state.orm)
    .await?;

    Ok(SalonFixture {
        customer,
        provider_id: provider.id,
        service_id: service,
        other_service_id: other_service,
    })
}

async fn seed_user(state: &AppState, role: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{role}-{}@example.com", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

async fn seed_customer(state: &AppState) -> anyhow::Result<AuthUser> {
    let user_id = seed_user(state, "customer").await?;
    CustomerActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        phone: Set("+7-900-000-00-02".into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser {
        user_id,
        role: "customer".into(),
    })
}

async fn seed_service(state: &AppState) -> anyhow::Result<Uuid> {
    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Haircut {}", Uuid::new_v4())),
        description: Set("Cut and styling".into()),
        duration_minutes: Set(60),
        price: Set(150000),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(service.id)
}
