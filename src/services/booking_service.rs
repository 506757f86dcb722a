use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bookings::{BookingList, BookingView, CreateBookingRequest, RescheduleBookingRequest},
    entity::{
        bookings::{
            ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings,
            Model as BookingModel,
        },
        customers::{Column as CustomerCol, Entity as Customers, Model as CustomerModel},
        provider_services::{Column as ProviderServiceCol, Entity as ProviderServices},
        service_providers::Entity as ServiceProviders,
        services::Entity as Services,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff, is_staff},
    models::Booking,
    response::{ApiResponse, Meta},
    routes::params::{BookingListQuery, Pagination, SortOrder},
    services::availability::conflict_condition,
    state::AppState,
};

pub async fn list_my_bookings(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<BookingList>> {
    let customer = require_customer(&state.orm, user).await?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Bookings::find()
        .filter(BookingCol::CustomerId.eq(customer.id))
        .order_by_desc(BookingCol::AppointmentDatetime);

    let total = finder.clone().count(&state.orm).await? as i64;

    let now = Utc::now();
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| BookingView::at(booking_from_entity(model), now))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        BookingList { items },
        Some(meta),
    ))
}

pub async fn list_all_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(provider_id) = query.service_provider_id {
        condition = condition.add(BookingCol::ServiceProviderId.eq(provider_id));
    }

    let mut finder = Bookings::find().filter(condition);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(BookingCol::AppointmentDatetime),
        SortOrder::Desc => finder.order_by_desc(BookingCol::AppointmentDatetime),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let now = Utc::now();
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| BookingView::at(booking_from_entity(model), now))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(meta),
    ))
}

pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<BookingView>> {
    let booking = Bookings::find_by_id(id).one(&state.orm).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if !is_staff(user) {
        let customer = require_customer(&state.orm, user).await?;
        if booking.customer_id != customer.id {
            return Err(AppError::Forbidden);
        }
    }

    Ok(ApiResponse::success(
        "Ok",
        BookingView::at(booking_from_entity(booking), Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<BookingView>> {
    let customer = require_customer(&state.orm, user).await?;

    if payload.appointment_datetime <= Utc::now() {
        return Err(AppError::InvalidInput(
            "appointment time must be in the future".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let service = Services::find_by_id(payload.service_id).one(&txn).await?;
    if service.is_none() {
        return Err(AppError::NotFound);
    }
    let provider = ServiceProviders::find_by_id(payload.service_provider_id)
        .one(&txn)
        .await?;
    if provider.is_none() {
        return Err(AppError::NotFound);
    }

    let offered = ProviderServices::find()
        .filter(
            Condition::all()
                .add(ProviderServiceCol::ServiceProviderId.eq(payload.service_provider_id))
                .add(ProviderServiceCol::ServiceId.eq(payload.service_id)),
        )
        .one(&txn)
        .await?;
    if offered.is_none() {
        return Err(AppError::InvalidInput(
            "provider does not offer this service".into(),
        ));
    }

    // Lock any booking already inside the window so a concurrent create for
    // the same slot serializes behind this transaction; the unique index on
    // (provider, start) catches the insert-vs-insert race the lock cannot see.
    let conflicts = Bookings::find()
        .filter(conflict_condition(
            payload.service_provider_id,
            payload.appointment_datetime,
            None,
        ))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if !conflicts.is_empty() {
        return Err(AppError::SlotConflict);
    }

    let active = BookingActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        service_id: Set(payload.service_id),
        service_provider_id: Set(payload.service_provider_id),
        appointment_datetime: Set(payload.appointment_datetime.into()),
        created_at: NotSet,
    };
    let booking = match active.insert(&txn).await {
        Ok(b) => b,
        Err(err) => {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return Err(AppError::SlotConflict);
            }
            return Err(err.into());
        }
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_create",
        Some("bookings"),
        Some(serde_json::json!({
            "booking_id": booking.id,
            "service_provider_id": booking.service_provider_id,
            "appointment_datetime": booking.appointment_datetime,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking created",
        BookingView::at(booking_from_entity(booking), Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn reschedule_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RescheduleBookingRequest,
) -> AppResult<ApiResponse<BookingView>> {
    if payload.appointment_datetime <= Utc::now() {
        return Err(AppError::InvalidInput(
            "appointment time must be in the future".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let booking = Bookings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if !is_staff(user) {
        let customer = require_customer(&txn, user).await?;
        if booking.customer_id != customer.id {
            return Err(AppError::Forbidden);
        }
    }

    // The booking's own row is excluded from the scan, so moving a booking
    // onto its current time is a no-op success rather than a conflict.
    let conflicts = Bookings::find()
        .filter(conflict_condition(
            booking.service_provider_id,
            payload.appointment_datetime,
            Some(booking.id),
        ))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if !conflicts.is_empty() {
        return Err(AppError::SlotConflict);
    }

    let mut active: BookingActive = booking.into();
    active.appointment_datetime = Set(payload.appointment_datetime.into());
    let booking = match active.update(&txn).await {
        Ok(b) => b,
        Err(err) => {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return Err(AppError::SlotConflict);
            }
            return Err(err.into());
        }
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_reschedule",
        Some("bookings"),
        Some(serde_json::json!({
            "booking_id": booking.id,
            "appointment_datetime": booking.appointment_datetime,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking rescheduled",
        BookingView::at(booking_from_entity(booking), Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn delete_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let booking = Bookings::find_by_id(id).one(&state.orm).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if !is_staff(user) {
        let customer = require_customer(&state.orm, user).await?;
        if booking.customer_id != customer.id {
            return Err(AppError::Forbidden);
        }
    }

    // The review, if any, goes with the booking via the FK cascade.
    Bookings::delete_by_id(booking.id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_cancel",
        Some("bookings"),
        Some(serde_json::json!({ "booking_id": booking.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking cancelled",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Resolve the customer profile behind an authenticated user. Callers that
/// act as a customer but have no customer profile get `Forbidden`.
pub async fn require_customer<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
) -> AppResult<CustomerModel> {
    let customer = Customers::find()
        .filter(CustomerCol::UserId.eq(user.user_id))
        .one(conn)
        .await?;
    customer.ok_or(AppError::Forbidden)
}

pub fn booking_from_entity(model: BookingModel) -> Booking {
    Booking {
        id: model.id,
        customer_id: model.customer_id,
        service_id: model.service_id,
        service_provider_id: model.service_provider_id,
        appointment_datetime: model.appointment_datetime.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
