use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use sea_orm::ActiveValue::{NotSet, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::reviews::{ReviewList, UpsertReviewRequest},
    entity::{
        bookings::Entity as Bookings,
        reviews::{
            ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel,
        },
        services::Entity as Services,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::booking_service::require_customer,
    state::AppState,
};

pub fn validate_rating(rating: i32) -> Result<(), AppError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(
            "rating must be between 1 and 5".into(),
        ))
    }
}

/// One review per booking: the first call creates it, later calls replace
/// rating and comment in place.
pub async fn upsert_review(
    state: &AppState,
    user: &AuthUser,
    booking_id: Uuid,
    payload: UpsertReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;

    let txn = state.orm.begin().await?;

    let booking = Bookings::find_by_id(booking_id).one(&txn).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    let customer = require_customer(&txn, user).await?;
    if booking.customer_id != customer.id {
        return Err(AppError::Forbidden);
    }

    let existing = Reviews::find()
        .filter(ReviewCol::BookingId.eq(booking.id))
        .one(&txn)
        .await?;

    let review = match existing {
        Some(review) => {
            let mut active: ReviewActive = review.into();
            active.rating = Set(payload.rating);
            active.comment = Set(payload.comment);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => {
            // Customer, service and provider are copied off the booking;
            // they follow the booking, never the request.
            ReviewActive {
                id: Set(Uuid::new_v4()),
                booking_id: Set(booking.id),
                customer_id: Set(booking.customer_id),
                service_id: Set(booking.service_id),
                service_provider_id: Set(booking.service_provider_id),
                rating: Set(payload.rating),
                comment: Set(payload.comment),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_upsert",
        Some("reviews"),
        Some(serde_json::json!({
            "booking_id": booking.id,
            "rating": review.rating,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review saved",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn service_reviews(
    state: &AppState,
    service_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let service = Services::find_by_id(service_id).one(&state.orm).await?;
    if service.is_none() {
        return Err(AppError::NotFound);
    }

    let (page, limit, offset) = pagination.normalize();

    let finder = Reviews::find()
        .filter(ReviewCol::ServiceId.eq(service_id))
        .order_by_desc(ReviewCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        booking_id: model.booking_id,
        customer_id: model.customer_id,
        service_id: model.service_id,
        service_provider_id: model.service_provider_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
