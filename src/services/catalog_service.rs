use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{AvailabilityData, ProviderList, ServiceList},
    entity::{
        provider_services::{Column as ProviderServiceCol, Entity as ProviderServices},
        service_providers::{
            Column as ProviderCol, Entity as ServiceProviders, Model as ProviderModel,
        },
        services::{Column as ServiceCol, Entity as Services, Model as ServiceModel},
    },
    error::{AppError, AppResult},
    models::{Service, ServiceProvider},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProviderQuery},
    services::availability::is_slot_available,
    state::AppState,
};

pub async fn list_services(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Services::find().order_by_asc(ServiceCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(service_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Services", ServiceList { items }, Some(meta)))
}

pub async fn list_providers(
    state: &AppState,
    query: ProviderQuery,
) -> AppResult<ApiResponse<ProviderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut finder = ServiceProviders::find().order_by_asc(ProviderCol::Specialization);

    if let Some(service_id) = query.service_id {
        let provider_ids: Vec<Uuid> = ProviderServices::find()
            .filter(ProviderServiceCol::ServiceId.eq(service_id))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|row| row.service_provider_id)
            .collect();
        finder = finder.filter(ProviderCol::Id.is_in(provider_ids));
    }

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(provider_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Providers", ProviderList { items }, Some(meta)))
}

pub async fn provider_availability(
    state: &AppState,
    provider_id: Uuid,
    start: DateTime<Utc>,
) -> AppResult<ApiResponse<AvailabilityData>> {
    let provider = ServiceProviders::find_by_id(provider_id)
        .one(&state.orm)
        .await?;
    if provider.is_none() {
        return Err(AppError::NotFound);
    }

    let available = is_slot_available(&state.orm, provider_id, start).await?;
    Ok(ApiResponse::success(
        "Ok",
        AvailabilityData { available },
        Some(Meta::empty()),
    ))
}

fn service_from_entity(model: ServiceModel) -> Service {
    Service {
        id: model.id,
        name: model.name,
        description: model.description,
        duration_minutes: model.duration_minutes,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn provider_from_entity(model: ProviderModel) -> ServiceProvider {
    ServiceProvider {
        id: model.id,
        user_id: model.user_id,
        phone: model.phone,
        specialization: model.specialization,
    }
}
