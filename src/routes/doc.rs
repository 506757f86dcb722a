use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bookings::{BookingList, BookingView, CreateBookingRequest, RescheduleBookingRequest},
        catalog::{AvailabilityData, ProviderList, ServiceList},
        reviews::{ReviewList, UpsertReviewRequest},
    },
    models::{Booking, Customer, Review, Service, ServiceProvider, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, bookings, health, params, providers, services},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        services::list_services,
        services::service_reviews,
        providers::list_providers,
        providers::provider_availability,
        bookings::list_bookings,
        bookings::create_booking,
        bookings::get_booking,
        bookings::reschedule_booking,
        bookings::delete_booking,
        bookings::upsert_review,
        admin::list_all_bookings
    ),
    components(
        schemas(
            User,
            Customer,
            ServiceProvider,
            Service,
            Booking,
            Review,
            BookingView,
            BookingList,
            CreateBookingRequest,
            RescheduleBookingRequest,
            UpsertReviewRequest,
            ReviewList,
            ServiceList,
            ProviderList,
            AvailabilityData,
            params::Pagination,
            params::ProviderQuery,
            params::BookingListQuery,
            Meta,
            ApiResponse<BookingView>,
            ApiResponse<BookingList>,
            ApiResponse<Review>,
            ApiResponse<ServiceList>,
            ApiResponse<ProviderList>,
            ApiResponse<AvailabilityData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Services", description = "Service catalog endpoints"),
        (name = "Providers", description = "Service provider endpoints"),
        (name = "Bookings", description = "Booking and review endpoints"),
        (name = "Admin", description = "Staff endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
