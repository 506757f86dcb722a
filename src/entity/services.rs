use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub price: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bookings::Entity")]
    Bookings,
    #[sea_orm(has_many = "super::provider_services::Entity")]
    ProviderServices,
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::service_providers::Entity> for Entity {
    fn to() -> RelationDef {
        super::provider_services::Relation::ServiceProviders.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::provider_services::Relation::Services.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
