pub mod administrators;
pub mod audit_logs;
pub mod bookings;
pub mod customers;
pub mod managers;
pub mod provider_services;
pub mod reviews;
pub mod service_providers;
pub mod services;
pub mod users;

pub use administrators::Entity as Administrators;
pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use customers::Entity as Customers;
pub use managers::Entity as Managers;
pub use provider_services::Entity as ProviderServices;
pub use reviews::Entity as Reviews;
pub use service_providers::Entity as ServiceProviders;
pub use services::Entity as Services;
pub use users::Entity as Users;
