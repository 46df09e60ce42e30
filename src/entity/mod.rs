pub mod audit_logs;
pub mod dishes;
pub mod order_items;
pub mod orders;
pub mod profiles;
pub mod restaurants;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use dishes::Entity as Dishes;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use profiles::Entity as Profiles;
pub use restaurants::Entity as Restaurants;
pub use users::Entity as Users;
