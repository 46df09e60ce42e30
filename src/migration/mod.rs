pub use sea_orm_migration::prelude::*;

mod m20250301_000001_identity;
mod m20250301_000002_catalog;
mod m20250301_000003_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_identity::Migration),
            Box::new(m20250301_000002_catalog::Migration),
            Box::new(m20250301_000003_orders::Migration),
        ]
    }
}
