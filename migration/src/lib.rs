pub use sea_orm_migration::prelude::*;

mod m20260830_000001_create_tvl_points;
mod m20260830_000002_create_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260830_000001_create_tvl_points::Migration),
            Box::new(m20260830_000002_create_alerts::Migration),
        ]
    }
}
