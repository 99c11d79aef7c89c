pub use sea_orm_migration::prelude::*;

mod m20260612_000000_init;
mod m20260903_120000_gateway_references;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260612_000000_init::Migration),
            Box::new(m20260903_120000_gateway_references::Migration),
        ]
    }
}
