use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|status|pending]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cmd = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./dewbox.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(db_url);
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        // One step at a time: dropping `accounts` by accident loses every balance.
        "down" => migration::Migrator::down(&db, Some(1)).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        "pending" => {
            for migration in migration::Migrator::get_pending_migrations(&db).await? {
                println!("{}", migration.name());
            }
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
