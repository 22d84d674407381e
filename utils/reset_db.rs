use sea_orm::{ConnectionTrait, Database, Statement};
use std::env;

/// Dropped in dependency order; the migration ledger goes last.
const TABLES: [&str; 5] = [
    "version_files",
    "files",
    "versions",
    "projects",
    "seaql_migrations",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let db = Database::connect(database_url).await?;
    let backend = db.get_database_backend();

    for table in TABLES {
        db.execute(Statement::from_string(
            backend,
            format!("DROP TABLE IF EXISTS \"{table}\";"),
        ))
        .await?;
        println!("dropped {table}");
    }
    println!("Database reset successfully");
    Ok(())
}
