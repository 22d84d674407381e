use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use docport::config::{Config, StorageConfig};
use docport::logging;
use docport::routes::create_routes;
use docport::state::AppState;
use docport::storage::{self, ObjectInfo, StorageError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "docport", version, about = "Document hosting for projects and versions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations and run the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// List the blobs stored under a key
    Ls {
        /// Storage key to list, empty for the root
        #[arg(default_value = "")]
        root: String,
        /// Include blobs in nested directories
        #[arg(short, long)]
        recursive: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "docport exited with an error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(Config::from_env()?).await,
        Command::Migrate => {
            let db = connect(&Config::from_env()?).await?;
            Migrator::up(&db, None).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::Ls { root, recursive } => ls(&StorageConfig::from_env()?, &root, recursive).await,
    }
}

async fn connect(config: &Config) -> Result<DatabaseConnection, BoxError> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    tracing::info!("connected to database");
    Ok(db)
}

async fn serve(config: Config) -> Result<(), BoxError> {
    let db = connect(&config).await?;
    Migrator::up(&db, None).await?;

    let storage = storage::from_config(&config.storage).await?;
    let state = AppState::new(db, storage, config.max_upload_size);
    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn ls(config: &StorageConfig, root: &str, recursive: bool) -> Result<(), BoxError> {
    let storage = storage::from_config(config).await?;

    let print = |info: &ObjectInfo| println!("{:>12}  {}", info.size, info.path);
    if recursive {
        let mut visit = |info: ObjectInfo| -> Result<(), StorageError> {
            print(&info);
            Ok(())
        };
        storage.walk(root, &mut visit).await?;
    } else {
        for info in storage.list(root).await? {
            print(&info);
        }
    }
    Ok(())
}
