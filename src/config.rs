use crate::schemas::AppState;
use anyhow::Result;
use sea_orm::Database;

/// Connect to the database and build the shared application state.
///
/// The URL comes from the CLI, which already folds in `DATABASE_URL` and the
/// `.env` file loaded at startup.
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState::new(db))
}
