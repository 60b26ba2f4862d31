use finetune_admin::application::TrainingFileExporter;
use finetune_admin::infrastructure::config::Settings;
use finetune_admin::infrastructure::db::connection::Database;
use finetune_admin::infrastructure::openai::OpenAiClient;
use finetune_admin::interfaces::http::{start_server, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let settings = Settings::load()?;

    let db = Database::connect(&settings.database_path).await?;

    let exporter = Arc::new(TrainingFileExporter::new(&db, settings.export_dir.clone()));
    let provider = Arc::new(OpenAiClient::new(
        settings.openai_api_key.clone(),
        settings.openai_base_url.clone(),
    ));

    let state = Arc::new(AppState::new(
        &db,
        exporter,
        provider,
        settings.auth_token.clone(),
    ));

    info!(
        host = %settings.http_host,
        port = settings.http_port,
        "Starting fine-tune admin server"
    );

    start_server(state, &settings.http_host, settings.http_port)?.await?;

    Ok(())
}
