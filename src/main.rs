use skybell::app::Application;
use skybell::config::Settings;
use skybell::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    skybell::logging::init(&settings.log).map_err(|e| AppError::Logging(e.to_string()))?;

    let app = Application::from_settings(settings)?;
    app.run_until_signal().await
}
