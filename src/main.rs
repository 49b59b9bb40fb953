use std::error::Error;

use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // `.env` is optional; deployments usually inject variables directly.
    let dotenv = dotenvy::dotenv();

    ai_llm_service::telemetry::init("info");

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => info!("no .env file, using process environment"),
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = api::start().await {
        error!(error = %e, "study API failed");
        return Err(e.into());
    }

    Ok(())
}
