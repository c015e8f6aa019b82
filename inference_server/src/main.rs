use anyhow::{Context, Result};
use fish_core::config::ServerConfig;
use fish_core::logger::init_logger;
use inference_server::engine::Predictor;
use inference_server::model::LoadOptions;
use inference_server::server::Server;
use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = ServerConfig::from_env().context("Failed to load server configuration")?;
    info!("🚀Starting fish price inference server with {:?}", config);

    let options = LoadOptions {
        onnx_threads: config.onnx_threads,
    };
    // No model, no service: artifact errors abort startup.
    let predictor = Predictor::load(&config.model_path, &options)
        .with_context(|| format!("Cannot serve without a model ({})", config.model_path.display()))?;

    let server = Server::init(Arc::new(predictor), config.request_timeout());
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Cannot bind {}", config.bind_addr()))?;

    server.run(listener, shutdown_signal()).await?;

    info!("Inference server has been shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, initiating graceful shutdown"),
        Err(e) => {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
