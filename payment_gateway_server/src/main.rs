use dotenvy::dotenv;
use log::{error, info};
use payment_gateway_server::{cli::print_usage_if_requested, config::ServerConfig, server::run_server};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if print_usage_if_requested() {
        return;
    }
    let config = ServerConfig::from_env_or_default();
    if config.gateway_test_mode {
        info!("🚀️ Payment gateway starting in test mode for {}", config.stub_methods.join(", "));
    } else {
        info!("🚀️ Payment gateway starting without any settlement rails");
    }
    // stdout carries outcomes, so the exit status goes to the log
    if let Err(e) = run_server(config).await {
        error!("🚀️ Payment gateway stopped. {e}");
        std::process::exit(1);
    }
    info!("🚀️ Payment gateway stopped");
}
