//! One-shot tool that installs the frontend-upload CORS rule on a B2 bucket,
//! via the b2 CLI when one is installed, else the native HTTP API.

use std::env;

use corsotron::config::{load_config, print_schema};
use corsotron::updater;
use corsotron::utils::logger::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if env::args().any(|arg| arg == "--schema") {
        print_schema();
        return;
    }

    let config = load_config();
    init_logging(&config.logging);

    match updater::run(&config).await {
        Ok(outcome) => {
            info!("Bucket CORS rules updated via {}", outcome);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
