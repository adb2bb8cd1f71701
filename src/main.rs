/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use anyhow::Result;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use txstats::config::ServiceConfig;
use txstats::TxStats;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let config = match args.as_slice() {
        [_] => {
            info!("No config file given, using defaults");
            ServiceConfig::default()
        }
        [_, path] => {
            let config_path = PathBuf::from(path);
            info!("Starting txstats with config: {}", config_path.display());
            ServiceConfig::from_file(&config_path)?
        }
        _ => {
            eprintln!("Usage: txstats [config-file]");
            std::process::exit(1);
        }
    };
    info!("Configuration loaded successfully");

    let service = TxStats::new(config)?;

    // Start all services
    let addr = service.start().await?;
    info!(%addr, "txstats started successfully");

    // Wait for shutdown signal
    service.wait_for_shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
