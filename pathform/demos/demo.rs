//! Serves a typed demo config over HTTP.
//!
//! ```text
//! cargo run --example demo
//! cargo run -- edit --url http://127.0.0.1:5500
//! ```
//!
//! Edits made to `demo-config.json` by hand are picked up while it runs.

use std::{net::SocketAddr, sync::Arc};

use log::info;
use pathform::{ConfigManager, web};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Demo application settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct DemoConfig {
    /// Application name
    app_name: String,
    /// Release version
    version: f32,
    /// Enable debug output
    debug: bool,
    database: Database,
}

/// Database connection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct Database {
    /// Database adapter
    adapter: String,
    host: String,
    /// Listening port
    port: u16,
    username: String,
    password: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            app_name: "demo".into(),
            version: 1.0,
            debug: false,
            database: Database {
                adapter: "postgres".into(),
                host: "localhost".into(),
                port: 5432,
                username: "admin".into(),
                password: "secret".into(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = Arc::new(
        ConfigManager::builder("demo-config.json")
            .backup(true)
            .on_load(|value| info!("Loaded demo config: {value}"))
            .open_or_init(&DemoConfig::default())?,
    );
    manager.on_change("app_name", |old, new| {
        info!("app_name changed from {old} to {new}");
    });
    manager.on_change("database.port", |old, new| {
        info!("database port changed from {old} to {new}");
    });
    #[cfg(unix)]
    manager.handle_sighup()?;
    let _watcher = manager.watch_file()?;

    let addr = SocketAddr::from(([127, 0, 0, 1], 5500));
    web::serve(manager, addr).await
}
