use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app::create_app;
use crate::settings::Settings;
use crate::store::PointStore;

pub mod app;
pub mod errors;
pub mod handles;
pub mod settings;
pub mod store;

/// Default `EnvFilter` directives when `RUST_LOG` is unset: this crate and
/// the request traces both log at the configured level.
pub fn default_log_filter(settings: &Settings) -> String {
    let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
    let level = settings.logger.level.as_str();

    format!("{app_name}={level},tower_http={level}")
}

pub async fn run(settings: &Arc<Settings>) -> Result<(), Box<dyn Error>> {
    let app = create_app(settings, Arc::new(PointStore::new()));

    let ip_addr = settings.server.host.parse::<IpAddr>()?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
