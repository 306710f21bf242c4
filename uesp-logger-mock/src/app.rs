use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handles::{WriteState, clear_points, get_points, write_points};
use crate::settings::Settings;
use crate::store::PointStore;

pub fn create_app(settings: &Arc<Settings>, store: Arc<PointStore>) -> Router {
    Router::new()
        .route("/write", post(write_points))
        .route("/points", get(get_points).delete(clear_points))
        .with_state(WriteState {
            influxdb: Arc::new(settings.influxdb.clone()),
            store,
        })
        .layer(TraceLayer::new_for_http())
}
