use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};

use uesp_logger_mock::app::create_app;
use uesp_logger_mock::settings::{InfluxDb, Logger, Server, Settings};
use uesp_logger_mock::store::PointStore;

pub struct MockApp {
    pub router: Router,
    pub store: Arc<PointStore>,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with_forced_status(None)
    }

    pub fn with_forced_status(forced_status: Option<u16>) -> Self {
        let settings = Arc::new(Settings {
            logger: Logger {
                level: String::from("debug"),
            },
            server: Server {
                host: String::from("127.0.0.1"),
                port: 0,
            },
            influxdb: InfluxDb {
                database: String::from("sensors"),
                username: String::from("logger"),
                password: String::from("hunter2"),
                forced_status,
            },
        });
        let store = Arc::new(PointStore::new());

        Self {
            router: create_app(&settings, store.clone()),
            store,
        }
    }
}

pub fn write_request(query: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/write?{query}"))
        .method(Method::POST)
        .header("Content-Type", "application/octet-stream")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub const CREDENTIALS: &str = "db=sensors&u=logger&p=hunter2";
