use serde::Serialize;
use tokio::sync::Mutex;
use uesp_logger_embedded::{ParsedLine, TagSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPoint {
    pub measurement: String,
    pub tags: TagSet,
    pub field: String,
    pub value: f32,
}

impl From<ParsedLine> for StoredPoint {
    fn from(line: ParsedLine) -> Self {
        Self {
            measurement: line.measurement,
            tags: line.tags,
            field: line.field,
            value: line.value,
        }
    }
}

/// Points accepted since startup, in arrival order.
#[derive(Debug, Default)]
pub struct PointStore {
    points: Mutex<Vec<StoredPoint>>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, points: Vec<StoredPoint>) {
        self.points.lock().await.extend(points);
    }

    pub async fn points(&self) -> Vec<StoredPoint> {
        self.points.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.points.lock().await.clear();
    }
}
