use serde::{Deserialize, Serialize};

/// Body of `PUT /sessions/{sessionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionTimesRequest {
    pub start_time: String,
    pub end_time: String,
}

impl UpdateSessionTimesRequest {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}
