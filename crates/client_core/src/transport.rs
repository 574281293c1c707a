//! HTTP seam between the controller and the remote Event API.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    domain::{Attendee, AttendeeId, EventDetails, EventId, SessionId},
    protocol::UpdateSessionTimesRequest,
};
use tracing::debug;

use crate::{config::ApiConfig, error::ControllerError};

#[async_trait]
pub trait EventApi: Send + Sync {
    async fn fetch_event(&self, event_id: &EventId) -> Result<EventDetails>;
    async fn update_session(
        &self,
        session_id: &SessionId,
        request: &UpdateSessionTimesRequest,
    ) -> Result<()>;
    async fn add_attendee(&self, event_id: &EventId, attendee: &Attendee) -> Result<()>;
    async fn remove_attendee(&self, event_id: &EventId, attendee_id: &AttendeeId) -> Result<()>;
}

pub struct HttpEventApi {
    http: Client,
    config: ApiConfig,
}

impl HttpEventApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, config })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(ControllerError::from)?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "event api response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ControllerError::from_response(status.as_u16(), &body).into())
    }
}

#[async_trait]
impl EventApi for HttpEventApi {
    async fn fetch_event(&self, event_id: &EventId) -> Result<EventDetails> {
        let url = self.config.endpoint(&["events", event_id.as_str()]);
        let response = self.send(self.http.get(url)).await?;
        let body = response.bytes().await.map_err(ControllerError::from)?;
        let details = serde_json::from_slice(&body).map_err(ControllerError::from)?;
        Ok(details)
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        request: &UpdateSessionTimesRequest,
    ) -> Result<()> {
        let url = self.config.endpoint(&["sessions", session_id.as_str()]);
        self.send(self.http.put(url).json(request)).await?;
        Ok(())
    }

    async fn add_attendee(&self, event_id: &EventId, attendee: &Attendee) -> Result<()> {
        let url = self
            .config
            .endpoint(&["events", event_id.as_str(), "attendees"]);
        self.send(self.http.post(url).json(attendee)).await?;
        Ok(())
    }

    async fn remove_attendee(&self, event_id: &EventId, attendee_id: &AttendeeId) -> Result<()> {
        let url = self.config.endpoint(&[
            "events",
            event_id.as_str(),
            "attendees",
            attendee_id.as_str(),
        ]);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
