//! State controller for a single event aggregate: fetch/refresh, mutations
//! followed by a resynchronizing fetch, and memoized derived views.

use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::Result as AnyResult;
use futures::FutureExt;
use shared::{
    domain::{Attendee, AttendeeAction, AttendeeId, EventDetails, EventId, Session, SessionId},
    protocol::UpdateSessionTimesRequest,
};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::{
    config::ApiConfig,
    error::ControllerError,
    transport::{EventApi, HttpEventApi},
    views::ViewCache,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Read state exposed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub details: Option<Arc<EventDetails>>,
    pub loading: bool,
    pub error: Option<String>,
    /// Snapshot identity; bumped on every successful fetch, 0 before the first.
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl ControllerState {
    pub fn phase(&self) -> ControllerPhase {
        if self.loading {
            ControllerPhase::Loading
        } else if self.error.is_some() {
            ControllerPhase::Failed
        } else if self.details.is_some() {
            ControllerPhase::Ready
        } else {
            ControllerPhase::Idle
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    LoadingChanged(bool),
    SnapshotReplaced { version: u64 },
    Error(String),
}

#[derive(Default)]
struct ControllerInner {
    details: Option<Arc<EventDetails>>,
    error: Option<String>,
    version: u64,
    in_flight: usize,
}

pub struct EventStateController {
    api: Arc<dyn EventApi>,
    event_id: EventId,
    inner: Mutex<ControllerInner>,
    fetch_gate: AsyncMutex<()>,
    views: Mutex<ViewCache>,
    events: broadcast::Sender<ControllerEvent>,
}

/// Keeps `loading` raised while alive. Dropping it, whether the operation
/// finished, failed, panicked or was cancelled, lowers the flag again.
struct InFlight<'a> {
    controller: &'a EventStateController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut inner = self.controller.inner();
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.in_flight == 0
        };
        if idle {
            self.controller.emit(ControllerEvent::LoadingChanged(false));
        }
    }
}

impl EventStateController {
    /// Idle controller: nothing loaded, nothing in flight.
    pub fn new(api: Arc<dyn EventApi>, event_id: impl Into<EventId>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            event_id: event_id.into(),
            inner: Mutex::new(ControllerInner::default()),
            fetch_gate: AsyncMutex::new(()),
            views: Mutex::new(ViewCache::default()),
            events,
        })
    }

    /// Builds the controller and runs the initial fetch. A failed initial
    /// fetch is reported through `state().error`, not as an `Err`.
    pub async fn open(api: Arc<dyn EventApi>, event_id: impl Into<EventId>) -> Arc<Self> {
        let controller = Self::new(api, event_id);
        let _ = controller.fetch_event_details().await;
        controller
    }

    pub async fn open_http(config: ApiConfig, event_id: impl Into<EventId>) -> AnyResult<Arc<Self>> {
        let api = HttpEventApi::new(config)?;
        Ok(Self::open(Arc::new(api), event_id).await)
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        let inner = self.inner();
        ControllerState {
            details: inner.details.clone(),
            loading: inner.in_flight > 0,
            error: inner.error.clone(),
            version: inner.version,
        }
    }

    pub fn details(&self) -> Option<Arc<EventDetails>> {
        self.inner().details.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.inner().error.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner().version
    }

    /// Replaces the snapshot with `GET /events/{id}`. On failure the previous
    /// snapshot stays in place and `error` is set.
    pub async fn fetch_event_details(&self) -> Result<(), ControllerError> {
        let _loading = self.begin("fetch_event_details");
        self.resync().await
    }

    /// Sends new times for a session, then refetches. The snapshot is never
    /// patched locally; the new times show up once the refetch lands.
    pub async fn update_session_times(
        &self,
        session_id: &SessionId,
        start_time: &str,
        end_time: &str,
    ) -> Result<(), ControllerError> {
        let operation = "update_session_times";
        let _loading = self.begin(operation);
        let request = UpdateSessionTimesRequest::new(start_time, end_time);
        info!(
            event_id = %self.event_id,
            session_id = %session_id,
            start_time,
            end_time,
            "updating session times"
        );
        self.mutate(operation, self.api.update_session(session_id, &request))
            .await
    }

    /// `Add` posts the full record; `Remove` only uses `attendee.id`.
    pub async fn manage_attendee_list(
        &self,
        action: AttendeeAction,
        attendee: &Attendee,
    ) -> Result<(), ControllerError> {
        let operation = match action {
            AttendeeAction::Add => "add_attendee",
            AttendeeAction::Remove => "remove_attendee",
        };
        let _loading = self.begin(operation);
        info!(event_id = %self.event_id, attendee_id = %attendee.id, %action, "updating attendee list");
        let request = async {
            match action {
                AttendeeAction::Add => self.api.add_attendee(&self.event_id, attendee).await,
                AttendeeAction::Remove => {
                    self.api
                        .remove_attendee(&self.event_id, &attendee.id)
                        .await
                }
            }
        };
        self.mutate(operation, request).await
    }

    pub async fn add_attendee(&self, attendee: &Attendee) -> Result<(), ControllerError> {
        self.manage_attendee_list(AttendeeAction::Add, attendee)
            .await
    }

    pub async fn remove_attendee(&self, attendee_id: &AttendeeId) -> Result<(), ControllerError> {
        let attendee = Attendee::with_id(attendee_id.clone());
        self.manage_attendee_list(AttendeeAction::Remove, &attendee)
            .await
    }

    /// Sessions of the current snapshot starting exactly at `start_time`.
    pub fn filter_sessions_by_time(&self, start_time: &str) -> Arc<[Session]> {
        let snapshot = self.snapshot();
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.sessions_by_start(
            snapshot.as_ref().map(|(details, version)| (details.as_ref(), *version)),
            start_time,
        )
    }

    /// Attendees of the current snapshot whose name contains `query`,
    /// case-insensitively.
    pub fn search_attendees_by_name(&self, query: &str) -> Arc<[Attendee]> {
        let snapshot = self.snapshot();
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.attendees_by_name(
            snapshot.as_ref().map(|(details, version)| (details.as_ref(), *version)),
            query,
        )
    }

    fn inner(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Option<(Arc<EventDetails>, u64)> {
        let inner = self.inner();
        inner
            .details
            .as_ref()
            .map(|details| (Arc::clone(details), inner.version))
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    /// Starts an operation: raises `loading` and clears the previous error.
    fn begin(&self, operation: &'static str) -> InFlight<'_> {
        let first = {
            let mut inner = self.inner();
            inner.in_flight += 1;
            inner.error = None;
            inner.in_flight == 1
        };
        if first {
            self.emit(ControllerEvent::LoadingChanged(true));
        }
        debug!(event_id = %self.event_id, operation, "operation started");
        InFlight { controller: self }
    }

    async fn mutate<F>(&self, operation: &'static str, request: F) -> Result<(), ControllerError>
    where
        F: Future<Output = AnyResult<()>>,
    {
        if let Err(err) = call_api(request).await {
            self.fail(operation, &err);
            return Err(err);
        }
        info!(event_id = %self.event_id, operation, "mutation accepted, resynchronizing");
        self.resync().await
    }

    /// Fetches are serialized per controller so snapshots land in request order.
    async fn resync(&self) -> Result<(), ControllerError> {
        let _gate = self.fetch_gate.lock().await;
        match call_api(self.api.fetch_event(&self.event_id)).await {
            Ok(details) => {
                let version = {
                    let mut inner = self.inner();
                    inner.details = Some(Arc::new(details));
                    inner.version += 1;
                    inner.version
                };
                info!(event_id = %self.event_id, version, "event snapshot replaced");
                self.emit(ControllerEvent::SnapshotReplaced { version });
                Ok(())
            }
            Err(err) => {
                self.fail("fetch_event_details", &err);
                Err(err)
            }
        }
    }

    fn fail(&self, operation: &'static str, err: &ControllerError) {
        let message = err.message();
        warn!(
            event_id = %self.event_id,
            operation,
            status = err.status(),
            error = %message,
            "event operation failed"
        );
        self.inner().error = Some(message.clone());
        self.emit(ControllerEvent::Error(message));
    }
}

/// Runs one API call, turning both errors and panics into `ControllerError`.
async fn call_api<T, F>(request: F) -> Result<T, ControllerError>
where
    F: Future<Output = AnyResult<T>>,
{
    match AssertUnwindSafe(request).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ControllerError::from(err)),
        Err(_panic) => Err(ControllerError::Unexpected),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
