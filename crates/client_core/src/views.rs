//! Derived read views over the current snapshot, memoized per snapshot version.

use std::sync::Arc;

use shared::domain::{Attendee, EventDetails, Session};
use tracing::debug;

/// Sessions whose start timestamp equals `start_time` by value.
pub fn sessions_starting_at(details: &EventDetails, start_time: &str) -> Vec<Session> {
    details
        .sessions
        .iter()
        .filter(|session| session.start_time == start_time)
        .cloned()
        .collect()
}

/// Attendees whose name contains `query`, ignoring case. An empty query
/// matches everyone.
pub fn attendees_matching(details: &EventDetails, query: &str) -> Vec<Attendee> {
    let needle = query.to_lowercase();
    details
        .attendees
        .iter()
        .filter(|attendee| attendee.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

struct Memo<T> {
    version: u64,
    key: String,
    value: Arc<[T]>,
}

fn memoized<T>(
    slot: &mut Option<Memo<T>>,
    view: &'static str,
    version: u64,
    key: &str,
    compute: impl FnOnce() -> Vec<T>,
) -> Arc<[T]> {
    if let Some(memo) = slot {
        if memo.version == version && memo.key == key {
            debug!(view, version, "view cache hit");
            return Arc::clone(&memo.value);
        }
    }
    debug!(view, version, "view cache miss");
    let value: Arc<[T]> = compute().into();
    *slot = Some(Memo {
        version,
        key: key.to_string(),
        value: Arc::clone(&value),
    });
    value
}

/// Last result of each view, keyed by `(snapshot version, argument)`.
#[derive(Default)]
pub(crate) struct ViewCache {
    sessions_by_start: Option<Memo<Session>>,
    attendees_by_name: Option<Memo<Attendee>>,
}

impl ViewCache {
    pub(crate) fn sessions_by_start(
        &mut self,
        snapshot: Option<(&EventDetails, u64)>,
        start_time: &str,
    ) -> Arc<[Session]> {
        let Some((details, version)) = snapshot else {
            return Arc::from(Vec::new());
        };
        memoized(
            &mut self.sessions_by_start,
            "sessions_by_start",
            version,
            start_time,
            || sessions_starting_at(details, start_time),
        )
    }

    pub(crate) fn attendees_by_name(
        &mut self,
        snapshot: Option<(&EventDetails, u64)>,
        query: &str,
    ) -> Arc<[Attendee]> {
        let Some((details, version)) = snapshot else {
            return Arc::from(Vec::new());
        };
        memoized(
            &mut self.attendees_by_name,
            "attendees_by_name",
            version,
            query,
            || attendees_matching(details, query),
        )
    }
}
