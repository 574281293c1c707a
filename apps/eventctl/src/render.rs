//! Plain-text rendering of controller state for the terminal.

use std::fmt::Write as _;

use client_core::ControllerState;
use shared::domain::{Attendee, EventDetails, Session};

pub fn details(details: &EventDetails, cached: bool) -> String {
    let mut out = String::new();
    let marker = if cached { " (cached)" } else { "" };
    let _ = writeln!(out, "{} [{}]{marker}", details.name, details.id);
    let _ = writeln!(out, "sessions:");
    out.push_str(&sessions(&details.sessions));
    let _ = writeln!(out, "attendees:");
    out.push_str(&attendees(&details.attendees));
    out
}

pub fn sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "  (none)\n".to_string();
    }
    sessions.iter().fold(String::new(), |mut out, session| {
        let _ = writeln!(
            out,
            "  {}  {} -> {}",
            session.id, session.start_time, session.end_time
        );
        out
    })
}

pub fn attendees(attendees: &[Attendee]) -> String {
    if attendees.is_empty() {
        return "  (none)\n".to_string();
    }
    attendees.iter().fold(String::new(), |mut out, attendee| {
        let _ = writeln!(out, "  {}  {} <{}>", attendee.id, attendee.name, attendee.email);
        out
    })
}

/// One-line status with the phase, snapshot version and any error.
pub fn status(state: &ControllerState) -> String {
    let mut out = format!(
        "status: {:?}, version {}",
        state.phase(),
        state.version
    );
    if let Some(error) = &state.error {
        let _ = write!(out, ", error: {error}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{AttendeeId, EventId, SessionId};
    use std::sync::Arc;

    fn sample() -> EventDetails {
        EventDetails {
            id: EventId::from("e1"),
            name: "RustConf".into(),
            sessions: vec![Session {
                id: SessionId::from("s1"),
                start_time: "09:00".into(),
                end_time: "10:00".into(),
            }],
            attendees: Vec::new(),
        }
    }

    #[test]
    fn renders_details_with_cache_marker() {
        let text = details(&sample(), true);
        assert!(text.starts_with("RustConf [e1] (cached)\n"));
        assert!(text.contains("  s1  09:00 -> 10:00\n"));
        assert!(text.ends_with("attendees:\n  (none)\n"));
    }

    #[test]
    fn renders_attendee_lines() {
        let text = attendees(&[Attendee::new(
            AttendeeId::from("a1"),
            "Ann",
            "ann@example.com",
        )]);
        assert_eq!(text, "  a1  Ann <ann@example.com>\n");
    }

    #[test]
    fn status_includes_error() {
        let state = ControllerState {
            details: Some(Arc::new(sample())),
            loading: false,
            error: Some("request failed".into()),
            version: 3,
        };
        assert_eq!(
            status(&state),
            "status: Failed, version 3, error: request failed"
        );
    }
}
