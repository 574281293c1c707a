use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(EventId);
id_newtype!(SessionId);
id_newtype!(AttendeeId);

impl AttendeeId {
    /// Fresh client-side id for attendees created locally before the server
    /// has seen them.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Full server-side aggregate for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub id: EventId,
    pub name: String,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl EventDetails {
    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|session| &session.id == session_id)
    }

    pub fn attendee(&self, attendee_id: &AttendeeId) -> Option<&Attendee> {
        self.attendees
            .iter()
            .find(|attendee| &attendee.id == attendee_id)
    }
}

/// Start and end are opaque timestamps as sent by the server; they are
/// compared by value, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub name: String,
    pub email: String,
}

impl Attendee {
    pub fn new(id: AttendeeId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Record carrying only an id, enough for removal.
    pub fn with_id(id: AttendeeId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeAction {
    Add,
    Remove,
}

impl AttendeeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for AttendeeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown attendee action '{0}', expected 'add' or 'remove'")]
pub struct ParseAttendeeActionError(pub String);

impl FromStr for AttendeeAction {
    type Err = ParseAttendeeActionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(ParseAttendeeActionError(value.to_string())),
        }
    }
}
