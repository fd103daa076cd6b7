//! Shared vocabulary for the connection workflow engine.
//!
//! Every other crate in the workspace speaks in these types: opaque string
//! identifiers, the two independent state enums (negotiation stage and
//! administrative status), the opaque negotiation payload, and the closed
//! role set used by the access gate.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identity of one connection aggregate.
    ConnectionId
);
string_id!(
    /// A buyer or supplier profile.
    ProfileId
);
string_id!(
    /// Reference to the matched buyer/supplier pair that produced the introduction.
    MatchId
);
string_id!(
    /// An authenticated caller, as known to the external identity store.
    SubjectId
);

impl ConnectionId {
    /// Mint a fresh id. Ids are generated at the service boundary and passed
    /// into the aggregate, never inside it.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Locale of the introduction message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Fr,
    En,
}

impl Locale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "fr" => Some(Locale::Fr),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::En => "en",
        }
    }
}

/// Negotiation-progress state of a connection.
///
/// The declaration order is the canonical forward path. The stage machine
/// does not enforce it: backward and skipped transitions are accepted so the
/// orchestration layer can apply administrative corrections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intro,
    Reply,
    Meeting,
    Review,
    Deal,
}

impl Stage {
    /// Canonical forward path, in order.
    pub const ALL: [Stage; 5] = [
        Stage::Intro,
        Stage::Reply,
        Stage::Meeting,
        Stage::Review,
        Stage::Deal,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "intro" => Some(Stage::Intro),
            "reply" => Some(Stage::Reply),
            "meeting" => Some(Stage::Meeting),
            "review" => Some(Stage::Review),
            "deal" => Some(Stage::Deal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Reply => "reply",
            Stage::Meeting => "meeting",
            Stage::Review => "review",
            Stage::Deal => "deal",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative lifecycle state of a connection, independent of stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Pending,
    InDiscussion,
    Completed,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InDiscussion,
        Status::Completed,
        Status::Closed,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Status::Pending),
            "inDiscussion" => Some(Status::InDiscussion),
            "completed" => Some(Status::Completed),
            "closed" => Some(Status::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InDiscussion => "inDiscussion",
            Status::Completed => "completed",
            Status::Closed => "closed",
        }
    }

    /// Conventionally terminal states. The status machine does not hard-block
    /// transitions out of them; callers needing terminality enforce it above.
    pub fn is_settled(&self) -> bool {
        matches!(self, Status::Completed | Status::Closed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form negotiation documents attached to a connection.
///
/// Opaque at this layer: downstream consumers interpret the shape, the
/// engine only carries the values through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NegotiationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logistics_plan: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_proposal: Option<serde_json::Value>,
}

impl NegotiationPayload {
    pub fn is_empty(&self) -> bool {
        self.attachments.is_none()
            && self.logistics_plan.is_none()
            && self.meeting_proposal.is_none()
    }
}

/// Raw role descriptor as fetched from the external identity store.
///
/// `kind` and `name` are free strings there; the closed [`Role`] set is
/// derived from them in one adapter inside the access crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub kind: String,
    pub name: String,
}

impl RoleDescriptor {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Closed role set used for authorization decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Unknown,
}

impl Role {
    /// Only owners and admins may reach privileged read endpoints.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}
