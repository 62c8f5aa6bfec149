use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to a resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    Member,
    Moderator,
}

impl Role {
    pub fn can_contribute(&self) -> bool {
        matches!(self, Role::Member | Role::Moderator)
    }

    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Moderator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Member => "member",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity performing an operation, as handed over by the identity provider.
///
/// Never built from client-supplied body fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<String>,
    pub display_name: String,
    pub role: Role,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            display_name: "anonymous".to_string(),
            role: Role::Anonymous,
        }
    }

    pub fn member(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            display_name: display_name.into(),
            role: Role::Member,
        }
    }

    pub fn moderator(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            display_name: display_name.into(),
            role: Role::Moderator,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.role == Role::Anonymous || self.id.is_none()
    }

    /// Identifier used in logs; anonymous actors have none.
    pub fn log_id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}
