// role.rs — Roles and resolved callers.
//
// The HTTP/session layer authenticates the request; this module only holds
// what it hands over: which role the account plays and its identity token.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// The two roles in a coaching engagement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Prices requests, approves payments, authors programs, owns the catalog.
    Authority,
    /// Requests, pays for, and receives a program.
    Subject,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Authority => write!(f, "authority"),
            Role::Subject => write!(f, "subject"),
        }
    }
}

impl FromStr for Role {
    type Err = PolicyError;

    /// Accepts the canonical names plus the trainer/student aliases used by
    /// older account exports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authority" | "trainer" => Ok(Role::Authority),
            "subject" | "student" => Ok(Role::Subject),
            other => Err(PolicyError::UnknownRole(other.to_string())),
        }
    }
}

/// An authenticated caller as seen by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
    /// Stable per-account token. Subject-owned records carry it in their
    /// ownership field.
    pub identity: String,
    pub name: String,
    pub email: String,
}

impl Caller {
    pub fn new(
        role: Role,
        identity: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(PolicyError::EmptyIdentity);
        }
        Ok(Self {
            role,
            identity,
            name: name.into(),
            email: email.into(),
        })
    }

    /// Shorthand for an authority caller.
    pub fn authority(identity: impl Into<String>) -> Self {
        Self {
            role: Role::Authority,
            identity: identity.into(),
            name: String::new(),
            email: String::new(),
        }
    }

    /// Shorthand for a subject caller.
    pub fn subject(identity: impl Into<String>) -> Self {
        Self {
            role: Role::Subject,
            identity: identity.into(),
            name: String::new(),
            email: String::new(),
        }
    }

    pub fn is_authority(&self) -> bool {
        self.role == Role::Authority
    }
}
