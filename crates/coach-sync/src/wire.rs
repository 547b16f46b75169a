// wire.rs — JSON bodies for `GET /data` and `POST /data`.

use coach_lifecycle::{CatalogEntry, EngagementRequest, Program};
use coach_policy::{Caller, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Caller> for CurrentUser {
    fn from(caller: &Caller) -> Self {
        Self {
            id: caller.identity.clone(),
            name: caller.name.clone(),
            email: caller.email.clone(),
        }
    }
}

/// Response of `GET /data`, already filtered to what the caller may read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataView {
    pub role: Role,
    pub current_user: CurrentUser,
    #[serde(default)]
    pub requests: Vec<EngagementRequest>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub exercises: Vec<CatalogEntry>,
}

/// Body of `POST /data`. Each present field is a full snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<Vec<EngagementRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<Program>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Vec<CatalogEntry>>,
}

impl PushBody {
    pub fn is_empty(&self) -> bool {
        self.requests.is_none() && self.programs.is_none() && self.exercises.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushResponse {
    pub status: String,
}

impl PushResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_collections_stay_absent() {
        let body: PushBody = serde_json::from_value(json!({ "exercises": [] })).unwrap();
        assert!(body.requests.is_none());
        assert_eq!(body.exercises, Some(Vec::new()));
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "exercises": [] }));
    }

    #[test]
    fn data_view_uses_camel_case() {
        let view = DataView {
            role: Role::Subject,
            current_user: CurrentUser::from(&Caller::subject("S1")),
            requests: Vec::new(),
            programs: Vec::new(),
            exercises: Vec::new(),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["role"], "SUBJECT");
        assert_eq!(value["currentUser"]["id"], "S1");
    }
}
