//! Tagged result envelope handed to UI/IPC callers.

use serde::Serialize;

use crate::model::Tab;

use super::error::{ErrorKind, TabError};

/// `{"success": true, ...data}` or `{"success": false, "error": "...", "kind": "..."}`.
#[derive(Debug, Serialize)]
pub struct Response<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn failure(err: &TabError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        }
    }
}

impl<T> From<Result<T, TabError>> for Response<T> {
    fn from(result: Result<T, TabError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

/// Payload of a successful `create_tab`.
#[derive(Debug, Serialize)]
pub struct CreatedTab {
    pub tab: Tab,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::Entity;

    #[test]
    fn unit_success_is_just_the_flag() {
        let resp: Response<()> = Ok(()).into();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }

    #[test]
    fn failure_carries_message_and_kind() {
        let resp: Response<()> = Err(TabError::not_found(Entity::Tab, "abc")).into();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Tab not found: abc");
        assert_eq!(json["kind"], "not_found");
    }

    #[test]
    fn data_fields_are_flattened() {
        #[derive(Serialize)]
        struct Payload {
            count: usize,
        }
        let json = serde_json::to_value(Response::ok(Payload { count: 3 })).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "count": 3 }));
    }
}
