//! Response contract for the save operation.

use serde::{Deserialize, Serialize};

/// The single response shape: a success flag plus, on failure, the
/// canonical diagnostic message. Exactly one of the two forms, never
/// partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SaveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_without_message() {
        let body = serde_json::to_string(&SaveResponse::ok()).unwrap();
        assert_eq!(body, "{\"success\":true}");
    }

    #[test]
    fn failure_always_carries_a_message() {
        let response = SaveResponse::failure("unknown platform");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("unknown platform"));
    }
}
