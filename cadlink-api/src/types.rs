//! Request and response bodies of the CAD API.

use cadlink_core::BomLineInput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Uniform response body of every CAD API operation.
///
/// Successful calls carry the id of the record they produced; failed calls
/// carry a human-readable error. Errors never escape in any other shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SyncResponse {
    pub success: bool,

    /// Id of the component or BOM that was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn success(id: Uuid) -> Self {
        Self {
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Body of `POST /cad_api/bom`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubmitBomRequest {
    /// External id of the assembly the BOM belongs to
    #[serde(default)]
    pub parent_id: String,

    /// Child lines; unknown children are skipped
    #[serde(default)]
    pub components: Vec<BomLineInput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_omits_error() {
        let id = Uuid::now_v7();
        let value = serde_json::to_value(SyncResponse::success(id)).unwrap();
        assert_eq!(value, json!({ "success": true, "id": id }));
    }

    #[test]
    fn test_failure_envelope_omits_id() {
        let value = serde_json::to_value(SyncResponse::failure("boom")).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "boom" }));
    }

    #[test]
    fn test_bom_request_defaults() {
        let request: SubmitBomRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.parent_id.is_empty());
        assert!(request.components.is_empty());

        let request: SubmitBomRequest = serde_json::from_value(json!({
            "parent_id": "ASSEMBLY_1",
            "components": [{ "external_id": "CHILD_1", "quantity": 2.0 }]
        }))
        .unwrap();
        assert_eq!(request.components, vec![BomLineInput::new("CHILD_1", 2.0)]);
    }
}
