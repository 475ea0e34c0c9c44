//! Inbound payloads from the design tool and their validated forms.

use crate::{
    CadlinkError, CadlinkResult, ComponentKind, FamilyId, Timestamp,
};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Component description as submitted by the design tool.
///
/// Every field is optional at the wire level so that missing required
/// fields surface as validation failures instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentPayload {
    pub external_id: Option<String>,
    pub configuration_name: Option<String>,
    pub name: Option<String>,
    /// `part` (alias `component`) or `assembly`
    pub component_kind: Option<String>,
    pub version: Option<String>,
    pub version_identifier: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC)
    pub last_modified: Option<String>,
    /// JSON object of parameter name to scalar value, inline or JSON-encoded
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub configuration_values: Option<Value>,
    /// Existing product family to attach to instead of creating one
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub family_id: Option<FamilyId>,
    /// External ids of sub-components to place under this one
    #[serde(default)]
    pub children: Vec<String>,
}

impl ComponentPayload {
    /// Check required fields and decode the configuration.
    pub fn validate(&self) -> CadlinkResult<ComponentSpec> {
        let external_id = required_text("external_id", &self.external_id)?;
        let name = required_text("name", &self.name)?;
        let version_identifier = required_text("version_identifier", &self.version_identifier)?;

        let kind_raw = required_text("component_kind", &self.component_kind)?;
        let kind = kind_raw
            .parse::<ComponentKind>()
            .map_err(|reason| CadlinkError::invalid("component_kind", reason))?;

        let last_modified_raw = required_text("last_modified", &self.last_modified)?;
        let last_modified = parse_timestamp(&last_modified_raw)?;

        let configuration_name = self
            .configuration_name
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let (configuration, configuration_raw) = match &self.configuration_values {
            None => (None, None),
            Some(value) => {
                let parsed = ConfigurationValues::parse(value)?;
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (Some(parsed), Some(raw))
            }
        };

        let children = self
            .children
            .iter()
            .map(|c| c.trim().to_string())
            .collect::<Vec<_>>();
        if children.iter().any(|c| c.is_empty()) {
            return Err(CadlinkError::invalid("children", "child external id is empty"));
        }

        Ok(ComponentSpec {
            external_id,
            configuration_name,
            name,
            kind,
            version: self.version.clone(),
            version_identifier,
            last_modified,
            configuration,
            configuration_raw,
            family_id: self.family_id,
            children,
        })
    }
}

/// A component payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    pub external_id: String,
    pub configuration_name: Option<String>,
    pub name: String,
    pub kind: ComponentKind,
    pub version: Option<String>,
    pub version_identifier: String,
    pub last_modified: Timestamp,
    pub configuration: Option<ConfigurationValues>,
    pub configuration_raw: Option<String>,
    pub family_id: Option<FamilyId>,
    pub children: Vec<String>,
}

/// Decoded CAD configuration: parameter name to stringified value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationValues(BTreeMap<String, String>);

impl ConfigurationValues {
    /// Decode from an inline JSON object or a JSON-encoded string holding one.
    pub fn parse(value: &Value) -> CadlinkResult<Self> {
        let decoded;
        let object = match value {
            Value::String(raw) => {
                decoded = serde_json::from_str::<Value>(raw)
                    .map_err(|e| CadlinkError::malformed(e.to_string()))?;
                &decoded
            }
            other => other,
        };

        let map = object
            .as_object()
            .ok_or_else(|| CadlinkError::malformed("expected a JSON object"))?;

        let mut values = BTreeMap::new();
        for (key, value) in map {
            if key.trim().is_empty() {
                return Err(CadlinkError::malformed("empty parameter name"));
            }
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(CadlinkError::malformed(format!(
                        "parameter '{}' is not a scalar",
                        key
                    )))
                }
            };
            values.insert(key.clone(), text);
        }
        Ok(Self(values))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.0.get(parameter).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigurationValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One requested BOM line: child external id and quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BomLineInput {
    pub external_id: String,
    pub quantity: f64,
}

impl BomLineInput {
    pub fn new(external_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            external_id: external_id.into(),
            quantity,
        }
    }
}

fn required_text(field: &str, value: &Option<String>) -> CadlinkResult<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(CadlinkError::required(field)),
    }
}

fn parse_timestamp(raw: &str) -> CadlinkResult<Timestamp> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(CadlinkError::invalid(
        "last_modified",
        format!("unrecognized timestamp '{}'", raw),
    ))
}
