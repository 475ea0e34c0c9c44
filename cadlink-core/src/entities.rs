//! Catalog record structures

use crate::{
    AttributeId, AttributeValueId, BomId, BomLineId, BomType, ComponentId, ComponentKind,
    ComponentSpec, EntityIdType, FamilyId, TenantId, Timestamp, VariantId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every attribute generated from a CAD parameter.
pub const EXTERNAL_ATTRIBUTE_PREFIX: &str = "CAD: ";

/// Idempotency key of a component: `(external_id, configuration_name, tenant)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    pub external_id: String,
    pub configuration_name: Option<String>,
    pub tenant_id: Option<TenantId>,
}

impl ComponentKey {
    pub fn new(
        external_id: impl Into<String>,
        configuration_name: Option<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            configuration_name,
            tenant_id,
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.external_id)?;
        if let Some(config) = &self.configuration_name {
            write!(f, "[{}]", config)?;
        }
        match self.tenant_id {
            Some(tenant) => write!(f, "@{}", tenant),
            None => write!(f, "@global"),
        }
    }
}

/// Component - a CAD part or assembly mirrored from the design tool.
///
/// Components form a tree through `parent_id`; an assembly is any component
/// that other components point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub component_id: ComponentId,
    pub external_id: String,
    pub configuration_name: Option<String>,
    pub name: String,
    pub kind: ComponentKind,
    pub version: Option<String>,
    pub version_identifier: String,
    pub last_modified: Timestamp,
    /// Configuration parameters exactly as received (JSON-encoded object).
    pub configuration_values: Option<String>,
    pub family_id: FamilyId,
    pub variant_id: VariantId,
    pub parent_id: Option<ComponentId>,
    pub tenant_id: Option<TenantId>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Component {
    /// Build a new component from a validated payload.
    pub fn from_spec(
        spec: &ComponentSpec,
        family_id: FamilyId,
        variant_id: VariantId,
        tenant_id: Option<TenantId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            component_id: ComponentId::now_v7(),
            external_id: spec.external_id.clone(),
            configuration_name: spec.configuration_name.clone(),
            name: spec.name.clone(),
            kind: spec.kind,
            version: spec.version.clone(),
            version_identifier: spec.version_identifier.clone(),
            last_modified: spec.last_modified,
            configuration_values: spec.configuration_raw.clone(),
            family_id,
            variant_id,
            parent_id: None,
            tenant_id,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(
            self.external_id.clone(),
            self.configuration_name.clone(),
            self.tenant_id,
        )
    }

    pub fn is_assembly(&self) -> bool {
        self.kind == ComponentKind::Assembly
    }
}

/// Product family - catalog template grouping all variants of one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub family_id: FamilyId,
    pub name: String,
    pub inventory_location: Option<String>,
    pub category: Option<String>,
    pub attribute_lines: Vec<AttributeLine>,
    pub tenant_id: Option<TenantId>,
    pub created_at: Timestamp,
}

impl ProductFamily {
    pub fn new(name: impl Into<String>, tenant_id: Option<TenantId>) -> Self {
        Self {
            family_id: FamilyId::now_v7(),
            name: name.into(),
            inventory_location: None,
            category: None,
            attribute_lines: Vec::new(),
            tenant_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_inventory_location(mut self, location: Option<String>) -> Self {
        self.inventory_location = location;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// The line carrying `attribute_id`, if attached.
    pub fn line_for(&self, attribute_id: AttributeId) -> Option<&AttributeLine> {
        self.attribute_lines
            .iter()
            .find(|line| line.attribute_id == attribute_id)
    }

    /// Attach `value_id` under `attribute_id`, creating the line when missing.
    ///
    /// Returns `true` when the family changed.
    pub fn attach_value(&mut self, attribute_id: AttributeId, value_id: AttributeValueId) -> bool {
        match self
            .attribute_lines
            .iter_mut()
            .find(|line| line.attribute_id == attribute_id)
        {
            Some(line) => {
                if line.value_ids.contains(&value_id) {
                    false
                } else {
                    line.value_ids.push(value_id);
                    true
                }
            }
            None => {
                self.attribute_lines.push(AttributeLine {
                    attribute_id,
                    value_ids: vec![value_id],
                });
                true
            }
        }
    }
}

/// Attribute line - one attribute of a family and the values it may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLine {
    pub attribute_id: AttributeId,
    pub value_ids: Vec<AttributeValueId>,
}

/// Configuration attribute - catalog form of a CAD parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAttribute {
    pub attribute_id: AttributeId,
    pub name: String,
    /// Set when the attribute was generated from a CAD configuration.
    pub is_external: bool,
    /// Original parameter name in the design tool.
    pub parameter_name: Option<String>,
    pub tenant_id: Option<TenantId>,
}

impl ConfigAttribute {
    /// Attribute generated from a CAD parameter.
    pub fn external(parameter_name: impl Into<String>, tenant_id: Option<TenantId>) -> Self {
        let parameter_name = parameter_name.into();
        Self {
            attribute_id: AttributeId::now_v7(),
            name: Self::external_name(&parameter_name),
            is_external: true,
            parameter_name: Some(parameter_name),
            tenant_id,
        }
    }

    /// Attribute maintained by hand in the catalog.
    pub fn manual(name: impl Into<String>, tenant_id: Option<TenantId>) -> Self {
        Self {
            attribute_id: AttributeId::now_v7(),
            name: name.into(),
            is_external: false,
            parameter_name: None,
            tenant_id,
        }
    }

    pub fn external_name(parameter_name: &str) -> String {
        format!("{}{}", EXTERNAL_ATTRIBUTE_PREFIX, parameter_name)
    }

    /// Change the CAD parameter name; external attributes are renamed to match.
    pub fn rename_parameter(&mut self, parameter_name: impl Into<String>) {
        let parameter_name = parameter_name.into();
        if self.is_external {
            self.name = Self::external_name(&parameter_name);
        }
        self.parameter_name = Some(parameter_name);
    }

    /// Flag the attribute as CAD-sourced, renaming it after its parameter.
    pub fn mark_external(&mut self) {
        self.is_external = true;
        if let Some(parameter_name) = &self.parameter_name {
            self.name = Self::external_name(parameter_name);
        }
    }
}

/// Attribute value - one observed value of a configuration attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub value_id: AttributeValueId,
    pub attribute_id: AttributeId,
    pub name: String,
    pub tenant_id: Option<TenantId>,
}

impl AttributeValue {
    pub fn new(
        attribute_id: AttributeId,
        name: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            value_id: AttributeValueId::now_v7(),
            attribute_id,
            name: name.into(),
            tenant_id,
        }
    }
}

/// Variant - a family narrowed to one attribute-value combination.
///
/// The default variant of a family carries an empty combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: VariantId,
    pub family_id: FamilyId,
    /// Selected values, kept sorted so combinations compare as sets.
    pub value_ids: Vec<AttributeValueId>,
    pub tenant_id: Option<TenantId>,
    pub created_at: Timestamp,
}

impl Variant {
    pub fn new(
        family_id: FamilyId,
        value_ids: impl IntoIterator<Item = AttributeValueId>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            variant_id: VariantId::now_v7(),
            family_id,
            value_ids: normalize_combination(value_ids),
            tenant_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.value_ids.is_empty()
    }

    /// Exact set equality with `value_ids`.
    pub fn matches(&self, value_ids: &[AttributeValueId]) -> bool {
        self.value_ids == normalize_combination(value_ids.iter().copied())
    }
}

/// Sorted, de-duplicated combination.
pub fn normalize_combination(
    value_ids: impl IntoIterator<Item = AttributeValueId>,
) -> Vec<AttributeValueId> {
    let mut values: Vec<AttributeValueId> = value_ids.into_iter().collect();
    values.sort();
    values.dedup();
    values
}

/// Bill of materials header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bom {
    pub bom_id: BomId,
    pub family_id: FamilyId,
    pub bom_type: BomType,
    pub lines: Vec<BomLine>,
    pub tenant_id: Option<TenantId>,
    pub created_at: Timestamp,
}

impl Bom {
    pub fn new(family_id: FamilyId, tenant_id: Option<TenantId>) -> Self {
        Self {
            bom_id: BomId::now_v7(),
            family_id,
            bom_type: BomType::Normal,
            lines: Vec::new(),
            tenant_id,
            created_at: Utc::now(),
        }
    }

    pub fn push_line(&mut self, variant_id: VariantId, quantity: f64) {
        self.lines.push(BomLine {
            line_id: BomLineId::now_v7(),
            variant_id,
            quantity,
        });
    }
}

/// One child entry of a BOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub line_id: BomLineId,
    pub variant_id: VariantId,
    pub quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_attribute_naming() {
        let attr = ConfigAttribute::external("Length", None);
        assert_eq!(attr.name, "CAD: Length");
        assert!(attr.is_external);
        assert_eq!(attr.parameter_name.as_deref(), Some("Length"));
    }

    #[test]
    fn test_rename_parameter_tracks_name() {
        let mut attr = ConfigAttribute::external("Length", None);
        attr.rename_parameter("Depth");
        assert_eq!(attr.name, "CAD: Depth");

        let mut manual = ConfigAttribute::manual("Color", None);
        manual.rename_parameter("Colour");
        assert_eq!(manual.name, "Color");
        assert_eq!(manual.parameter_name.as_deref(), Some("Colour"));

        manual.mark_external();
        assert_eq!(manual.name, "CAD: Colour");
    }

    #[test]
    fn test_attach_value_is_idempotent() {
        let mut family = ProductFamily::new("Bracket", None);
        let attr = AttributeId::now_v7();
        let v1 = AttributeValueId::now_v7();
        let v2 = AttributeValueId::now_v7();

        assert!(family.attach_value(attr, v1));
        assert!(!family.attach_value(attr, v1));
        assert!(family.attach_value(attr, v2));

        assert_eq!(family.attribute_lines.len(), 1);
        assert_eq!(family.line_for(attr).map(|l| l.value_ids.len()), Some(2));
    }

    #[test]
    fn test_variant_matches_as_set() {
        let family = FamilyId::now_v7();
        let a = AttributeValueId::now_v7();
        let b = AttributeValueId::now_v7();
        let variant = Variant::new(family, vec![b, a], None);

        assert!(variant.matches(&[a, b]));
        assert!(variant.matches(&[b, a, a]));
        assert!(!variant.matches(&[a]));
        assert!(!variant.is_default());
        assert!(Variant::new(family, Vec::new(), None).is_default());
    }

    #[test]
    fn test_component_key_display() {
        let key = ComponentKey::new("FUSION_456", Some("Config1".to_string()), None);
        assert_eq!(key.to_string(), "FUSION_456[Config1]@global");
    }

    #[test]
    fn test_bom_push_line() {
        let mut bom = Bom::new(FamilyId::now_v7(), None);
        bom.push_line(VariantId::now_v7(), 2.0);
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.bom_type, BomType::Normal);
    }
}
