//! Enum types for CADLINK records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record type discriminator used in errors and audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Component,
    Family,
    Attribute,
    AttributeValue,
    Variant,
    Bom,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Component => "Component",
            EntityType::Family => "Family",
            EntityType::Attribute => "Attribute",
            EntityType::AttributeValue => "AttributeValue",
            EntityType::Variant => "Variant",
            EntityType::Bom => "Bom",
        };
        write!(f, "{}", value)
    }
}

/// Kind of CAD component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// A single physical part
    #[default]
    #[serde(alias = "component")]
    Part,
    /// A node with sub-components
    Assembly,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Part => "part",
            ComponentKind::Assembly => "assembly",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "part" | "component" => Ok(ComponentKind::Part),
            "assembly" => Ok(ComponentKind::Assembly),
            _ => Err(format!("Invalid ComponentKind: {}", s)),
        }
    }
}

/// Bill of materials type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BomType {
    /// Standard, multi-level capable manufacturing BOM
    #[default]
    Normal,
}

impl fmt::Display for BomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BomType::Normal => write!(f, "normal"),
        }
    }
}

/// How a missing variant is materialized when no existing variant carries
/// the requested attribute-value combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantStrategy {
    /// Build the variant from the exact requested value set.
    #[default]
    ExactCombination,
    /// Ask the combination generator for the first combination not yet
    /// materialized. Only correct when a single combination is pending.
    FirstPossible,
}

impl fmt::Display for VariantStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            VariantStrategy::ExactCombination => "exact_combination",
            VariantStrategy::FirstPossible => "first_possible",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for VariantStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "exact" | "exactcombination" => Ok(VariantStrategy::ExactCombination),
            "first" | "firstpossible" => Ok(VariantStrategy::FirstPossible),
            _ => Err(format!("Invalid VariantStrategy: {}", s)),
        }
    }
}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
