//! Common types used across the platform

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name a member of an enumerated set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {set}: '{value}'")]
pub struct UnknownVariant {
    pub set: &'static str,
    pub value: String,
}

/// Category of a stock item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Material,
    Medication,
    Equipment,
    Cleaning,
    Office,
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 6] = [
        ItemCategory::Material,
        ItemCategory::Medication,
        ItemCategory::Equipment,
        ItemCategory::Cleaning,
        ItemCategory::Office,
        ItemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Material => "material",
            ItemCategory::Medication => "medication",
            ItemCategory::Equipment => "equipment",
            ItemCategory::Cleaning => "cleaning",
            ItemCategory::Office => "office",
            ItemCategory::Other => "other",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "category",
                value: s.to_string(),
            })
    }
}

/// Unit of measure a stock item is counted in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemUnit {
    Unit,
    Box,
    Package,
    Ampoule,
    Vial,
    Bottle,
    Roll,
    Pair,
    Liter,
    Milliliter,
    Kilogram,
    Gram,
}

impl ItemUnit {
    pub const ALL: [ItemUnit; 12] = [
        ItemUnit::Unit,
        ItemUnit::Box,
        ItemUnit::Package,
        ItemUnit::Ampoule,
        ItemUnit::Vial,
        ItemUnit::Bottle,
        ItemUnit::Roll,
        ItemUnit::Pair,
        ItemUnit::Liter,
        ItemUnit::Milliliter,
        ItemUnit::Kilogram,
        ItemUnit::Gram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemUnit::Unit => "unit",
            ItemUnit::Box => "box",
            ItemUnit::Package => "package",
            ItemUnit::Ampoule => "ampoule",
            ItemUnit::Vial => "vial",
            ItemUnit::Bottle => "bottle",
            ItemUnit::Roll => "roll",
            ItemUnit::Pair => "pair",
            ItemUnit::Liter => "liter",
            ItemUnit::Milliliter => "milliliter",
            ItemUnit::Kilogram => "kilogram",
            ItemUnit::Gram => "gram",
        }
    }
}

impl fmt::Display for ItemUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "unit",
                value: s.to_string(),
            })
    }
}
