//! Sales and storage locations

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known identifier of the central warehouse / head office
pub const DEFAULT_CENTRAL_LOCATION_ID: Uuid = Uuid::from_u128(1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Central,
    Branch,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Central => "CENTRAL",
            LocationType::Branch => "BRANCH",
        }
    }
}

impl std::str::FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CENTRAL" => Ok(LocationType::Central),
            "BRANCH" => Ok(LocationType::Branch),
            other => Err(format!("unknown location type: {}", other)),
        }
    }
}

/// A warehouse, store, or consignment branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub location_type: LocationType,
    pub address: Option<String>,
    /// Percentage of a sale the branch keeps (0-100)
    pub consignment_margin: Decimal,
}

impl Location {
    /// The central location is recognised by its identifier, not its type
    pub fn is_central(&self, central_location_id: Uuid) -> bool {
        self.id == central_location_id
    }
}
