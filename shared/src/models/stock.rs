//! Finished-goods stock and raw material models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one stock bucket: (product, location, color, size)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub color: String,
    pub size: String,
}

impl StockKey {
    pub fn new(product_id: Uuid, location_id: Uuid, color: &str, size: &str) -> Self {
        Self {
            product_id,
            location_id,
            color: color.to_string(),
            size: size.to_string(),
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} [{} / {}]",
            self.product_id, self.location_id, self.color, self.size
        )
    }
}

/// Quantity on hand for one stock bucket. Zero rows are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockUnit {
    #[serde(flatten)]
    pub key: StockKey,
    pub qty: i64,
    pub updated_at: DateTime<Utc>,
}

/// Availability view: color -> size -> quantity
pub type ColorSizeStock = BTreeMap<String, BTreeMap<String, i64>>;

/// Aggregate stock rows by color then size, summing across locations
pub fn aggregate_by_color_size(units: &[StockUnit]) -> ColorSizeStock {
    let mut view = ColorSizeStock::new();
    for unit in units {
        *view
            .entry(unit.key.color.clone())
            .or_default()
            .entry(unit.key.size.clone())
            .or_default() += unit.qty;
    }
    view
}

/// Total pieces in an availability view
pub fn total_pieces(view: &ColorSizeStock) -> i64 {
    view.values().flat_map(|sizes| sizes.values()).sum()
}

/// Fabric or accessory kept by single-id stock
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RawMaterialKind {
    Material,
    Accessory,
}

impl RawMaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawMaterialKind::Material => "material",
            RawMaterialKind::Accessory => "accessory",
        }
    }
}

/// A raw material or accessory stock record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: Uuid,
    pub kind: RawMaterialKind,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    /// Unit of measure (Kg, Yard, Roll, Pcs, Gross)
    pub unit: String,
    pub stock: Decimal,
    pub price_per_unit: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(location: Uuid, color: &str, size: &str, qty: i64) -> StockUnit {
        StockUnit {
            key: StockKey::new(Uuid::nil(), location, color, size),
            qty,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_aggregate_sums_across_locations() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let units = vec![
            unit(a, "Red", "M", 10),
            unit(b, "Red", "M", 5),
            unit(a, "Red", "L", 3),
            unit(b, "Black", "S", 0),
        ];

        let view = aggregate_by_color_size(&units);

        assert_eq!(view["Red"]["M"], 15);
        assert_eq!(view["Red"]["L"], 3);
        assert_eq!(view["Black"]["S"], 0);
        assert_eq!(total_pieces(&view), 18);
    }

    #[test]
    fn test_stock_key_display() {
        let key = StockKey::new(Uuid::nil(), Uuid::nil(), "Navy", "XL");
        assert!(key.to_string().ends_with("[Navy / XL]"));
    }
}
