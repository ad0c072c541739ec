//! Stock movement audit records

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Location to location
    Transfer,
    /// Goods received with no source location
    ManualEntry,
    /// Goods leaving to a consumer at checkout
    Sale,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Transfer => "TRANSFER",
            MovementKind::ManualEntry => "MANUAL_ENTRY",
            MovementKind::Sale => "SALE",
        }
    }

    /// Prefix of the human-readable batch code
    pub fn code_prefix(&self) -> &'static str {
        match self {
            MovementKind::Transfer => "TRF",
            MovementKind::ManualEntry => "ENT",
            MovementKind::Sale => "POS",
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER" => Ok(MovementKind::Transfer),
            "MANUAL_ENTRY" => Ok(MovementKind::ManualEntry),
            "SALE" => Ok(MovementKind::Sale),
            other => Err(format!("unknown movement kind: {}", other)),
        }
    }
}

/// Quantity for one size label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeQty {
    pub size: String,
    pub qty: i64,
}

/// One audited line of a movement batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    /// Shared by every line written in the same commit
    pub batch_id: Uuid,
    pub batch_code: String,
    pub kind: MovementKind,
    pub date: NaiveDate,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub product_id: Uuid,
    pub color: String,
    pub sizes: Vec<SizeQty>,
    pub total_qty: i64,
    pub note: Option<String>,
    pub operator_name: String,
    pub created_at: DateTime<Utc>,
}

/// Movement lines of one commit shown together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementInvoice {
    pub batch_id: Uuid,
    pub batch_code: String,
    pub kind: MovementKind,
    pub date: NaiveDate,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub operator_name: String,
    pub total_qty: i64,
    pub lines: Vec<StockMovement>,
    pub created_at: DateTime<Utc>,
}

/// Human-readable movement code, e.g. `TRF-20240501-3F2A`
pub fn generate_movement_code(kind: MovementKind, date: NaiveDate, batch_id: Uuid) -> String {
    let simple = batch_id.simple().to_string();
    format!(
        "{}-{}-{}",
        kind.code_prefix(),
        date.format("%Y%m%d"),
        simple[..4].to_uppercase()
    )
}

/// Group movement lines by batch, newest batch first
pub fn group_into_invoices(movements: Vec<StockMovement>) -> Vec<MovementInvoice> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut invoices: Vec<MovementInvoice> = Vec::new();

    for movement in movements {
        match index.get(&movement.batch_id) {
            Some(&i) => {
                let invoice = &mut invoices[i];
                invoice.total_qty += movement.total_qty;
                if movement.created_at > invoice.created_at {
                    invoice.created_at = movement.created_at;
                }
                invoice.lines.push(movement);
            }
            None => {
                index.insert(movement.batch_id, invoices.len());
                invoices.push(MovementInvoice {
                    batch_id: movement.batch_id,
                    batch_code: movement.batch_code.clone(),
                    kind: movement.kind,
                    date: movement.date,
                    from_location_id: movement.from_location_id,
                    to_location_id: movement.to_location_id,
                    operator_name: movement.operator_name.clone(),
                    total_qty: movement.total_qty,
                    created_at: movement.created_at,
                    lines: vec![movement],
                });
            }
        }
    }

    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    invoices
}
