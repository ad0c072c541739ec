//! Point-of-sale checkout and customer receivables

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    generate_movement_code, net_owed_to_center, quote_checkout, validate_cart_line,
    validate_non_negative_amount, validate_percent, CartLine, MovementKind, QuoteRequest, Sale,
    SaleLine, SaleType, SizeQty, StockKey, StockMovement,
};

use super::{add_qty, begin_operation};
use super::ledger::{apply_delta, ensure_available, stock_key};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{SaleFilter, Store};

/// Sales processor
#[derive(Clone)]
pub struct SalesProcessor {
    store: Arc<dyn Store>,
    central_location_id: Uuid,
    paid_epsilon: Decimal,
}

/// A checkout request from the point of sale
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub location_id: Uuid,
    pub customer_name: Option<String>,
    pub sales_source: Option<String>,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub global_discount_percent: Decimal,
    pub discount_note: Option<String>,
    pub sale_type: Option<SaleType>,
    pub payment_method: Option<String>,
    /// Partial payment taken now; the rest stays receivable
    pub down_payment: Option<Decimal>,
    pub operator_name: Option<String>,
    pub date: Option<NaiveDate>,
}

/// A customer payment against a sale's receivable
#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: String,
}

impl SalesProcessor {
    /// Create a new SalesProcessor instance
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            central_location_id: config.accounting.central_location_id,
            paid_epsilon: config.accounting.paid_epsilon,
        }
    }

    /// Book a sale and debit its stock as one unit of work.
    ///
    /// Branch sales are always consignment. Nothing is debited unless the
    /// sale record is written, and a failure at any step leaves no trace.
    pub async fn checkout(&self, input: CheckoutInput, idempotency_key: Option<&str>) -> AppResult<Sale> {
        if input.items.is_empty() {
            return Err(AppError::validation("items", "Cart is empty"));
        }
        validate_percent(input.global_discount_percent)
            .map_err(|msg| AppError::validation("global_discount_percent", msg))?;
        if let Some(down_payment) = input.down_payment {
            validate_non_negative_amount(down_payment)
                .map_err(|msg| AppError::validation("down_payment", msg))?;
        }

        let mut lines = Vec::with_capacity(input.items.len());
        let mut requested: BTreeMap<StockKey, i64> = BTreeMap::new();
        for item in input.items {
            validate_cart_line(&item).map_err(|msg| AppError::validation("items", msg))?;
            let key = stock_key(item.product_id, input.location_id, &item.color, &item.size)?;
            add_qty(&mut requested, key.clone(), item.qty, "items")?;
            lines.push(CartLine {
                color: key.color,
                size: key.size,
                ..item
            });
        }

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "checkout").await?;
        let location = tx
            .get_location(input.location_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Location".to_string()))?;
        let is_central = location.is_central(self.central_location_id);
        validate_percent(location.consignment_margin)
            .map_err(|msg| AppError::validation("consignment_margin", msg))?;

        ensure_available(tx.as_mut(), &requested).await?;

        let quote = quote_checkout(&QuoteRequest {
            lines: &lines,
            global_discount_percent: input.global_discount_percent,
            requested_type: input.sale_type.unwrap_or(SaleType::Retail),
            down_payment: input.down_payment,
            location_margin: location.consignment_margin,
            is_central_location: is_central,
            paid_epsilon: self.paid_epsilon,
        })
        .map_err(|msg| AppError::validation("items", msg))?;

        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
        let items: Vec<SaleLine> = lines
            .into_iter()
            .map(|line| {
                let net_unit = line.unit_price
                    * (Decimal::ONE - line.discount_percent / Decimal::ONE_HUNDRED);
                SaleLine {
                    consignment_unit_price: net_owed_to_center(
                        net_unit,
                        location.consignment_margin,
                        is_central,
                    ),
                    line,
                }
            })
            .collect();

        let sale = Sale {
            id: Uuid::new_v4(),
            date,
            location_id: location.id,
            customer_name: non_blank(input.customer_name).unwrap_or_else(|| "Walk-in".to_string()),
            sales_source: non_blank(input.sales_source).unwrap_or_else(|| "Customer".to_string()),
            total_price: quote.total_price,
            total_consignment: quote.total_consignment,
            total_discount: quote.total_discount,
            discount_note: non_blank(input.discount_note),
            payment_method: non_blank(input.payment_method).unwrap_or_else(|| "Cash".to_string()),
            paid_amount: quote.paid_amount,
            remaining_amount: quote.remaining_amount,
            status: quote.status,
            sale_type: quote.sale_type,
            items,
            created_at: Utc::now(),
        };

        tx.insert_sale(&sale).await?;

        let operator_name = non_blank(input.operator_name).unwrap_or_else(|| "POS".to_string());
        let batch_code = generate_movement_code(MovementKind::Sale, date, sale.id);
        for item in &sale.items {
            let line = &item.line;
            let movement = StockMovement {
                id: Uuid::new_v4(),
                batch_id: sale.id,
                batch_code: batch_code.clone(),
                kind: MovementKind::Sale,
                date,
                from_location_id: Some(sale.location_id),
                to_location_id: None,
                product_id: line.product_id,
                color: line.color.clone(),
                sizes: vec![SizeQty {
                    size: line.size.clone(),
                    qty: line.qty,
                }],
                total_qty: line.qty,
                note: Some(format!("Sale to {}", sale.customer_name)),
                operator_name: operator_name.clone(),
                created_at: sale.created_at,
            };
            tx.insert_movement(&movement).await?;

            let key = StockKey::new(line.product_id, sale.location_id, &line.color, &line.size);
            apply_delta(tx.as_mut(), &key, -line.qty).await?;
        }

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            location_id = %sale.location_id,
            sale_type = sale.sale_type.as_str(),
            total = %sale.total_price,
            remaining = %sale.remaining_amount,
            "Sale checked out"
        );
        Ok(sale)
    }

    /// Apply a customer payment to a sale's remaining receivable
    pub async fn apply_payment(
        &self,
        sale_id: Uuid,
        input: PaymentInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<Sale> {
        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "sale_payment").await?;
        let mut sale = tx
            .lock_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        sale.apply_payment(input.amount, &input.payment_method, self.paid_epsilon)
            .map_err(|msg| AppError::validation("amount", msg))?;
        tx.update_sale(&sale).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            amount = %input.amount,
            remaining = %sale.remaining_amount,
            status = sale.status.as_str(),
            "Payment applied"
        );
        Ok(sale)
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<Sale> {
        self.store
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))
    }

    pub async fn list_sales(&self, filter: SaleFilter) -> AppResult<Vec<Sale>> {
        self.store.list_sales(&filter).await
    }

    /// Sales with an open receivable. A branch sees its own; the central
    /// location sees every location's.
    pub async fn receivables(&self, location_id: Option<Uuid>) -> AppResult<Vec<Sale>> {
        let filter = SaleFilter {
            location_id: location_id.filter(|id| *id != self.central_location_id),
            only_outstanding: true,
            ..SaleFilter::default()
        };
        self.store.list_sales(&filter).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
