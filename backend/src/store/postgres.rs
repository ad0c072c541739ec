//! PostgreSQL adapter for the store port

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    AccessoryUsage, Location, MaterialUsage, OtherCost, ProductionBatch, RawMaterial,
    RawMaterialKind, Sale, SaleLine, Settlement, SizeQty, SizeTarget, StageSnapshots, StockKey,
    StockMovement, StockUnit,
};

use super::{SaleFilter, SettlementFilter, Store, StoreTx};
use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

const BATCH_COLUMNS: &str = r#"
    id, code, product_id, variant_color, production_type, model, status, current_stage,
    progress, target, actual_output, start_date, end_date,
    res_pattern, res_cut, res_sew, res_qc, res_steam, res_pack,
    size_targets, materials_used, accessories_used, other_costs,
    sewing_cost, total_cost, created_at, updated_at
"#;

const SALE_COLUMNS: &str = r#"
    id, date, location_id, customer_name, sales_source, total_price, total_consignment,
    total_discount, discount_note, payment_method, paid_amount, remaining_amount,
    status, sale_type, items, created_at
"#;

const SETTLEMENT_COLUMNS: &str =
    "id, location_id, date, amount, payment_method, note, kind, sale_id, created_at";

const MOVEMENT_COLUMNS: &str = r#"
    id, batch_id, batch_code, kind, date, from_location_id, to_location_id, product_id,
    color, sizes, total_qty, note, operator_name, created_at
"#;

/// Enum columns are stored as TEXT
fn parse_column<T>(column: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| AppError::Internal(format!("invalid {} column: {}", column, e)))
}

fn raw_material_table(kind: RawMaterialKind) -> &'static str {
    match kind {
        RawMaterialKind::Material => "materials",
        RawMaterialKind::Accessory => "accessories",
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct StockUnitRow {
    product_id: Uuid,
    location_id: Uuid,
    color: String,
    size: String,
    qty: i64,
    updated_at: DateTime<Utc>,
}

impl From<StockUnitRow> for StockUnit {
    fn from(row: StockUnitRow) -> Self {
        StockUnit {
            key: StockKey {
                product_id: row.product_id,
                location_id: row.location_id,
                color: row.color,
                size: row.size,
            },
            qty: row.qty,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    location_type: String,
    address: Option<String>,
    consignment_margin: Decimal,
}

impl TryFrom<LocationRow> for Location {
    type Error = AppError;

    fn try_from(row: LocationRow) -> AppResult<Self> {
        Ok(Location {
            id: row.id,
            name: row.name,
            location_type: parse_column("location_type", &row.location_type)?,
            address: row.address,
            consignment_margin: row.consignment_margin,
        })
    }
}

#[derive(Debug, FromRow)]
struct RawMaterialRow {
    id: Uuid,
    name: String,
    color: Option<String>,
    size: Option<String>,
    unit: String,
    stock: Decimal,
    price_per_unit: Decimal,
}

impl RawMaterialRow {
    fn into_model(self, kind: RawMaterialKind) -> RawMaterial {
        RawMaterial {
            id: self.id,
            kind,
            name: self.name,
            color: self.color,
            size: self.size,
            unit: self.unit,
            stock: self.stock,
            price_per_unit: self.price_per_unit,
        }
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    code: String,
    product_id: Uuid,
    variant_color: String,
    production_type: String,
    model: String,
    status: String,
    current_stage: String,
    progress: i32,
    target: i64,
    actual_output: Option<i64>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    res_pattern: Option<i64>,
    res_cut: Option<i64>,
    res_sew: Option<i64>,
    res_qc: Option<i64>,
    res_steam: Option<i64>,
    res_pack: Option<i64>,
    size_targets: Json<Vec<SizeTarget>>,
    materials_used: Json<Vec<MaterialUsage>>,
    accessories_used: Json<Vec<AccessoryUsage>>,
    other_costs: Json<Vec<OtherCost>>,
    sewing_cost: Decimal,
    total_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for ProductionBatch {
    type Error = AppError;

    fn try_from(row: BatchRow) -> AppResult<Self> {
        Ok(ProductionBatch {
            id: row.id,
            code: row.code,
            product_id: row.product_id,
            variant_color: row.variant_color,
            production_type: parse_column("production_type", &row.production_type)?,
            model: parse_column("model", &row.model)?,
            status: parse_column("status", &row.status)?,
            current_stage: parse_column("current_stage", &row.current_stage)?,
            progress: row.progress,
            target: row.target,
            actual_output: row.actual_output,
            start_date: row.start_date,
            end_date: row.end_date,
            snapshots: StageSnapshots {
                pattern: row.res_pattern,
                cut: row.res_cut,
                sew: row.res_sew,
                qc: row.res_qc,
                steam: row.res_steam,
                pack: row.res_pack,
            },
            size_targets: row.size_targets.0,
            materials_used: row.materials_used.0,
            accessories_used: row.accessories_used.0,
            other_costs: row.other_costs.0,
            sewing_cost: row.sewing_cost,
            total_cost: row.total_cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    date: NaiveDate,
    location_id: Uuid,
    customer_name: String,
    sales_source: String,
    total_price: Decimal,
    total_consignment: Decimal,
    total_discount: Decimal,
    discount_note: Option<String>,
    payment_method: String,
    paid_amount: Decimal,
    remaining_amount: Decimal,
    status: String,
    sale_type: String,
    items: Json<Vec<SaleLine>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = AppError;

    fn try_from(row: SaleRow) -> AppResult<Self> {
        Ok(Sale {
            id: row.id,
            date: row.date,
            location_id: row.location_id,
            customer_name: row.customer_name,
            sales_source: row.sales_source,
            total_price: row.total_price,
            total_consignment: row.total_consignment,
            total_discount: row.total_discount,
            discount_note: row.discount_note,
            payment_method: row.payment_method,
            paid_amount: row.paid_amount,
            remaining_amount: row.remaining_amount,
            status: parse_column("status", &row.status)?,
            sale_type: parse_column("sale_type", &row.sale_type)?,
            items: row.items.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SettlementRow {
    id: Uuid,
    location_id: Uuid,
    date: NaiveDate,
    amount: Decimal,
    payment_method: String,
    note: Option<String>,
    kind: String,
    sale_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SettlementRow> for Settlement {
    type Error = AppError;

    fn try_from(row: SettlementRow) -> AppResult<Self> {
        Ok(Settlement {
            id: row.id,
            location_id: row.location_id,
            date: row.date,
            amount: row.amount,
            payment_method: row.payment_method,
            note: row.note,
            kind: parse_column("kind", &row.kind)?,
            sale_id: row.sale_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    batch_id: Uuid,
    batch_code: String,
    kind: String,
    date: NaiveDate,
    from_location_id: Option<Uuid>,
    to_location_id: Option<Uuid>,
    product_id: Uuid,
    color: String,
    sizes: Json<Vec<SizeQty>>,
    total_qty: i64,
    note: Option<String>,
    operator_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(StockMovement {
            id: row.id,
            batch_id: row.batch_id,
            batch_code: row.batch_code,
            kind: parse_column("kind", &row.kind)?,
            date: row.date,
            from_location_id: row.from_location_id,
            to_location_id: row.to_location_id,
            product_id: row.product_id,
            color: row.color,
            sizes: row.sizes.0,
            total_qty: row.total_qty,
            note: row.note,
            operator_name: row.operator_name,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Store
// ============================================================================

/// Pool-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await?;
        tracing::info!("Database connection established");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        tracing::info!("Migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_stock(&self, product_id: Uuid, location_id: Option<Uuid>) -> AppResult<Vec<StockUnit>> {
        let rows = sqlx::query_as::<_, StockUnitRow>(
            r#"
            SELECT product_id, location_id, color, size, qty, updated_at
            FROM stock_units
            WHERE product_id = $1 AND ($2::uuid IS NULL OR location_id = $2)
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockUnit::from).collect())
    }

    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, location_type, address, consignment_margin FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Location::try_from).transpose()
    }

    async fn get_raw_material(&self, kind: RawMaterialKind, id: Uuid) -> AppResult<Option<RawMaterial>> {
        let sql = format!(
            "SELECT id, name, color, size, unit, stock, price_per_unit FROM {} WHERE id = $1",
            raw_material_table(kind)
        );
        let row = sqlx::query_as::<_, RawMaterialRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_model(kind)))
    }

    async fn get_batch(&self, id: Uuid) -> AppResult<Option<ProductionBatch>> {
        let sql = format!("SELECT {} FROM production_batches WHERE id = $1", BATCH_COLUMNS);
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductionBatch::try_from).transpose()
    }

    async fn list_batches(&self, product_id: Option<Uuid>) -> AppResult<Vec<ProductionBatch>> {
        let sql = format!(
            "SELECT {} FROM production_batches WHERE ($1::uuid IS NULL OR product_id = $1) ORDER BY created_at DESC",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn get_sale(&self, id: Uuid) -> AppResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS);
        let row = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sale::try_from).transpose()
    }

    async fn list_sales(&self, filter: &SaleFilter) -> AppResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {} FROM sales
            WHERE ($1::uuid IS NULL OR location_id = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
              AND (NOT $4 OR remaining_amount > 0)
            ORDER BY created_at DESC
            "#,
            SALE_COLUMNS
        );
        let rows = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(filter.location_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.only_outstanding)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn list_settlements(&self, filter: &SettlementFilter) -> AppResult<Vec<Settlement>> {
        let sql = format!(
            r#"
            SELECT {} FROM settlements
            WHERE ($1::uuid IS NULL OR location_id = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC, created_at DESC
            "#,
            SETTLEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SettlementRow>(&sql)
            .bind(filter.location_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn list_movements(&self, limit: i64) -> AppResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements
             WHERE batch_id IN (
                 SELECT batch_id FROM stock_movements
                 GROUP BY batch_id
                 ORDER BY MAX(created_at) DESC
                 LIMIT $1
             )
             ORDER BY created_at DESC",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }
}

// ============================================================================
// Unit of work
// ============================================================================

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn claim_operation(&mut self, key: &str, operation: &str) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO operation_keys (key, operation) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(operation)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::DuplicateOperation(format!("{} ({})", key, operation)));
        }
        Ok(())
    }

    async fn adjust_stock(&mut self, key: &StockKey, delta: i64) -> AppResult<i64> {
        let qty = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stock_units (product_id, location_id, color, size, qty, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (product_id, location_id, color, size)
            DO UPDATE SET qty = stock_units.qty + EXCLUDED.qty, updated_at = NOW()
            RETURNING qty
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .bind(&key.color)
        .bind(&key.size)
        .bind(delta)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(qty)
    }

    async fn stock_qty(&mut self, key: &StockKey) -> AppResult<i64> {
        let qty = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT qty FROM stock_units
            WHERE product_id = $1 AND location_id = $2 AND color = $3 AND size = $4
            FOR UPDATE
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .bind(&key.color)
        .bind(&key.size)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(qty.unwrap_or(0))
    }

    async fn lock_stock(&mut self, key: &StockKey) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_units (product_id, location_id, color, size, qty, updated_at)
            VALUES ($1, $2, $3, $4, 0, NOW())
            ON CONFLICT (product_id, location_id, color, size)
            DO UPDATE SET qty = stock_units.qty
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .bind(&key.color)
        .bind(&key.size)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn adjust_raw_material(
        &mut self,
        kind: RawMaterialKind,
        id: Uuid,
        delta: Decimal,
    ) -> AppResult<RawMaterial> {
        let sql = format!(
            r#"
            UPDATE {} SET stock = stock + $2
            WHERE id = $1
            RETURNING id, name, color, size, unit, stock, price_per_unit
            "#,
            raw_material_table(kind)
        );
        let row = sqlx::query_as::<_, RawMaterialRow>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.as_str(), id)))?;

        Ok(row.into_model(kind))
    }

    async fn get_location(&mut self, id: Uuid) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, location_type, address, consignment_margin FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Location::try_from).transpose()
    }

    async fn next_batch_sequence(&mut self, year: i32) -> AppResult<u32> {
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO batch_sequences (year, last_value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = batch_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await?;

        u32::try_from(value).map_err(|_| AppError::Internal("negative batch sequence".to_string()))
    }

    async fn insert_batch(&mut self, batch: &ProductionBatch) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO production_batches (
                id, code, product_id, variant_color, production_type, model, status, current_stage,
                progress, target, actual_output, start_date, end_date,
                res_pattern, res_cut, res_sew, res_qc, res_steam, res_pack,
                size_targets, materials_used, accessories_used, other_costs,
                sewing_cost, total_cost, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            "#,
        )
        .bind(batch.id)
        .bind(&batch.code)
        .bind(batch.product_id)
        .bind(&batch.variant_color)
        .bind(batch.production_type.as_str())
        .bind(batch.model.as_str())
        .bind(batch.status.as_str())
        .bind(batch.current_stage.as_str())
        .bind(batch.progress)
        .bind(batch.target)
        .bind(batch.actual_output)
        .bind(batch.start_date)
        .bind(batch.end_date)
        .bind(batch.snapshots.pattern)
        .bind(batch.snapshots.cut)
        .bind(batch.snapshots.sew)
        .bind(batch.snapshots.qc)
        .bind(batch.snapshots.steam)
        .bind(batch.snapshots.pack)
        .bind(Json(&batch.size_targets))
        .bind(Json(&batch.materials_used))
        .bind(Json(&batch.accessories_used))
        .bind(Json(&batch.other_costs))
        .bind(batch.sewing_cost)
        .bind(batch.total_cost)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn lock_batch(&mut self, id: Uuid) -> AppResult<Option<ProductionBatch>> {
        let sql = format!(
            "SELECT {} FROM production_batches WHERE id = $1 FOR UPDATE",
            BATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(ProductionBatch::try_from).transpose()
    }

    async fn update_batch(&mut self, batch: &ProductionBatch) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE production_batches
            SET status = $2, current_stage = $3, progress = $4, actual_output = $5, end_date = $6,
                res_pattern = $7, res_cut = $8, res_sew = $9, res_qc = $10, res_steam = $11,
                res_pack = $12, size_targets = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(batch.id)
        .bind(batch.status.as_str())
        .bind(batch.current_stage.as_str())
        .bind(batch.progress)
        .bind(batch.actual_output)
        .bind(batch.end_date)
        .bind(batch.snapshots.pattern)
        .bind(batch.snapshots.cut)
        .bind(batch.snapshots.sew)
        .bind(batch.snapshots.qc)
        .bind(batch.snapshots.steam)
        .bind(batch.snapshots.pack)
        .bind(Json(&batch.size_targets))
        .bind(batch.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Production batch".to_string()));
        }
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, date, location_id, customer_name, sales_source, total_price, total_consignment,
                total_discount, discount_note, payment_method, paid_amount, remaining_amount,
                status, sale_type, items, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(sale.id)
        .bind(sale.date)
        .bind(sale.location_id)
        .bind(&sale.customer_name)
        .bind(&sale.sales_source)
        .bind(sale.total_price)
        .bind(sale.total_consignment)
        .bind(sale.total_discount)
        .bind(&sale.discount_note)
        .bind(&sale.payment_method)
        .bind(sale.paid_amount)
        .bind(sale.remaining_amount)
        .bind(sale.status.as_str())
        .bind(sale.sale_type.as_str())
        .bind(Json(&sale.items))
        .bind(sale.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn lock_sale(&mut self, id: Uuid) -> AppResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = $1 FOR UPDATE", SALE_COLUMNS);
        let row = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Sale::try_from).transpose()
    }

    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET payment_method = $2, paid_amount = $3, remaining_amount = $4, status = $5, sale_type = $6
            WHERE id = $1
            "#,
        )
        .bind(sale.id)
        .bind(&sale.payment_method)
        .bind(sale.paid_amount)
        .bind(sale.remaining_amount)
        .bind(sale.status.as_str())
        .bind(sale.sale_type.as_str())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Sale".to_string()));
        }
        Ok(())
    }

    async fn insert_settlement(&mut self, settlement: &Settlement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settlements (id, location_id, date, amount, payment_method, note, kind, sale_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(settlement.id)
        .bind(settlement.location_id)
        .bind(settlement.date)
        .bind(settlement.amount)
        .bind(&settlement.payment_method)
        .bind(&settlement.note)
        .bind(settlement.kind.as_str())
        .bind(settlement.sale_id)
        .bind(settlement.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, batch_id, batch_code, kind, date, from_location_id, to_location_id, product_id,
                color, sizes, total_qty, note, operator_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(movement.id)
        .bind(movement.batch_id)
        .bind(&movement.batch_code)
        .bind(movement.kind.as_str())
        .bind(movement.date)
        .bind(movement.from_location_id)
        .bind(movement.to_location_id)
        .bind(movement.product_id)
        .bind(&movement.color)
        .bind(Json(&movement.sizes))
        .bind(movement.total_qty)
        .bind(&movement.note)
        .bind(&movement.operator_name)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
