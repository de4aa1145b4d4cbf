//! Stock batch service: batch lifecycle, quantity movements and FEFO lookup

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{select_optimal_batch, StockBatch, StockStatus};

use crate::error::{AppError, AppResult};

/// Stock service for managing product batches
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for receiving a new batch
#[derive(Debug, Deserialize)]
pub struct CreateStockBatchInput {
    pub product_id: Uuid,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: i32,
    pub minimum_stock_level: Option<i32>,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
}

/// Input for quantity adjustments
#[derive(Debug, Deserialize)]
pub struct AdjustQuantityInput {
    pub amount: i32,
}

/// Row for stock batch queries; status is stored as text
#[derive(Debug, FromRow)]
struct StockBatchRow {
    id: Uuid,
    product_id: Uuid,
    batch_number: String,
    expiry_date: Option<NaiveDate>,
    quantity: i32,
    initial_quantity: i32,
    minimum_stock_level: i32,
    status: String,
    storage_location: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StockBatchRow {
    fn into_model(self) -> AppResult<StockBatch> {
        let status: StockStatus = self.status.parse().map_err(AppError::Internal)?;
        Ok(StockBatch {
            id: self.id,
            product_id: self.product_id,
            batch_number: self.batch_number,
            expiry_date: self.expiry_date,
            quantity: self.quantity,
            initial_quantity: self.initial_quantity,
            minimum_stock_level: self.minimum_stock_level,
            status,
            storage_location: self.storage_location,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BATCH_COLUMNS: &str = "id, product_id, batch_number, expiry_date, quantity, \
     initial_quantity, minimum_stock_level, status, storage_location, notes, \
     created_at, updated_at";

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Receive a new batch for a product. Batch numbers are unique per
    /// product.
    pub async fn create_batch(&self, input: CreateStockBatchInput) -> AppResult<StockBatch> {
        if input.batch_number.trim().is_empty() {
            return Err(AppError::Validation {
                field: "batch_number".to_string(),
                message: "Batch number must not be empty".to_string(),
            });
        }
        if input.initial_quantity < 0 {
            return Err(AppError::Validation {
                field: "initial_quantity".to_string(),
                message: "Initial quantity must not be negative".to_string(),
            });
        }
        let minimum_stock_level = input.minimum_stock_level.unwrap_or(0);
        if minimum_stock_level < 0 {
            return Err(AppError::Validation {
                field: "minimum_stock_level".to_string(),
                message: "Minimum stock level must not be negative".to_string(),
            });
        }

        let product_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(input.product_id)
                .fetch_one(&self.db)
                .await?;

        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_batches WHERE product_id = $1 AND batch_number = $2)",
        )
        .bind(input.product_id)
        .bind(&input.batch_number)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("batch_number".to_string()));
        }

        let batch = StockBatch::new(
            input.product_id,
            input.batch_number,
            input.expiry_date,
            input.initial_quantity,
            minimum_stock_level,
            Utc::now(),
        );

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            INSERT INTO stock_batches (
                id, product_id, batch_number, expiry_date, quantity, initial_quantity,
                minimum_stock_level, status, storage_location, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(batch.id)
        .bind(batch.product_id)
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(batch.quantity)
        .bind(batch.initial_quantity)
        .bind(batch.minimum_stock_level)
        .bind(batch.status.as_str())
        .bind(&input.storage_location)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Get a batch by id
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM stock_batches WHERE id = $1"
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;

        row.into_model()
    }

    /// List batches, optionally filtered by product, earliest expiry first
    pub async fn list_batches(&self, product_id: Option<Uuid>) -> AppResult<Vec<StockBatch>> {
        let rows = match product_id {
            Some(pid) => {
                sqlx::query_as::<_, StockBatchRow>(&format!(
                    r#"
                    SELECT {BATCH_COLUMNS} FROM stock_batches
                    WHERE product_id = $1
                    ORDER BY expiry_date ASC NULLS LAST, created_at ASC
                    "#
                ))
                .bind(pid)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, StockBatchRow>(&format!(
                    r#"
                    SELECT {BATCH_COLUMNS} FROM stock_batches
                    ORDER BY expiry_date ASC NULLS LAST, created_at ASC
                    "#
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(StockBatchRow::into_model).collect()
    }

    /// Remove units from a batch. Runs inside a transaction with the row
    /// locked so concurrent deductions cannot oversell.
    pub async fn deduct_quantity(&self, batch_id: Uuid, amount: i32) -> AppResult<StockBatch> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM stock_batches WHERE id = $1 FOR UPDATE"
        ))
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;

        let mut batch = row.into_model()?;
        batch.deduct_quantity(amount)?;

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            UPDATE stock_batches
            SET quantity = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(batch.quantity)
        .bind(batch.status.as_str())
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Add units to a batch (restock, returns)
    pub async fn add_quantity(&self, batch_id: Uuid, amount: i32) -> AppResult<StockBatch> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM stock_batches WHERE id = $1 FOR UPDATE"
        ))
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;

        let mut batch = row.into_model()?;
        batch.add_quantity(amount)?;

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            UPDATE stock_batches
            SET quantity = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(batch.quantity)
        .bind(batch.status.as_str())
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Pin a batch to EXPIRED
    pub async fn mark_expired(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        self.set_status(batch_id, StockStatus::Expired).await
    }

    /// Pin a batch to DAMAGED
    pub async fn mark_damaged(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        self.set_status(batch_id, StockStatus::Damaged).await
    }

    /// Pin a batch to RECALLED
    pub async fn mark_recalled(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        self.set_status(batch_id, StockStatus::Recalled).await
    }

    /// Reserve a batch. Only a currently sellable batch can be reserved.
    pub async fn mark_reserved(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        let mut batch = self.get_batch(batch_id).await?;
        let today = Utc::now().date_naive();
        if !batch.is_available_for_sale(today) {
            return Err(AppError::InvalidStateTransition(format!(
                "batch {} is not available for sale and cannot be reserved",
                batch_id
            )));
        }
        batch.mark_reserved(today);
        self.set_status(batch_id, batch.status).await
    }

    /// Release a reservation; a no-op for a batch that is not reserved.
    pub async fn release_reservation(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        let mut batch = self.get_batch(batch_id).await?;
        if batch.release_reservation() {
            batch.refresh_status();
            return self.set_status(batch_id, batch.status).await;
        }
        Ok(batch)
    }

    /// Pick the batch to fulfill a sale under FEFO: the earliest-expiring
    /// sellable batch that can cover the whole request on its own.
    pub async fn find_optimal_batch(
        &self,
        product_id: Uuid,
        requested: i32,
    ) -> AppResult<StockBatch> {
        if requested <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Requested quantity must be positive".to_string(),
            });
        }

        let today = Utc::now().date_naive();
        let candidates = self.sellable_batches(product_id, today).await?;

        select_optimal_batch(&candidates, requested, today)
            .cloned()
            .ok_or_else(|| {
                AppError::InsufficientStock(format!(
                    "no single batch of product {} can cover {} units",
                    product_id, requested
                ))
            })
    }

    /// Aggregate availability check across all sellable batches. This
    /// deliberately answers a different question than `find_optimal_batch`:
    /// the total may cover the request even when no single batch does.
    pub async fn check_availability(&self, product_id: Uuid, requested: i32) -> AppResult<bool> {
        if requested <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Requested quantity must be positive".to_string(),
            });
        }

        let today = Utc::now().date_naive();
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_batches
            WHERE product_id = $1 AND status = 'available' AND quantity > 0
            AND (expiry_date IS NULL OR expiry_date >= $2)
            "#,
        )
        .bind(product_id)
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        Ok(total >= i64::from(requested))
    }

    /// Batches expiring within the look-ahead window, excluding today,
    /// earliest first. Already-pinned batches are skipped.
    pub async fn find_expiring_batches(&self, within_days: i64) -> AppResult<Vec<StockBatch>> {
        let today = Utc::now().date_naive();
        let horizon = today + chrono::Duration::days(within_days);

        let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM stock_batches
            WHERE expiry_date > $1 AND expiry_date <= $2
            AND status NOT IN ('expired', 'damaged', 'recalled')
            ORDER BY expiry_date ASC
            "#
        ))
        .bind(today)
        .bind(horizon)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockBatchRow::into_model).collect()
    }

    /// Batches below their minimum stock level but not empty
    pub async fn find_low_stock_batches(&self) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM stock_batches
            WHERE quantity > 0 AND quantity < minimum_stock_level
            AND status IN ('available', 'low_stock')
            ORDER BY quantity ASC
            "#
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockBatchRow::into_model).collect()
    }

    /// Sweep: pin every batch whose expiry date has passed to EXPIRED.
    /// Returns the number of batches updated.
    pub async fn expire_overdue_batches(&self) -> AppResult<u64> {
        let today = Utc::now().date_naive();
        let result = sqlx::query(
            r#"
            UPDATE stock_batches
            SET status = 'expired', updated_at = NOW()
            WHERE expiry_date < $1 AND status NOT IN ('expired', 'damaged', 'recalled')
            "#,
        )
        .bind(today)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a batch
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM stock_batches WHERE id = $1")
            .bind(batch_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock batch".to_string()));
        }

        Ok(())
    }

    async fn sellable_batches(
        &self,
        product_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM stock_batches
            WHERE product_id = $1 AND status = 'available' AND quantity > 0
            AND (expiry_date IS NULL OR expiry_date >= $2)
            ORDER BY expiry_date ASC NULLS LAST
            "#
        ))
        .bind(product_id)
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockBatchRow::into_model).collect()
    }

    async fn set_status(&self, batch_id: Uuid, status: StockStatus) -> AppResult<StockBatch> {
        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r#"
            UPDATE stock_batches
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(status.as_str())
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;

        row.into_model()
    }
}
