use async_trait::async_trait;
use printvault_core::models::{
    AssetTransaction, NewAssetTransaction, RecordOutcome, TransactionStatus,
};
use printvault_core::AppError;
use sqlx::PgPool;

/// Persistence contract for the entitlement ledger.
///
/// The Postgres repository below is the production implementation; service
/// tests substitute in-memory fakes.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Append exactly one immutable transaction. A previously seen
    /// `session_id` is a no-op returning the stored record.
    async fn record(&self, new: NewAssetTransaction) -> Result<RecordOutcome, AppError>;

    /// All transactions for a purchaser, most recent first.
    async fn list_by_purchaser(
        &self,
        purchaser_id: &str,
    ) -> Result<Vec<AssetTransaction>, AppError>;

    /// Look up a transaction by checkout session id.
    async fn get_by_session(&self, session_id: &str)
        -> Result<Option<AssetTransaction>, AppError>;

    /// True iff some completed transaction for the purchaser contains the
    /// asset reference.
    async fn is_entitled(&self, purchaser_id: &str, asset_ref: &str) -> Result<bool, AppError>;
}

/// Repository for the append-only `asset_transactions` ledger.
///
/// No update or delete queries exist here on purpose: a written transaction
/// is the permanent proof of entitlement.
#[derive(Clone)]
pub struct AssetTransactionRepository {
    pool: PgPool,
}

impl AssetTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for AssetTransactionRepository {
    async fn record(&self, new: NewAssetTransaction) -> Result<RecordOutcome, AppError> {
        // The unique index on session_id is the idempotency guard: two
        // concurrent writers for the same session race safely to one row,
        // and the loser falls through to the fetch below.
        let inserted = sqlx::query_as::<_, AssetTransaction>(
            r#"
            INSERT INTO asset_transactions (purchaser_id, product_id, session_id, status, assets)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING id, purchaser_id, product_id, session_id, status, assets, transaction_date
            "#,
        )
        .bind(&new.purchaser_id)
        .bind(&new.product_id)
        .bind(&new.session_id)
        .bind(new.status.as_str())
        .bind(&new.assets)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(tx) = inserted {
            tracing::info!(
                session_id = %tx.session_id,
                purchaser_id = %tx.purchaser_id,
                asset_count = tx.assets.len(),
                "Appended asset transaction"
            );
            return Ok(RecordOutcome::Created(tx));
        }

        let existing = self.get_by_session(&new.session_id).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Transaction for session {} missing after conflicting insert",
                new.session_id
            ))
        })?;
        tracing::debug!(
            session_id = %existing.session_id,
            "Duplicate session id; returning stored transaction"
        );
        Ok(RecordOutcome::AlreadyRecorded(existing))
    }

    async fn list_by_purchaser(
        &self,
        purchaser_id: &str,
    ) -> Result<Vec<AssetTransaction>, AppError> {
        let transactions = sqlx::query_as::<_, AssetTransaction>(
            r#"
            SELECT id, purchaser_id, product_id, session_id, status, assets, transaction_date
            FROM asset_transactions
            WHERE purchaser_id = $1
            ORDER BY transaction_date DESC
            "#,
        )
        .bind(purchaser_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn get_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AssetTransaction>, AppError> {
        let transaction = sqlx::query_as::<_, AssetTransaction>(
            r#"
            SELECT id, purchaser_id, product_id, session_id, status, assets, transaction_date
            FROM asset_transactions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn is_entitled(&self, purchaser_id: &str, asset_ref: &str) -> Result<bool, AppError> {
        let entitled = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM asset_transactions
                WHERE purchaser_id = $1
                  AND status = $2
                  AND $3 = ANY(assets)
            )
            "#,
        )
        .bind(purchaser_id)
        .bind(TransactionStatus::Completed.as_str())
        .bind(asset_ref)
        .fetch_one(&self.pool)
        .await?;

        Ok(entitled)
    }
}
