use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a recorded checkout. Stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("Unknown transaction status: {}", other)),
        }
    }
}

/// One immutable entry in the entitlement ledger: proof that a purchaser
/// acquired a set of digital assets in a single checkout.
///
/// Rows are append-only. `session_id` is unique across the ledger and serves
/// as the idempotency key for redelivered payment-completion events. The
/// `assets` sequence is non-empty for completed rows and never edited after
/// the row is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetTransaction {
    pub id: Uuid,
    /// Opaque purchaser identity from the identity provider.
    pub purchaser_id: String,
    /// Opaque reference to the externally owned Product entity.
    pub product_id: String,
    /// Payment-processor checkout session id, unique per completed checkout.
    pub session_id: String,
    pub status: TransactionStatus,
    /// Object-storage keys granted by this purchase, in checkout order.
    pub assets: Vec<String>,
    pub transaction_date: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AssetTransaction {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<TransactionStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: e.into(),
            })?;

        Ok(AssetTransaction {
            id: row.try_get("id")?,
            purchaser_id: row.try_get("purchaser_id")?,
            product_id: row.try_get("product_id")?,
            session_id: row.try_get("session_id")?,
            status,
            assets: row.try_get("assets")?,
            transaction_date: row.try_get("transaction_date")?,
        })
    }
}

/// Insert payload for a ledger append.
#[derive(Debug, Clone)]
pub struct NewAssetTransaction {
    pub purchaser_id: String,
    pub product_id: String,
    pub session_id: String,
    pub status: TransactionStatus,
    pub assets: Vec<String>,
}

/// Result of a ledger append. A repeated `session_id` is a successful no-op
/// carrying the originally stored record, not an error.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Created(AssetTransaction),
    AlreadyRecorded(AssetTransaction),
}

impl RecordOutcome {
    pub fn transaction(&self) -> &AssetTransaction {
        match self {
            RecordOutcome::Created(tx) | RecordOutcome::AlreadyRecorded(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> AssetTransaction {
        match self {
            RecordOutcome::Created(tx) | RecordOutcome::AlreadyRecorded(tx) => tx,
        }
    }

    /// True when the append was a duplicate-delivery no-op.
    pub fn is_replay(&self) -> bool {
        matches!(self, RecordOutcome::AlreadyRecorded(_))
    }
}
