//! Entitlement ledger service
//!
//! Consumer of the payment processor's checkout-completion events. The
//! processor delivers at-least-once; the ledger append keyed on the unique
//! session id is the idempotent side effect, so a redelivered event (or a
//! retry after a transient write failure) can never double-grant a purchase.

use std::sync::Arc;

use printvault_core::models::{
    AssetTransaction, CheckoutCompleted, NewAssetTransaction, RecordOutcome, TransactionStatus,
};
use printvault_core::AppError;
use printvault_db::TransactionStore;

/// Entitlement ledger service
///
/// Records which purchaser owns which previously uploaded digital assets and
/// answers retrieval-time authorization queries. All durable state lives in
/// the backing store; every call is independent and may run concurrently.
pub struct EntitlementService {
    store: Arc<dyn TransactionStore>,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Record a completed checkout, granting the purchaser the event's asset
    /// references.
    ///
    /// Missing fields fail fast as caller errors and are never retried. A
    /// repeated session id returns `AlreadyRecorded` with the original
    /// record. Store failures surface as retryable errors; the processor's
    /// redelivery makes the eventual append safe.
    pub async fn record_completed_purchase(
        &self,
        event: CheckoutCompleted,
    ) -> Result<RecordOutcome, AppError> {
        if event.session_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing session id".to_string()));
        }
        if event.purchaser_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing purchaser id".to_string()));
        }
        if event.asset_refs.is_empty() {
            return Err(AppError::InvalidInput(
                "A completed purchase must reference at least one asset".to_string(),
            ));
        }

        let outcome = self
            .store
            .record(NewAssetTransaction {
                purchaser_id: event.purchaser_id,
                product_id: event.product_id,
                session_id: event.session_id,
                status: TransactionStatus::Completed,
                assets: event.asset_refs,
            })
            .await?;

        match &outcome {
            RecordOutcome::Created(tx) => {
                tracing::info!(
                    session_id = %tx.session_id,
                    purchaser_id = %tx.purchaser_id,
                    product_id = %tx.product_id,
                    asset_count = tx.assets.len(),
                    "Recorded completed purchase"
                );
            }
            RecordOutcome::AlreadyRecorded(tx) => {
                tracing::debug!(
                    session_id = %tx.session_id,
                    "Duplicate completion event; returning stored transaction"
                );
            }
        }

        Ok(outcome)
    }

    /// Record a failed checkout for audit. Grants no entitlements.
    pub async fn record_failed_checkout(
        &self,
        session_id: String,
        purchaser_id: String,
        product_id: String,
    ) -> Result<RecordOutcome, AppError> {
        if session_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing session id".to_string()));
        }
        if purchaser_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing purchaser id".to_string()));
        }

        self.store
            .record(NewAssetTransaction {
                purchaser_id,
                product_id,
                session_id,
                status: TransactionStatus::Failed,
                assets: vec![],
            })
            .await
    }

    /// All transactions for a purchaser, most recent first. Pure read; each
    /// call re-executes the filtered scan.
    pub async fn list_entitlements(
        &self,
        purchaser_id: &str,
    ) -> Result<Vec<AssetTransaction>, AppError> {
        self.store.list_by_purchaser(purchaser_id).await
    }

    /// Authorization gate: must be consulted before serving asset bytes.
    /// True iff some completed transaction for the purchaser contains the
    /// reference.
    pub async fn is_entitled(
        &self,
        purchaser_id: &str,
        asset_ref: &str,
    ) -> Result<bool, AppError> {
        self.store.is_entitled(purchaser_id, asset_ref).await
    }

    /// Look up the transaction recorded for a checkout session, if any.
    pub async fn get_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AssetTransaction>, AppError> {
        self.store.get_by_session(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory ledger mirroring the Postgres repository's semantics:
    /// unique session ids, append-only rows.
    #[derive(Default)]
    struct InMemoryLedger {
        rows: Mutex<Vec<AssetTransaction>>,
    }

    #[async_trait]
    impl TransactionStore for InMemoryLedger {
        async fn record(&self, new: NewAssetTransaction) -> Result<RecordOutcome, AppError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.iter().find(|tx| tx.session_id == new.session_id) {
                return Ok(RecordOutcome::AlreadyRecorded(existing.clone()));
            }
            // Spread timestamps so ordering assertions are deterministic
            let transaction_date =
                Utc::now() + Duration::milliseconds(rows.len() as i64);
            let tx = AssetTransaction {
                id: Uuid::new_v4(),
                purchaser_id: new.purchaser_id,
                product_id: new.product_id,
                session_id: new.session_id,
                status: new.status,
                assets: new.assets,
                transaction_date,
            };
            rows.push(tx.clone());
            Ok(RecordOutcome::Created(tx))
        }

        async fn list_by_purchaser(
            &self,
            purchaser_id: &str,
        ) -> Result<Vec<AssetTransaction>, AppError> {
            let mut rows: Vec<AssetTransaction> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|tx| tx.purchaser_id == purchaser_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
            Ok(rows)
        }

        async fn get_by_session(
            &self,
            session_id: &str,
        ) -> Result<Option<AssetTransaction>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|tx| tx.session_id == session_id)
                .cloned())
        }

        async fn is_entitled(
            &self,
            purchaser_id: &str,
            asset_ref: &str,
        ) -> Result<bool, AppError> {
            Ok(self.rows.lock().unwrap().iter().any(|tx| {
                tx.purchaser_id == purchaser_id
                    && tx.status == TransactionStatus::Completed
                    && tx.assets.iter().any(|a| a == asset_ref)
            }))
        }
    }

    fn service() -> EntitlementService {
        EntitlementService::new(Arc::new(InMemoryLedger::default()))
    }

    fn event(session: &str, purchaser: &str, assets: &[&str]) -> CheckoutCompleted {
        CheckoutCompleted {
            session_id: session.to_string(),
            purchaser_id: purchaser.to_string(),
            product_id: "prod_9".to_string(),
            asset_refs: assets.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn double_delivery_yields_one_transaction() {
        let service = service();

        let first = service
            .record_completed_purchase(event("sess_abc", "user_1", &["s3://bucket/a.glb"]))
            .await
            .unwrap();
        assert!(!first.is_replay());

        // Redelivery, even with different refs, must return the stored record
        let second = service
            .record_completed_purchase(event("sess_abc", "user_1", &["s3://bucket/b.glb"]))
            .await
            .unwrap();
        assert!(second.is_replay());
        assert_eq!(second.transaction(), first.transaction());
        assert_eq!(
            second.transaction().assets,
            vec!["s3://bucket/a.glb".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_fields_fail_fast() {
        let service = service();

        let err = service
            .record_completed_purchase(event("", "user_1", &["a.glb"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = service
            .record_completed_purchase(event("sess_1", "  ", &["a.glb"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = service
            .record_completed_purchase(event("sess_1", "user_1", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        // Nothing was written by the rejected attempts
        assert!(service.get_by_session("sess_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entitlement_is_immediate_and_scoped_to_purchaser() {
        let service = service();

        service
            .record_completed_purchase(event("sess_1", "user_1", &["assets/a.glb"]))
            .await
            .unwrap();

        assert!(service.is_entitled("user_1", "assets/a.glb").await.unwrap());
        assert!(!service.is_entitled("user_2", "assets/a.glb").await.unwrap());
        assert!(!service.is_entitled("user_1", "assets/b.glb").await.unwrap());
    }

    #[tokio::test]
    async fn listing_is_most_recent_first_and_isolated() {
        let service = service();

        for i in 0..3 {
            service
                .record_completed_purchase(event(
                    &format!("sess_{i}"),
                    "user_1",
                    &[&format!("assets/{i}.stl")],
                ))
                .await
                .unwrap();
        }
        service
            .record_completed_purchase(event("sess_other", "user_2", &["assets/x.glb"]))
            .await
            .unwrap();

        let listed = service.list_entitlements("user_1").await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|tx| tx.purchaser_id == "user_1"));
        assert_eq!(listed[0].session_id, "sess_2");
        assert_eq!(listed[2].session_id, "sess_0");
    }

    #[tokio::test]
    async fn failed_checkout_is_recorded_but_grants_nothing() {
        let service = service();

        service
            .record_failed_checkout(
                "sess_failed".to_string(),
                "user_1".to_string(),
                "prod_9".to_string(),
            )
            .await
            .unwrap();

        let stored = service
            .get_by_session("sess_failed")
            .await
            .unwrap()
            .expect("failed checkout not recorded");
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert!(stored.assets.is_empty());
        // History lists it, but it entitles the purchaser to nothing
        assert_eq!(service.list_entitlements("user_1").await.unwrap().len(), 1);
    }
}
