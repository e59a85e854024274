use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment-processor "checkout session completed" event payload.
///
/// Delivered at-least-once; the entitlement ledger append keyed on
/// `session_id` is the idempotent side effect.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutCompleted {
    pub session_id: String,
    /// Authenticated purchaser identity supplied by the identity provider.
    pub purchaser_id: String,
    pub product_id: String,
    /// Object-storage keys of the purchased assets, already accepted by the
    /// upload validator when they were produced.
    pub asset_refs: Vec<String>,
}
