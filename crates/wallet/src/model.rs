use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campusledger_core::{Money, StudentId};

/// Collection holding [`WalletTransaction`] documents.
pub const WALLET_TRANSACTIONS: &str = "wallet-transactions";

/// A student wallet transaction. Written by upstream wallet workflows; a
/// retried write can record the same real-world event twice, which is what
/// the reconciler exists to undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub student_id: StudentId,
    pub amount: Money,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}
