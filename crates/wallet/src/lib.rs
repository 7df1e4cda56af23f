//! `campusledger-wallet` — duplicate detection and cleanup for wallet
//! transactions.
//!
//! The reconciler mutates only `wallet-transactions`; the payroll and
//! scholarship ledger is never touched from here.

pub mod model;
pub mod reconciler;

pub use model::{WALLET_TRANSACTIONS, WalletTransaction};
pub use reconciler::{CleanupReport, DuplicateGroup, DuplicateKey, WalletReconciler, WalletStats};
