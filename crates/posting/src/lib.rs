//! `campusledger-posting` — the ledger posting engine.
//!
//! Turns a business event (payroll payment, scholarship award) into a dual
//! write: a status transition on the source record plus an immutable entry in
//! the financial ledger, committed as one atomic bundle. Every mutating write
//! carries an optimistic precondition so retries and concurrent callers
//! degrade to no-ops instead of double-posting.

pub mod ledger;
pub mod poster;
pub mod request;

pub use ledger::{EntryKind, EntryType, FINANCE_TRANSACTIONS, LedgerTransaction, PostingStatus};
pub use poster::{LedgerPoster, PostingReport};
pub use request::{
    PAYROLL, PayrollRecord, PayrollStatus, RequestKind, SCHOLARSHIPS, ScholarshipRecord,
    ScholarshipStatus, Transition,
};
