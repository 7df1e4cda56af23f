//! `campusledger-store` — document store contract and in-memory implementation.
//!
//! The underlying store offers only atomic *batched* writes without
//! cross-request isolation. This crate pins down the contracts the posting
//! engine requires from it: all-or-nothing write bundles, optimistic
//! field-equality preconditions checked at commit time, and a transactional
//! counter increment that never hands the same value to two callers.

pub mod batch;
pub mod document;
pub mod memory;
pub mod store;

pub use batch::{MAX_WRITES_PER_BATCH, Precondition, Write, WriteBatch};
pub use document::{Document, to_payload};
pub use memory::InMemoryDocumentStore;
pub use store::{DocumentStore, StoreError};
