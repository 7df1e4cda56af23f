use std::collections::HashMap;

use tracing::{info, warn};

use campusledger_core::{DocId, DomainError, DomainResult, Money, StudentId};
use campusledger_store::{
    DocumentStore, MAX_WRITES_PER_BATCH, Precondition, StoreError, Write, WriteBatch,
};

use crate::model::{WALLET_TRANSACTIONS, WalletTransaction};

/// Equivalence key: two wallet transactions sharing this triple are the same
/// real-world event recorded twice (e.g. from a retried write).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub student_id: StudentId,
    pub reference: String,
    pub amount: Money,
}

/// A set of transactions sharing one equivalence key. `keep` is the earliest
/// by `created_at` (ties broken by smallest document id); the rest are marked
/// for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    pub keep: DocId,
    pub remove: Vec<DocId>,
}

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Transactions deleted in this run.
    pub removed: usize,
    /// Transactions surviving after this run.
    pub kept: usize,
    /// Groups whose delete bundle failed; recounted on the next run.
    pub failed_groups: usize,
}

/// Read-only aggregate counts over the wallet transaction log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletStats {
    pub total: usize,
    pub duplicate_groups: usize,
    pub pending_removal: usize,
}

/// Scans the wallet transaction log for duplicate postings and removes the
/// redundant entries.
///
/// Deletions are per-group atomic bundles (split only when a group exceeds
/// the store's write cap); one group's failure never blocks the others. The
/// whole operation is idempotent: a second run over a clean log removes
/// nothing.
#[derive(Debug)]
pub struct WalletReconciler<S> {
    store: S,
}

impl<S: DocumentStore> WalletReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Group all wallet transactions by equivalence key and report every
    /// group with more than one member, in deterministic (survivor id) order.
    pub fn find_duplicates(&self) -> DomainResult<Vec<DuplicateGroup>> {
        let transactions = self.load_all()?;

        let mut by_key: HashMap<DuplicateKey, Vec<(DocId, WalletTransaction)>> = HashMap::new();
        for (id, tx) in transactions {
            let key = DuplicateKey {
                student_id: tx.student_id.clone(),
                reference: tx.reference.clone(),
                amount: tx.amount.clone(),
            };
            by_key.entry(key).or_default().push((id, tx));
        }

        let mut groups: Vec<DuplicateGroup> = by_key
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, mut members)| {
                members.sort_by(|(a_id, a), (b_id, b)| {
                    a.created_at.cmp(&b.created_at).then_with(|| a_id.cmp(b_id))
                });
                let keep = members[0].0.clone();
                let remove = members[1..].iter().map(|(id, _)| id.clone()).collect();
                DuplicateGroup { key, keep, remove }
            })
            .collect();

        groups.sort_by(|a, b| a.keep.cmp(&b.keep));
        Ok(groups)
    }

    /// Delete the redundant members of every duplicate group.
    ///
    /// Each group's deletions commit together up to the store's write cap; a
    /// pathological group with more redundant members than one bundle holds
    /// is split across bundles, so its removal is no longer all-or-nothing —
    /// but the `Exists` guard keeps a rerun over the leftovers safe. A failed
    /// group is skipped, counted, and picked up again by the next run.
    pub fn cleanup(&self) -> DomainResult<CleanupReport> {
        let total = self.load_all()?.len();
        let groups = self.find_duplicates()?;

        let mut report = CleanupReport::default();
        for group in &groups {
            let mut group_failed = false;
            for chunk in group.remove.chunks(MAX_WRITES_PER_BATCH) {
                let mut batch = WriteBatch::new();
                for id in chunk {
                    // Exists guards the already-cleaned case: a retried run
                    // after a partial failure must not trip over deleted
                    // documents.
                    batch.push(Write::delete(
                        WALLET_TRANSACTIONS,
                        id.clone(),
                        Precondition::Exists,
                    ));
                }
                match self.store.commit(batch) {
                    Ok(_) => report.removed += chunk.len(),
                    Err(e) => {
                        warn!(keep = %group.keep, error = %e, "duplicate group cleanup failed");
                        group_failed = true;
                        break;
                    }
                }
            }
            if group_failed {
                report.failed_groups += 1;
            }
        }
        report.kept = total - report.removed;

        if report.failed_groups > 0 && report.failed_groups == groups.len() {
            return Err(DomainError::commit_failed(format!(
                "every duplicate group failed to clean ({})",
                report.failed_groups
            )));
        }
        info!(
            removed = report.removed,
            kept = report.kept,
            failed_groups = report.failed_groups,
            "wallet reconciliation finished"
        );
        Ok(report)
    }

    /// Aggregate counts. Read-only; performs no writes.
    pub fn stats(&self) -> DomainResult<WalletStats> {
        let total = self.load_all()?.len();
        let groups = self.find_duplicates()?;
        Ok(WalletStats {
            total,
            duplicate_groups: groups.len(),
            pending_removal: groups.iter().map(|g| g.remove.len()).sum(),
        })
    }

    fn load_all(&self) -> DomainResult<Vec<(DocId, WalletTransaction)>> {
        self.store
            .list(WALLET_TRANSACTIONS)
            .map_err(read_failed)?
            .iter()
            .map(|d| Ok((d.id.clone(), d.to_model().map_err(read_failed)?)))
            .collect()
    }
}

fn read_failed(e: StoreError) -> DomainError {
    DomainError::commit_failed(e.to_string())
}
