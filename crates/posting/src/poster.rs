use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use campusledger_core::{DocId, DomainError, DomainResult, UserId};
use campusledger_periods::{ActivePeriod, PeriodResolver};
use campusledger_store::{
    DocumentStore, MAX_WRITES_PER_BATCH, Precondition, StoreError, Write, WriteBatch, to_payload,
};

use crate::ledger::{FINANCE_TRANSACTIONS, LedgerTransaction};
use crate::request::{PayrollRecord, RequestKind, ScholarshipRecord, Transition};

/// A pay sub-operation queues two writes (status update + ledger entry), so a
/// pay bundle holds at most half the store's write cap.
const MAX_IDS_PER_PAY_BUNDLE: usize = MAX_WRITES_PER_BATCH / 2;

/// Total commit attempts per chunk. A precondition failure re-reads the chunk
/// and retries only the ids that still qualify; a transient store failure
/// retries as-is.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Per-id outcome of a bulk posting call.
///
/// A call spanning more ids than one bundle holds is chunked; each chunk is
/// independently atomic and cross-chunk atomicity is NOT guaranteed, so a
/// partial run is possible and is reported here per id rather than collapsed
/// into one boolean.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingReport {
    /// Ids whose transition (and ledger entry, where applicable) committed.
    pub posted: Vec<DocId>,
    /// Ids skipped as idempotent no-ops (already past the required state).
    pub skipped: Vec<DocId>,
    /// Ids whose sub-operation could not be applied. Retrying with exactly
    /// these ids is safe: every write re-checks its precondition.
    pub failed: Vec<DocId>,
}

impl PostingReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What to do with one id after reading its current record.
enum Disposition {
    /// Record is past the required state: idempotent no-op.
    Skip,
    /// Queue these writes into the chunk's bundle.
    Apply(Vec<Write>),
    /// Sub-operation cannot proceed (e.g. payload serialization).
    Fail,
}

/// Executes state-transition-plus-ledger-entry operations atomically.
///
/// Every mutating write is expressed as "apply X only if the status field
/// still holds the qualifying value", checked by the store at commit time.
/// Two concurrent calls targeting the same record therefore resolve to one
/// posting and one no-op, never a double post.
#[derive(Debug)]
pub struct LedgerPoster<S> {
    store: S,
    resolver: PeriodResolver<S>,
}

impl<S: DocumentStore + Clone> LedgerPoster<S> {
    pub fn new(store: S) -> Self {
        let resolver = PeriodResolver::new(store.clone());
        Self { store, resolver }
    }

    /// Approve payroll requests: `pending → approved`. No financial effect.
    ///
    /// Bundle-level atomicity per chunk: within one chunk, either every
    /// queued approval commits or none does.
    pub fn approve_payroll(&self, ids: &[DocId], approver: &UserId) -> DomainResult<PostingReport> {
        let ids = validate_ids(ids)?;
        let mut report = PostingReport::default();

        for chunk in ids.chunks(MAX_WRITES_PER_BATCH) {
            self.run_payroll_chunk(chunk, &mut report, |id, record| {
                let Some(hop) = payroll_hop(record, "approved") else {
                    return Disposition::Skip;
                };
                let now = Utc::now();
                Disposition::Apply(vec![Write::update(
                    RequestKind::Payroll.collection(),
                    id.clone(),
                    json!({ "status": hop.to, "approved_by": approver, "updated_at": now }),
                    Precondition::field_equals("status", hop.from),
                )])
            });
        }

        finish(report)
    }

    /// Pay approved payroll requests: `approved → paid`, posting exactly one
    /// salary expense per qualifying id, reference `PAYROLL-<id>`.
    ///
    /// Re-invoking on already-paid ids is a silent no-op; a pay call never
    /// double-posts.
    pub fn pay_payroll(&self, ids: &[DocId], payer: &UserId) -> DomainResult<PostingReport> {
        let ids = validate_ids(ids)?;
        let period = self.period_tag();
        let mut report = PostingReport::default();

        for chunk in ids.chunks(MAX_IDS_PER_PAY_BUNDLE) {
            self.run_payroll_chunk(chunk, &mut report, |id, record| {
                let Some(hop) = payroll_hop(record, "paid") else {
                    return Disposition::Skip;
                };
                let now = Utc::now();
                let mut writes = vec![Write::update(
                    RequestKind::Payroll.collection(),
                    id.clone(),
                    json!({ "status": hop.to, "paid_by": payer, "paid_at": now, "updated_at": now }),
                    Precondition::field_equals("status", hop.from),
                )];
                if hop.posts_ledger {
                    let tx = LedgerTransaction::salary_expense(
                        id,
                        record.net_pay.clone(),
                        payer.clone(),
                        period.as_ref(),
                        now,
                    );
                    match to_payload(&tx) {
                        Ok(p) => writes.push(Write::create(FINANCE_TRANSACTIONS, p)),
                        Err(e) => {
                            warn!(%id, error = %e, "ledger payload serialization failed");
                            return Disposition::Fail;
                        }
                    }
                }
                Disposition::Apply(writes)
            });
        }

        finish(report)
    }

    /// Award a scholarship: `pending → awarded` plus one scholarship expense,
    /// committed as a single atomic bundle.
    ///
    /// Absent record → `NotFound`. Already awarded → idempotent no-op.
    pub fn award_scholarship(&self, id: &DocId, approver: &UserId) -> DomainResult<()> {
        let doc = self
            .store
            .get(RequestKind::Scholarship.collection(), id)
            .map_err(store_failed)?
            .ok_or_else(|| DomainError::not_found(format!("scholarship {id}")))?;
        let record: ScholarshipRecord = doc.to_model().map_err(store_failed)?;

        let Some(hop) = RequestKind::Scholarship
            .transition_from(record.status.as_str())
            .filter(|t| t.to == "awarded")
        else {
            info!(%id, "scholarship already awarded; nothing to do");
            return Ok(());
        };

        let period = self.period_tag();
        let now = Utc::now();
        let tx = LedgerTransaction::scholarship_expense(
            id,
            record.student_id.clone(),
            record.amount.clone(),
            approver.clone(),
            period.as_ref(),
            now,
        );

        let mut batch = WriteBatch::new();
        batch.push(Write::update(
            RequestKind::Scholarship.collection(),
            id.clone(),
            json!({ "status": hop.to, "approved_by": approver, "awarded_at": now, "updated_at": now }),
            Precondition::field_equals("status", hop.from),
        ));
        batch.push(Write::create(
            FINANCE_TRANSACTIONS,
            to_payload(&tx).map_err(store_failed)?,
        ));

        match self.store.commit(batch) {
            Ok(_) => {
                info!(%id, amount = %tx.amount, "scholarship awarded and posted");
                Ok(())
            }
            Err(e) if e.is_precondition_failure() => {
                // Lost a race on the same record. If the award landed through
                // the other caller, this call's work is already done.
                let awarded = self
                    .store
                    .get(RequestKind::Scholarship.collection(), id)
                    .map_err(store_failed)?
                    .as_ref()
                    .and_then(|d| d.str_field("status"))
                    == Some("awarded");
                if awarded {
                    info!(%id, "scholarship awarded concurrently; treating as no-op");
                    Ok(())
                } else {
                    Err(store_failed(e))
                }
            }
            Err(e) => Err(store_failed(e)),
        }
    }

    /// Run one chunk of payroll ids: read each record, let `plan` decide the
    /// writes, commit the bundle, and retry on conflict with the survivors.
    fn run_payroll_chunk<F>(&self, chunk: &[DocId], report: &mut PostingReport, mut plan: F)
    where
        F: FnMut(&DocId, &PayrollRecord) -> Disposition,
    {
        let mut remaining: Vec<DocId> = chunk.to_vec();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut batch = WriteBatch::new();
            let mut queued: Vec<DocId> = Vec::new();

            for id in &remaining {
                match self.read_payroll(id) {
                    Ok(Some(record)) => match plan(id, &record) {
                        Disposition::Skip => report.skipped.push(id.clone()),
                        Disposition::Fail => report.failed.push(id.clone()),
                        Disposition::Apply(writes) => {
                            for w in writes {
                                batch.push(w);
                            }
                            queued.push(id.clone());
                        }
                    },
                    Ok(None) => {
                        warn!(%id, "payroll record not found; reporting as failed");
                        report.failed.push(id.clone());
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "payroll record read failed");
                        report.failed.push(id.clone());
                    }
                }
            }

            if queued.is_empty() {
                return;
            }

            match self.store.commit(batch) {
                Ok(_) => {
                    report.posted.extend(queued);
                    return;
                }
                Err(e) if e.is_precondition_failure() => {
                    warn!(attempt, error = %e, "concurrent transition detected; re-reading chunk");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "bundle commit failed");
                }
            }

            if attempt >= MAX_COMMIT_ATTEMPTS {
                report.failed.extend(queued);
                return;
            }
            // Retry only the ids we queued; resolved ids stay resolved.
            remaining = queued;
        }
    }

    fn read_payroll(&self, id: &DocId) -> Result<Option<PayrollRecord>, StoreError> {
        self.store
            .get(RequestKind::Payroll.collection(), id)?
            .map(|d| d.to_model())
            .transpose()
    }

    /// Best-effort period metadata for ledger entries. An unset or unreadable
    /// period never blocks a financial write; the entry goes out untagged.
    fn period_tag(&self) -> Option<ActivePeriod> {
        match self.resolver.resolve_active() {
            Ok(p) => Some(p),
            Err(DomainError::AcademicPeriodUnset) => {
                warn!("no active academic year; ledger entries will be untagged");
                None
            }
            Err(e) => {
                warn!(error = %e, "period resolution failed; ledger entries will be untagged");
                None
            }
        }
    }
}

fn validate_ids(ids: &[DocId]) -> DomainResult<Vec<DocId>> {
    if ids.is_empty() {
        return Err(DomainError::validation("id list must not be empty"));
    }
    // Duplicates in one call would double-queue writes on one record.
    let mut seen = std::collections::HashSet::new();
    Ok(ids
        .iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect())
}

/// Collapse a finished report: when every sub-operation failed at commit and
/// nothing was applied or skipped, the store itself is the problem and the
/// call surfaces `CommitFailed`; otherwise per-id reporting stands.
fn finish(report: PostingReport) -> DomainResult<PostingReport> {
    if !report.failed.is_empty() && report.posted.is_empty() && report.skipped.is_empty() {
        return Err(DomainError::commit_failed(format!(
            "no sub-operation could be applied ({} failed)",
            report.failed.len()
        )));
    }
    Ok(report)
}

fn store_failed(e: StoreError) -> DomainError {
    DomainError::commit_failed(e.to_string())
}

/// The declared payroll hop out of the record's current status, if it
/// targets `to`. Any other state means the operation is a no-op for this id.
fn payroll_hop(record: &PayrollRecord, to: &str) -> Option<Transition> {
    RequestKind::Payroll
        .transition_from(record.status.as_str())
        .filter(|t| t.to == to)
}
