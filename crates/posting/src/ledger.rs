use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use campusledger_core::{DocId, Money, StudentId, UserId};
use campusledger_periods::ActivePeriod;

/// Collection holding [`LedgerTransaction`] documents.
pub const FINANCE_TRANSACTIONS: &str = "finance-transactions";

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

/// Business category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Salary,
    Scholarship,
}

/// A posted entry is posted; there is no other state. Once created the entry
/// is never mutated or deleted by normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingStatus {
    Posted,
}

/// Immutable, append-only record of a financial event. Exactly one is created
/// per qualifying transition — never zero, never more than one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub kind: EntryKind,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Money,
    pub date: NaiveDate,
    /// Ties the entry back to its source record, e.g. `PAYROLL-<id>`.
    pub reference: String,
    pub description: String,
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub status: PostingStatus,
}

impl LedgerTransaction {
    /// Template for the `approved → paid` payroll hop.
    pub fn salary_expense(
        payroll_id: &DocId,
        net_pay: Money,
        payer: UserId,
        period: Option<&ActivePeriod>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EntryKind::Expense,
            entry_type: EntryType::Salary,
            amount: net_pay,
            date: now.date_naive(),
            reference: format!("PAYROLL-{payroll_id}"),
            description: format!("Salary payment for payroll {payroll_id}"),
            student_id: None,
            academic_year: period.map(|p| p.year.clone()),
            semester: period.and_then(|p| p.semester.as_ref()).map(|s| s.name.clone()),
            created_by: payer,
            created_at: now,
            status: PostingStatus::Posted,
        }
    }

    /// Template for the `pending → awarded` scholarship hop.
    pub fn scholarship_expense(
        scholarship_id: &DocId,
        student_id: StudentId,
        amount: Money,
        approver: UserId,
        period: Option<&ActivePeriod>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EntryKind::Expense,
            entry_type: EntryType::Scholarship,
            amount,
            date: now.date_naive(),
            reference: format!("SCHOLARSHIP-{scholarship_id}"),
            description: format!("Scholarship award {scholarship_id}"),
            student_id: Some(student_id),
            academic_year: period.map(|p| p.year.clone()),
            semester: period.and_then(|p| p.semester.as_ref()).map(|s| s.name.clone()),
            created_by: approver,
            created_at: now,
            status: PostingStatus::Posted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_template_references_its_payroll_record() {
        let tx = LedgerTransaction::salary_expense(
            &DocId::new("p42").unwrap(),
            Money::new(120_000, "GHS").unwrap(),
            UserId::new("fin1").unwrap(),
            None,
            Utc::now(),
        );
        assert_eq!(tx.kind, EntryKind::Expense);
        assert_eq!(tx.entry_type, EntryType::Salary);
        assert_eq!(tx.reference, "PAYROLL-p42");
        assert_eq!(tx.academic_year, None);

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "salary");
        assert_eq!(json["status"], "posted");
    }
}
