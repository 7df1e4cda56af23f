use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campusledger_core::{Money, StaffId, StudentId, UserId};

/// Collection holding [`PayrollRecord`] documents.
pub const PAYROLL: &str = "payroll";
/// Collection holding [`ScholarshipRecord`] documents.
pub const SCHOLARSHIPS: &str = "scholarships";

/// Workflow kinds the posting engine manages.
///
/// Each kind declares its transition table and which hop posts a ledger
/// entry; adding a workflow (transfers, procurement) means declaring a new
/// table and ledger template, not a new code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Payroll,
    Scholarship,
}

/// One legal hop in a kind's lifecycle. Transitions are forward-only; a hop
/// attempted from any other state is a no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: &'static str,
    pub to: &'static str,
    /// Whether applying this hop emits exactly one ledger entry.
    pub posts_ledger: bool,
}

impl RequestKind {
    pub fn collection(self) -> &'static str {
        match self {
            RequestKind::Payroll => PAYROLL,
            RequestKind::Scholarship => SCHOLARSHIPS,
        }
    }

    /// Declared lifecycle of this kind, in order.
    pub fn transitions(self) -> &'static [Transition] {
        match self {
            RequestKind::Payroll => &[
                Transition {
                    from: "pending",
                    to: "approved",
                    posts_ledger: false,
                },
                Transition {
                    from: "approved",
                    to: "paid",
                    posts_ledger: true,
                },
            ],
            RequestKind::Scholarship => &[Transition {
                from: "pending",
                to: "awarded",
                posts_ledger: true,
            }],
        }
    }

    /// Look up the declared hop out of `from`, if any.
    pub fn transition_from(self, from: &str) -> Option<Transition> {
        self.transitions().iter().copied().find(|t| t.from == from)
    }
}

/// Payroll lifecycle: `pending → approved → paid` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    Pending,
    Approved,
    Paid,
}

impl PayrollStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PayrollStatus::Pending => "pending",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Paid => "paid",
        }
    }
}

/// Scholarship lifecycle: `pending → awarded` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScholarshipStatus {
    Pending,
    Awarded,
}

impl ScholarshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScholarshipStatus::Pending => "pending",
            ScholarshipStatus::Awarded => "awarded",
        }
    }
}

/// A payroll payment request. Created upstream in `pending`; owned by the
/// posting engine from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub staff_id: StaffId,
    pub status: PayrollStatus,
    pub net_pay: Money,
    pub requested_by: UserId,
    #[serde(default)]
    pub approved_by: Option<UserId>,
    #[serde(default)]
    pub paid_by: Option<UserId>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scholarship award request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarshipRecord {
    pub student_id: StudentId,
    pub status: ScholarshipStatus,
    pub amount: Money,
    pub requested_by: UserId,
    #[serde(default)]
    pub approved_by: Option<UserId>,
    #[serde(default)]
    pub awarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payroll_table_posts_only_on_the_final_hop() {
        let table = RequestKind::Payroll.transitions();
        assert_eq!(table.len(), 2);
        assert!(!table[0].posts_ledger);
        assert!(table[1].posts_ledger);
        assert_eq!(table[1].from, "approved");
        assert_eq!(table[1].to, "paid");
    }

    #[test]
    fn kinds_map_to_their_collections() {
        assert_eq!(RequestKind::Payroll.collection(), PAYROLL);
        assert_eq!(RequestKind::Scholarship.collection(), SCHOLARSHIPS);
    }

    #[test]
    fn terminal_states_have_no_outgoing_transition() {
        assert!(RequestKind::Payroll.transition_from("paid").is_none());
        assert!(RequestKind::Scholarship.transition_from("awarded").is_none());
    }

    #[test]
    fn status_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(PayrollStatus::Approved).unwrap(),
            serde_json::json!("approved")
        );
        assert_eq!(
            serde_json::to_value(ScholarshipStatus::Awarded).unwrap(),
            serde_json::json!("awarded")
        );
    }
}
