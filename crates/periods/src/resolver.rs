use serde_json::json;
use tracing::warn;

use campusledger_core::{DomainError, DomainResult};
use campusledger_store::{DocumentStore, StoreError};

use crate::model::{AcademicYear, PeriodStatus, Semester};

/// Collection holding [`AcademicYear`] documents.
pub const ACADEMIC_YEARS: &str = "academic-years";
/// Collection holding [`Semester`] documents.
pub const SEMESTERS: &str = "semesters";

/// The currently active semester, as part of an [`ActivePeriod`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSemester {
    pub name: String,
    pub number: u8,
}

/// The resolved active period. `semester` is `None` when the active year has
/// no active semester; callers still get the year for partial display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePeriod {
    pub year: String,
    pub semester: Option<ActiveSemester>,
}

/// Resolves the currently active academic year and semester.
///
/// This is a pure query against period entities on every call. No cached
/// singleton: an administrator can change the active year at any time, and a
/// cache would serve stale periods until invalidated.
#[derive(Debug)]
pub struct PeriodResolver<S> {
    store: S,
}

impl<S: DocumentStore> PeriodResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve the active year and semester.
    ///
    /// No active year is a configuration gap surfaced as
    /// [`DomainError::AcademicPeriodUnset`]. More than one active year
    /// violates a data invariant; the resolver picks deterministically (latest
    /// start date, then greatest year label) and flags the anomaly, because
    /// callers still need a best-effort answer.
    pub fn resolve_active(&self) -> DomainResult<ActivePeriod> {
        let active_years: Vec<AcademicYear> = self
            .store
            .find_by_field(ACADEMIC_YEARS, "status", &json!(PeriodStatus::Active.as_str()))
            .map_err(read_failed)?
            .iter()
            .map(|d| d.to_model().map_err(read_failed))
            .collect::<Result<_, _>>()?;

        let year = match active_years.len() {
            0 => return Err(DomainError::AcademicPeriodUnset),
            1 => active_years.into_iter().next().unwrap_or_else(|| unreachable!()),
            n => {
                let chosen = active_years
                    .into_iter()
                    .max_by(|a, b| {
                        a.start_date
                            .cmp(&b.start_date)
                            .then_with(|| a.year.cmp(&b.year))
                    })
                    .unwrap_or_else(|| unreachable!());
                warn!(
                    active_years = n,
                    chosen = %chosen.year,
                    "multiple academic years flagged active; using latest start date"
                );
                chosen
            }
        };

        let semester = self
            .active_semester_for(&year.year)?
            .map(|s| ActiveSemester {
                name: s.name,
                number: s.number,
            });
        if semester.is_none() {
            warn!(year = %year.year, "active year has no active semester");
        }

        Ok(ActivePeriod {
            year: year.year,
            semester,
        })
    }

    fn active_semester_for(&self, year: &str) -> DomainResult<Option<Semester>> {
        let semesters: Vec<Semester> = self
            .store
            .find_by_field(SEMESTERS, "status", &json!(PeriodStatus::Active.as_str()))
            .map_err(read_failed)?
            .iter()
            .map(|d| d.to_model().map_err(read_failed))
            .collect::<Result<_, _>>()?;

        Ok(semesters.into_iter().find(|s| s.year == year))
    }
}

fn read_failed(e: StoreError) -> DomainError {
    DomainError::commit_failed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusledger_store::{InMemoryDocumentStore, Write, WriteBatch};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn seed_year(store: &InMemoryDocumentStore, year: &str, start: (i32, u32, u32), status: &str) {
        let mut batch = WriteBatch::new();
        batch.push(Write::create(
            ACADEMIC_YEARS,
            json!({
                "year": year,
                "start_date": NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
                "status": status,
            }),
        ));
        store.commit(batch).unwrap();
    }

    fn seed_semester(store: &InMemoryDocumentStore, year: &str, name: &str, number: u8, status: &str) {
        let mut batch = WriteBatch::new();
        batch.push(Write::create(
            SEMESTERS,
            json!({ "year": year, "name": name, "number": number, "status": status }),
        ));
        store.commit(batch).unwrap();
    }

    #[test]
    fn no_active_year_is_a_configuration_gap() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_year(&store, "2023/2024", (2023, 9, 1), "closed");

        let resolver = PeriodResolver::new(Arc::clone(&store));
        assert_eq!(
            resolver.resolve_active().unwrap_err(),
            DomainError::AcademicPeriodUnset
        );
    }

    #[test]
    fn single_active_year_with_semester_resolves_fully() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_year(&store, "2024/2025", (2024, 9, 1), "active");
        seed_semester(&store, "2024/2025", "First Semester", 1, "active");
        seed_semester(&store, "2023/2024", "Second Semester", 2, "active");

        let period = PeriodResolver::new(Arc::clone(&store)).resolve_active().unwrap();
        assert_eq!(period.year, "2024/2025");
        let semester = period.semester.unwrap();
        assert_eq!(semester.name, "First Semester");
        assert_eq!(semester.number, 1);
    }

    #[test]
    fn missing_active_semester_yields_partial_period() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_year(&store, "2024/2025", (2024, 9, 1), "active");
        seed_semester(&store, "2024/2025", "First Semester", 1, "closed");

        let period = PeriodResolver::new(Arc::clone(&store)).resolve_active().unwrap();
        assert_eq!(period.year, "2024/2025");
        assert_eq!(period.semester, None);
    }

    #[test]
    fn two_active_years_pick_the_latest_start_date() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_year(&store, "2023/2024", (2023, 9, 1), "active");
        seed_year(&store, "2024/2025", (2024, 9, 1), "active");

        let period = PeriodResolver::new(Arc::clone(&store)).resolve_active().unwrap();
        assert_eq!(period.year, "2024/2025");
    }

    #[test]
    fn equal_start_dates_fall_back_to_greatest_year_label() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_year(&store, "2024/2025", (2024, 9, 1), "active");
        seed_year(&store, "2025/2026", (2024, 9, 1), "active");

        let period = PeriodResolver::new(Arc::clone(&store)).resolve_active().unwrap();
        assert_eq!(period.year, "2025/2026");
    }
}
