//! `campusledger-periods` — academic period entities and the active-period
//! resolver.

pub mod model;
pub mod resolver;

pub use model::{AcademicYear, PeriodStatus, Semester};
pub use resolver::{ActivePeriod, ActiveSemester, PeriodResolver};
