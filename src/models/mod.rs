//! Domain models for calendars, punch records, and report periods.

pub mod calendar;
pub mod period;
pub mod punch;

pub use calendar::{Calendar, CalendarDay, DayKind};
pub use period::ReportPeriod;
pub use punch::PunchRecord;
