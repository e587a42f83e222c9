//! `SeaORM` Entity definitions.

pub mod prelude;

pub mod calendars;
pub mod records;
