//! `SeaORM` Entity prelude.

pub use super::calendars::Entity as Calendars;
pub use super::records::Entity as Records;
