// calendar/src/lib.rs
//
// External calendar integration: a thin Google Calendar client behind the
// `CalendarApi` trait, and the reconciliation worker that pushes schedule
// slots as events and keeps the pushes idempotent through mapping rows.

pub mod google;
pub mod worker;

pub use google::{CalendarApi, EventPayload, GoogleCalendarApi, GoogleConfig, TokenResponse};
pub use worker::{ConnectionStatus, ReconciliationWorker};
