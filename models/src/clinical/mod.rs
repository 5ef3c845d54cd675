// models/src/clinical/mod.rs

pub mod hd_session;
pub mod nurse_schedule;
pub mod patient_schedule;
pub mod session_event;
pub mod vitals;
