// rest_api/src/handlers/mod.rs

pub mod events;
pub mod google;
pub mod portal;
pub mod schedules;
pub mod sessions;
