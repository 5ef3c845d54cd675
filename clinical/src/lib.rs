// clinical/src/lib.rs
//
// Core clinical services. Each service takes the caller's resolved
// `CallerContext` by parameter, checks permissions and row scope, validates
// payloads, then delegates to storage. Lifecycle atomicity lives in storage;
// policy lives here.

pub mod events;
pub mod lifecycle;
pub mod schedules;

pub use events::EventRecorder;
pub use lifecycle::SessionLifecycle;
pub use schedules::ScheduleManager;
