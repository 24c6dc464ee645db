//! HTTP adapters.
//!
//! - `webhook` - Gateway webhook receiver and application router
//! - `background` - Tracker for work scheduled after acknowledgement

pub mod background;
pub mod webhook;

pub use background::{BackgroundTasks, DrainReport, SchedulerClosed};
pub use webhook::{app_router, WebhookAppState};
