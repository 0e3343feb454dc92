//! Identity resolution, reconciliation and the service façade on top of them.

mod error;
mod reconcile;
mod resolver;
mod service;

pub use error::{Result, ServiceError};
pub use reconcile::{SyncOptions, SyncReport};
pub use service::CollaborationService;
