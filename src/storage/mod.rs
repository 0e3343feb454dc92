mod error;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStorage;
pub use traits::{Store, StoreRead, StoreTx, StoreWrite};
