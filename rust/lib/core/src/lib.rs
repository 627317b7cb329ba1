pub mod config;
pub mod error;
pub mod page;
pub mod types;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use page::{Page, PageKind, PageRequest};
pub use types::{new_id, now_rfc3339};
