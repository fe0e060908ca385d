//! # request-db: Database Layer for POS Pre-Orders
//!
//! SQLite persistence for the pre-order ("request") extension: connection
//! pooling, embedded migrations and repository implementations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 POS Terminal Front-End                                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼─────────────────────────────────────────┐
//! │                 request-core (pure business logic)                      │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼─────────────────────────────────────────┐
//! │                 ★ request-db (THIS CRATE) ★                             │
//! │                                                                         │
//! │   ┌───────────┐  ┌────────────┐  ┌─────────────────────────────────┐   │
//! │   │   pool    │  │ migrations │  │          repository             │   │
//! │   │ Database  │  │  embedded  │  │  requests / products / configs  │   │
//! │   │ DbConfig  │  │    SQL     │  │  taxes / procurements           │   │
//! │   └───────────┘  └────────────┘  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//! ```rust,ignore
//! use request_db::{Database, DbConfig, NewRequest};
//!
//! let db = Database::new(DbConfig::new("./requests.db")).await?;
//!
//! let request = db
//!     .requests()
//!     .create_request(NewRequest::new("user-1", "sess-01", "terminal-1"))
//!     .await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// Re-exports for convenience
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::config::ConfigRepository;
pub use repository::procurement::ProcurementRepository;
pub use repository::product::ProductRepository;
pub use repository::request::{NewLine, NewRequest, RequestRepository};
pub use repository::tax::TaxRepository;
