//! # Repository Module
//!
//! Database repository implementations for the pre-order schema.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Terminal code                                                         │
//! │       │                                                                 │
//! │       │  db.requests().mark_line_done(line_id)                         │
//! │       ▼                                                                 │
//! │  RequestRepository                                                     │
//! │  ├── create_request(&self, new)                                        │
//! │  ├── add_line(&self, new)                                              │
//! │  ├── mark_line_done(&self, line_id)                                    │
//! │  └── finalize_order(&self, payload)                                    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Easy to test against an in-memory database                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`request::RequestRepository`] - Request/line lifecycle and totals
//! - [`product::ProductRepository`] - Product CRUD and lookups
//! - [`config::ConfigRepository`] - Per-terminal pre-order settings
//! - [`tax::TaxRepository`] - Taxes and fiscal positions
//! - [`procurement::ProcurementRepository`] - Fulfillment procurements

pub mod config;
pub mod procurement;
pub mod product;
pub mod request;
pub mod tax;
