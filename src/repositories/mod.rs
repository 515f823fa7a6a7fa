//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with building-scoped methods.

pub mod credential;
pub mod property;
pub mod sync_config;
pub mod sync_error;
pub mod sync_status;
pub mod transaction;

pub use credential::CredentialRepository;
pub use property::PropertyRepository;
pub use sync_config::SyncConfigRepository;
pub use sync_error::SyncErrorRepository;
pub use sync_status::SyncStatusRepository;
pub use transaction::TransactionRepository;
