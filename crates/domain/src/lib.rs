//! Domain layer - Link and protocol types with no I/O of their own
//!
//! This crate contains:
//! - Connection state machine and target addresses
//! - The Transport port (trait) implemented by infrastructure
//! - The command frame codec and the status text scanner
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Protocol rules enforced at domain level
//! - Testable in isolation

pub mod error;
pub mod link;
pub mod protocol;

// Re-export commonly used types
pub use error::DomainError;
pub use link::{ConnectionState, TargetAddress};
pub use protocol::{Command, CommandFrame, StatusFields, StatusSnapshot};
