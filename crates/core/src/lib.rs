//! # Studio Core
//!
//! Domain types and business rules for the studio booking platform.
//! Nothing in this crate touches the database; the `db` crate applies these
//! rules inside transactions and the `api` crate exposes them over HTTP.

/// Admission, release and waitlist promotion rules for class capacity
pub mod capacity;
pub mod errors;
/// Session credit consumption, refunds and expiry
pub mod ledger;
pub mod models;
/// Seam for external calendar/email collaborators
pub mod notify;
/// Recurring template expansion
pub mod scheduling;
pub mod settings;
