//! Business logic services.
//!
//! # Services
//!
//! - `compliance` - Keeps product status in line with inventory
//! - `email` - Restock email delivery via SMTP
//! - `products` - Manual, retailer and PSA product creation
//! - `sessions` - Shop domain to Admin API client resolution

pub mod compliance;
pub mod email;
pub mod products;
pub mod sessions;

pub use compliance::{ComplianceError, ComplianceReport, ComplianceService};
pub use email::{EmailError, EmailService};
pub use products::{CreateOutcome, ProductCreator, ProductDraft, ProductError};
pub use sessions::{SessionError, SessionResolver};
