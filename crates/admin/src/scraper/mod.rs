//! HTML scrapers for product imports.
//!
//! - [`RetailerScraper`] reads a retailer's product and collection pages
//! - [`PsaClient`] renders PSA certificate pages through a headless browser
//!   service and extracts the graded card's details
//!
//! Both retry transient failures (429, 5xx, network) with exponential
//! backoff; parse failures carry a short HTML snippet for diagnosis.

pub mod error;
pub mod html;
pub mod psa;
pub mod retailer;
mod retry;

pub use error::ScraperError;
pub use psa::{PsaCert, PsaClient};
pub use retailer::{RetailerScraper, ScrapedProduct};
pub(crate) use retry::retry_with_backoff;

/// Browser-like user agent; some storefronts reject obvious bots.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; ShelfwiseBot/0.1; +https://github.com/PistachioHQ/shelfwise)";
