//! HTTP middleware and extractors.
//!
//! - [`merchant::RequireMerchant`] verifies the admin app's session token
//! - [`shop::RequireShop`] resolves the calling shop for the wishlist
//!   extension
//! - [`cors::extension_cors`] admits the wishlist extension's origin

pub mod cors;
pub mod merchant;
pub mod shop;

pub use cors::extension_cors;
pub use merchant::RequireMerchant;
pub use shop::{RequireShop, SHOP_HEADER};
