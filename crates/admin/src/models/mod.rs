//! Domain models backed by the service database.

pub mod notification;
pub mod session;
pub mod wishlist;

pub use notification::Notification;
pub use session::ShopSession;
pub use wishlist::{SuggestedKeyword, Wishlist};
