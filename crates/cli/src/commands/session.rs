//! Shop session management.
//!
//! Sessions normally arrive through the app's install flow; these commands
//! cover manual installs and token rotation.

use secrecy::SecretString;

use shelfwise_admin::db::SessionRepository;
use shelfwise_admin::models::ShopSession;
use shelfwise_core::ShopDomain;

use super::{CommandError, connect};

fn parse_shop(shop: &str) -> Result<ShopDomain, CommandError> {
    ShopDomain::parse(shop).map_err(|e| CommandError::InvalidArgument(e.to_string()))
}

/// Save or replace a shop's offline token.
///
/// # Errors
///
/// Returns an error if the shop is invalid or the upsert fails.
pub async fn save(shop: &str, token: String, scope: &str) -> Result<(), Box<dyn std::error::Error>> {
    let shop = parse_shop(shop)?;
    if token.trim().is_empty() {
        return Err(CommandError::InvalidArgument("token must not be empty".to_string()).into());
    }

    let pool = connect().await?;
    SessionRepository::new(&pool)
        .save(&ShopSession {
            shop: shop.clone(),
            access_token: SecretString::from(token),
            scope: scope.to_string(),
            expires_at: None,
        })
        .await?;

    tracing::info!(shop = %shop, "Session saved");
    Ok(())
}

/// Print every shop with an active session.
///
/// # Errors
///
/// Returns an error if the query fails.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let shops = SessionRepository::new(&pool).list_shops().await?;

    for shop in &shops {
        println!("{shop}");
    }
    tracing::info!(count = shops.len(), "Active sessions");
    Ok(())
}

/// Delete a shop's session.
///
/// # Errors
///
/// Returns an error if the shop has no session or the delete fails.
pub async fn delete(shop: &str) -> Result<(), Box<dyn std::error::Error>> {
    let shop = parse_shop(shop)?;
    let pool = connect().await?;
    SessionRepository::new(&pool).delete(&shop).await?;

    tracing::info!(shop = %shop, "Session deleted");
    Ok(())
}
