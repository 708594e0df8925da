//! One-off runs of the automation, outside the job queue.
//!
//! Requires the same environment as the service (see
//! `shelfwise_admin::config`).

use rust_decimal::Decimal;

use shelfwise_admin::config::AppConfig;
use shelfwise_admin::state::AppState;
use shelfwise_core::{CertNumber, ShopDomain};

use super::CommandError;

async fn state() -> Result<AppState, Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let pool = shelfwise_admin::db::create_pool(&config.database_url).await?;
    // The queue is unused here; dropping its handle stops the idle worker.
    let (state, _jobs) = AppState::from_config(config, pool)?;
    Ok(state)
}

fn parse_shop(shop: &str) -> Result<ShopDomain, CommandError> {
    ShopDomain::parse(shop).map_err(|e| CommandError::InvalidArgument(e.to_string()))
}

#[allow(clippy::print_stdout)]
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the compliance sweep for `shop` and print the report.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the sweep cannot start.
pub async fn check(shop: &str) -> Result<(), Box<dyn std::error::Error>> {
    let shop = parse_shop(shop)?;
    let report = state().await?.compliance().check_shop(&shop).await?;
    print_json(&report)?;
    Ok(())
}

/// Import one retailer product page and print the outcome.
///
/// # Errors
///
/// Returns an error if the scrape or the creation fails.
pub async fn import(shop: &str, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let shop = parse_shop(shop)?;
    let outcome = state().await?.products().import_from_retailer(&shop, url).await?;
    print_json(&outcome)?;
    Ok(())
}

/// Import a PSA-graded card and print the outcome.
///
/// # Errors
///
/// Returns an error if the certificate is invalid, PSA lookups are not
/// configured, or the creation fails.
pub async fn psa(shop: &str, cert: &str, price: Decimal) -> Result<(), Box<dyn std::error::Error>> {
    let shop = parse_shop(shop)?;
    let cert = CertNumber::parse(cert).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let outcome = state()
        .await?
        .products()
        .import_psa_cert(&shop, &cert, price)
        .await?;
    print_json(&outcome)?;
    Ok(())
}
