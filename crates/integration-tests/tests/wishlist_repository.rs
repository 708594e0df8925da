//! Wishlist repository behaviour against a real database.

use sqlx::PgPool;

use shelfwise_admin::db::WishlistRepository;
use shelfwise_core::{Email, Keyword, ShopDomain};
use shelfwise_integration_tests::shop;

fn keyword(value: &str) -> Keyword {
    Keyword::parse(value).expect("valid keyword")
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn get_or_create_returns_the_same_wishlist(pool: PgPool) {
    let repo = WishlistRepository::new(&pool);

    let first = repo.get_or_create(&shop(), "cust_1").await.expect("created");
    let second = repo.get_or_create(&shop(), "cust_1").await.expect("fetched");
    let other = repo.get_or_create(&shop(), "cust_2").await.expect("created");

    assert_eq!(first.id, second.id);
    assert_ne!(first.id, other.id);

    let rows: i64 = sqlx::query_scalar("SELECT count(*) FROM wishlists")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(rows, 2);
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn adding_a_keyword_twice_keeps_one(pool: PgPool) {
    let repo = WishlistRepository::new(&pool);
    let wishlist = repo.get_or_create(&shop(), "cust_1").await.expect("created");

    repo.add_keyword(wishlist.id, &keyword("Vintage")).await.expect("added");
    repo.add_keyword(wishlist.id, &keyword("vintage")).await.expect("no-op");

    let keywords = repo.list_keywords(wishlist.id).await.expect("listed");
    assert_eq!(keywords, vec![keyword("vintage")]);
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn removing_a_missing_keyword_is_a_no_op(pool: PgPool) {
    let repo = WishlistRepository::new(&pool);
    let wishlist = repo.get_or_create(&shop(), "cust_1").await.expect("created");
    repo.add_keyword(wishlist.id, &keyword("vintage")).await.expect("added");

    repo.remove_keyword(wishlist.id, &keyword("holo")).await.expect("no-op");
    assert_eq!(
        repo.list_keywords(wishlist.id).await.expect("listed"),
        vec![keyword("vintage")]
    );

    repo.remove_keyword(wishlist.id, &keyword("vintage")).await.expect("removed");
    assert!(repo.list_keywords(wishlist.id).await.expect("listed").is_empty());
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn subscribers_match_keywords_inside_the_title(pool: PgPool) {
    let repo = WishlistRepository::new(&pool);
    let fan = Email::parse("fan@example.com").expect("valid email");

    let subscribed = repo.get_or_create(&shop(), "cust_1").await.expect("created");
    repo.add_keyword(subscribed.id, &keyword("pikachu")).await.expect("added");
    repo.set_email(subscribed.id, Some(&fan)).await.expect("email set");

    // Same keyword but no email: never a recipient.
    let silent = repo.get_or_create(&shop(), "cust_2").await.expect("created");
    repo.add_keyword(silent.id, &keyword("pikachu")).await.expect("added");

    // Another shop's customer is never a recipient.
    let elsewhere = ShopDomain::parse("other-shop.myshopify.com").expect("valid shop");
    let foreign = repo.get_or_create(&elsewhere, "cust_1").await.expect("created");
    repo.add_keyword(foreign.id, &keyword("pikachu")).await.expect("added");
    repo.set_email(foreign.id, Some(&Email::parse("other@example.com").expect("valid email")))
        .await
        .expect("email set");

    let recipients = repo
        .subscribers_for_title(&shop(), "Pikachu VMAX Booster Box")
        .await
        .expect("queried");
    assert_eq!(recipients, vec![fan]);

    assert!(
        repo.subscribers_for_title(&shop(), "Charizard Tin")
            .await
            .expect("queried")
            .is_empty()
    );
}
