use super::{entry, harness, seed_pair};
use crate::error::BridgeError;

#[tokio::test]
async fn known_identifier_skips_the_validator() {
    let h = harness();
    seed_pair(&h).await;
    let matrix_id = h
        .bridge
        .authenticate("201", "whatever")
        .await
        .expect("resolve without upstream");
    assert_eq!(matrix_id, "@alice:srv");
}

#[tokio::test]
async fn unknown_identifier_bootstraps_mappings() {
    let h = harness();
    h.validator
        .add_account(
            "305",
            "s3cret",
            vec![entry("305", "@carol:srv", &["91305"])],
        )
        .await;
    let matrix_id = h
        .bridge
        .authenticate("305", "s3cret")
        .await
        .expect("bootstrap");
    assert_eq!(matrix_id, "@carol:srv");
    // The loaded entries are now regular mappings.
    assert_eq!(h.bridge.resolve("91305").await, Some("@carol:srv".to_string()));
    assert_eq!(h.bridge.reverse_resolve("@carol:srv").await, "305");
}

#[tokio::test]
async fn wrong_secret_is_an_auth_failure() {
    let h = harness();
    h.validator
        .add_account("305", "s3cret", vec![entry("305", "@carol:srv", &[])])
        .await;
    let result = h.bridge.authenticate("305", "wrong").await;
    assert!(matches!(result, Err(BridgeError::Auth)));
}

#[tokio::test]
async fn validator_success_without_coverage_still_fails() {
    let h = harness();
    // The upstream accepted the credentials but returned entries that do
    // not cover the identifier itself.
    h.validator
        .add_account("305", "s3cret", vec![entry("400", "@dave:srv", &[])])
        .await;
    let result = h.bridge.authenticate("305", "s3cret").await;
    assert!(matches!(result, Err(BridgeError::Auth)));
}
