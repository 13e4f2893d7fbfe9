//! End-to-end lifecycle runs against the mock backend over HTTP.

use datalayer_client::lifecycle::{MintPhase, SpendPhase};
use datalayer_client::persistence::DescriptorStore;
use datalayer_client::testing::{descriptor, MockWallet};
use datalayer_client::ClientError;
use datalayer_common::role::{SpendAction, SpendRole};
use datalayer_integration::harness::{TestHarness, SECRET};

async fn minted(h: &TestHarness) -> datalayer_integration::harness::TestSession {
    h.backend.push_confirmations([true]);
    let mut session = h.session().await;
    session.mint().await.expect("mint");
    session
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mint_persists_backend_descriptor() {
    let h = TestHarness::setup().await;
    h.backend.push_confirmations([true]);
    let mut session = h.session().await;

    let outcome = session.mint().await.unwrap();

    assert_eq!(outcome.descriptor, Some(h.backend.mint_info()));
    assert_eq!(h.store().get(), Some(h.backend.mint_info()));
    assert_eq!(session.lifecycle().mint_phase(), &MintPhase::Persisted);

    let body = h.backend.last_body("/mint").unwrap();
    assert_eq!(body["owner_address"], session.account().unwrap().address);
    assert_eq!(body["root_hash"], "00".repeat(32));
    assert_eq!(
        h.backend.paths(),
        ["/info", "/mint", "/sing-and-send", "/coin-confirmed", "/info"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_request_carries_secret() {
    let h = TestHarness::setup().await;
    let _session = minted(&h).await;

    let calls = h.backend.calls();
    assert!(!calls.is_empty());
    for call in calls {
        assert_eq!(call.secret.as_deref(), Some(SECRET), "{}", call.path);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polls_until_confirmed() {
    let h = TestHarness::setup().await;
    h.backend.push_confirmations([false, false, true]);
    let mut session = h.session().await;

    let outcome = session.mint().await.unwrap();

    assert_eq!(outcome.polls, 3);
    assert_eq!(h.backend.count("/coin-confirmed"), 3);
    let polled = h.backend.last_body("/coin-confirmed").unwrap();
    assert_eq!(polled["coin"]["parent_coin_info"], "m2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unconfirmed_mint_gives_up_and_persists_nothing() {
    let h = TestHarness::setup().await;
    let mut session = h.session().await;

    let err = session.mint().await.unwrap_err();

    assert!(matches!(err, ClientError::ConfirmationExhausted { attempts: 50 }));
    assert!(matches!(
        session.lifecycle().mint_phase(),
        MintPhase::Failed(_)
    ));
    assert!(h.stored_raw().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn persisted_store_survives_restart() {
    let h = TestHarness::setup().await;
    drop(minted(&h).await);

    let session = h.session().await;
    assert_eq!(session.descriptor(), Some(&h.backend.mint_info()));
    assert_eq!(session.lifecycle().mint_phase(), &MintPhase::Persisted);
    assert_eq!(session.lifecycle().draft().new_label, "minted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn broadcast_error_keeps_persisted_descriptor() {
    let h = TestHarness::setup().await;
    let mut session = minted(&h).await;
    let before = h.stored_raw();
    h.backend.set_broadcast_error(Some("INVALID_FEE_TOO_CLOSE_TO_ZERO"));

    session.draft_mut().new_label = "never".into();
    let err = session.spend().await.unwrap_err();

    assert!(matches!(err, ClientError::Broadcast(ref m) if m == "INVALID_FEE_TOO_CLOSE_TO_ZERO"));
    assert!(matches!(session.lifecycle().spend_phase(), SpendPhase::Failed(_)));
    assert_eq!(h.stored_raw(), before);
    assert_eq!(session.descriptor(), Some(&h.backend.mint_info()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_error_status_is_reported() {
    let h = TestHarness::setup().await;
    h.backend.fail_path(Some("/mint"));
    let mut session = h.session().await;

    let err = session.mint().await.unwrap_err();

    match err {
        ClientError::Status { status, ref body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "backend exploded");
        }
        other => panic!("expected status error, got {other}"),
    }
    assert!(h.stored_raw().is_none());
    assert_eq!(h.backend.count("/sing-and-send"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admin_spend_uses_server_key_without_wallet() {
    let h = TestHarness::setup().await;
    drop(minted(&h).await);
    h.backend.push_confirmations([true]);
    let mut session = h.session_without_wallet().await;

    session.draft_mut().select_role(SpendRole::Admin);
    session.draft_mut().new_label = "renamed".into();
    let outcome = session.spend().await.unwrap();

    assert!(!outcome.wallet_signed);
    let body = h.backend.last_body("/update-metadata").unwrap();
    assert_eq!(body["admin_public_key"], "a0b1c2d3e4f5");
    assert_eq!(body["new_label"], "renamed");
    assert!(body.get("owner_public_key").is_none());

    let send = h.backend.last_body("/sing-and-send").unwrap();
    assert!(send.get("signature").is_none());
    assert_eq!(h.store().get(), Some(h.backend.spend_info()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn owner_spend_is_wallet_signed() {
    let h = TestHarness::setup().await;
    let mut session = minted(&h).await;
    h.backend.push_confirmations([true]);

    session.draft_mut().select_role(SpendRole::Owner);
    session
        .draft_mut()
        .select_action(SpendAction::UpdateOwnership)
        .unwrap();
    let outcome = session.spend().await.unwrap();

    assert!(outcome.wallet_signed);
    assert_eq!(h.wallet.sign_requests().len(), 1);

    let body = h.backend.last_body("/update-ownership").unwrap();
    assert_eq!(body["owner_public_key"], MockWallet::PUBLIC_KEY);
    assert_eq!(body["new_owner_puzzle_hash"], MockWallet::PUZZLE_HASH);
    assert_eq!(
        body["new_delegated_puzzle_keys_and_types"]
            .as_array()
            .unwrap()
            .len(),
        3
    );

    let send = h.backend.last_body("/sing-and-send").unwrap();
    assert_eq!(send["signature"], MockWallet::SIGNATURE);
    let fee = h.backend.last_body("/add-fee").unwrap();
    assert_eq!(fee["fee"], 500_000_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oracle_spend_has_no_fee_step() {
    let h = TestHarness::setup().await;
    let mut session = minted(&h).await;
    h.backend.push_confirmations([true]);
    let fees_before = h.backend.count("/add-fee");

    session.draft_mut().select_role(SpendRole::Oracle);
    let outcome = session.spend().await.unwrap();

    assert_eq!(session.lifecycle().draft().action(), SpendAction::Oracle);
    assert_eq!(h.backend.count("/add-fee"), fees_before);
    assert_eq!(outcome.confirmed_coin.parent_coin_info, "s2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burn_clears_local_state() {
    let h = TestHarness::setup().await;
    let mut session = minted(&h).await;
    h.backend.push_confirmations([true]);

    session.draft_mut().select_role(SpendRole::Owner);
    session.draft_mut().select_action(SpendAction::Burn).unwrap();
    let outcome = session.spend().await.unwrap();

    assert_eq!(outcome.descriptor, None);
    assert_eq!(h.stored_raw().as_deref(), Some("null"));
    assert!(h.store().get().is_none());
    assert_eq!(session.lifecycle().mint_phase(), &MintPhase::NoStore);
    assert_eq!(
        h.backend.last_body("/melt").unwrap()["owner_public_key"],
        MockWallet::PUBLIC_KEY
    );

    // A restarted session starts without a store.
    let restarted = h.session().await;
    assert!(restarted.descriptor().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_replaces_descriptor() {
    let h = TestHarness::setup().await;
    let mut lifecycle = h.lifecycle();
    h.store().set(Some(&descriptor("stale"))).unwrap();
    lifecycle.reload();

    let synced = lifecycle.sync().await.unwrap();

    assert_eq!(synced, h.backend.sync_info());
    assert_eq!(h.store().get(), Some(h.backend.sync_info()));
    assert_eq!(
        h.backend.last_body("/sync").unwrap()["info"]["metadata"]["label"],
        "stale"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_state_file_means_no_store() {
    let h = TestHarness::setup().await;
    std::fs::write(h.store().path(), "undefined").unwrap();

    let session = h.session().await;
    assert!(session.descriptor().is_none());
    assert_eq!(session.lifecycle().mint_phase(), &MintPhase::NoStore);
}
