mod support;

use bpi_db::models::ledger::TokenSource;
use bpi_rewards::RewardError;
use bpi_rewards::services::token_service::TokenService;

use support::*;

const REWARD: &str = "MEMBERSHIP_REFERRAL_REWARD";

#[tokio::test]
async fn member_and_buy_back_each_receive_half() {
    let mut users = referral_line(1);
    users[0].balances.bpi_token_wallet = 250.0;
    let mut store = store_with(users, vec![]);
    store.buy_back_balance = 4_000.0;

    let distribution = TokenService::distribute_bpt_reward(&mut store, 1, 2_000.0, REWARD, "Level 1 reward")
        .await
        .unwrap();

    assert_eq!(distribution.split.user_share, 1_000.0);
    assert_eq!(distribution.split.buy_back, 1_000.0);
    assert_eq!(distribution.user_balance, 1_250.0);
    assert_eq!(distribution.buy_back_balance, 5_000.0);
    assert_eq!(store.user(1).unwrap().balances.bpi_token_wallet, 1_250.0);
    assert_eq!(store.buy_back_balance, 5_000.0);

    assert_eq!(store.token_transactions.len(), 2);
    let member_row = &store.token_transactions[0];
    assert_eq!(member_row.user_id, Some(1));
    assert_eq!(member_row.source, TokenSource::Member);
    assert_eq!(member_row.amount, 1_000.0);
    let buy_back_row = &store.token_transactions[1];
    assert_eq!(buy_back_row.user_id, None);
    assert_eq!(buy_back_row.source, TokenSource::BuyBack);
    assert!(
        store
            .token_transactions
            .iter()
            .all(|t| t.gross_amount == 2_000.0 && t.transaction_type == REWARD)
    );
    assert_ne!(member_row.reference, buy_back_row.reference);
}

#[tokio::test]
async fn odd_amounts_split_within_a_cent() {
    let mut store = store_with(referral_line(1), vec![]);

    let distribution = TokenService::distribute_bpt_reward(&mut store, 1, 333.33, REWARD, "odd")
        .await
        .unwrap();

    let split = distribution.split;
    assert_eq!(split.user_share, split.buy_back);
    assert!((split.user_share + split.buy_back - 333.33).abs() <= 0.01 + 1e-9);
    assert_eq!(store.buy_back_balance, split.buy_back);
}

#[tokio::test]
async fn non_positive_amounts_change_nothing() {
    let mut store = store_with(referral_line(1), vec![]);
    let before = store.clone();

    for total in [0.0, -500.0] {
        let err = TokenService::distribute_bpt_reward(&mut store, 1, total, REWARD, "nothing")
            .await
            .unwrap_err();
        assert!(matches!(err, RewardError::NonPositiveReward(_)));
    }

    assert_untouched(&before, &store);
}

#[tokio::test]
async fn corrupted_negative_balance_is_a_consistency_error() {
    let mut users = referral_line(1);
    users[0].balances.bpi_token_wallet = -600.0;
    let mut store = store_with(users, vec![]);
    let before = store.clone();

    let err = TokenService::distribute_bpt_reward(&mut store, 1, 1_000.0, REWARD, "corrupt")
        .await
        .unwrap_err();

    assert!(matches!(err, RewardError::NegativeBalance { user_id: 1, .. }));
    assert!(err.is_consistency());
    assert_untouched(&before, &store);
}

#[tokio::test]
async fn unknown_member_is_rejected() {
    let mut store = store_with(referral_line(1), vec![]);

    let err = TokenService::distribute_bpt_reward(&mut store, 5, 100.0, REWARD, "missing")
        .await
        .unwrap_err();

    assert!(matches!(err, RewardError::UserNotFound(5)));
    assert!(store.token_transactions.is_empty());
}
