use ledger::types::{Role, TransactionType, User};
use ledger::{LedgerError, Store};
use std::sync::Arc;
use std::thread;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn register(store: &Store, name: &str, referrer: Option<&User>) -> User {
    store
        .register(
            name,
            &format!("{}@example.com", name),
            referrer.map(|r| r.referral_code.as_str()),
            Role::User,
        )
        .unwrap()
}

// A <- B <- C <- D
fn four_level_chain(store: &Store) -> (User, User, User, User) {
    let a = register(store, "a", None);
    let b = register(store, "b", Some(&a));
    let c = register(store, "c", Some(&b));
    let d = register(store, "d", Some(&c));
    (a, b, c, d)
}

fn all_transactions(store: &Store, users: &[&User]) -> usize {
    users
        .iter()
        .map(|u| store.user_transactions(&u.id, usize::MAX).unwrap().len())
        .sum()
}

#[test]
fn test_three_level_cascade() {
    let store = Store::new();
    let (a, b, c, d) = four_level_chain(&store);

    let deposit = store.create_deposit(&d.id, 100.0, None).unwrap();
    let receipt = store.approve_deposit(deposit.id).unwrap();

    assert_eq!(receipt.payouts.len(), 3);
    assert_eq!(receipt.payouts[0].user_id, c.id);
    assert_eq!(receipt.payouts[2].level, 3);

    assert!(approx(store.get_capital(&d.id).unwrap().funding, 100.0));
    assert!(approx(store.get_capital(&c.id).unwrap().profit_buffer, 7.0));
    assert!(approx(store.get_capital(&b.id).unwrap().profit_buffer, 2.0));
    assert!(approx(store.get_capital(&a.id).unwrap().profit_buffer, 1.0));
    for user in [&a, &b, &c] {
        assert_eq!(store.get_capital(&user.id).unwrap().funding, 0.0);
    }

    assert_eq!(all_transactions(&store, &[&a, &b, &c, &d]), 4);
    let commissions = store.user_transactions(&c.id, 10).unwrap();
    assert_eq!(commissions[0].kind, TransactionType::ReferralCommission);
    assert!(commissions[0].description.starts_with("EMP-1"));
}

#[test]
fn test_no_referrer_no_commission() {
    let store = Store::new();
    let x = register(&store, "x", None);
    let bystander = register(&store, "bystander", None);

    let deposit = store.create_deposit(&x.id, 100.0, None).unwrap();
    let receipt = store.approve_deposit(deposit.id).unwrap();

    assert!(receipt.payouts.is_empty());
    assert!(approx(store.get_capital(&x.id).unwrap().funding, 100.0));
    assert_eq!(store.get_capital(&bystander.id).unwrap().available_capital, 0.0);
    assert_eq!(all_transactions(&store, &[&x, &bystander]), 1);
}

#[test]
fn test_dangling_referral_code_is_not_an_error() {
    let store = Store::new();
    let orphan = store
        .register("orphan", "orphan@example.com", Some("ATLASNOBODY"), Role::User)
        .unwrap();

    let deposit = store.create_deposit(&orphan.id, 250.0, None).unwrap();
    let receipt = store.approve_deposit(deposit.id).unwrap();
    assert!(receipt.payouts.is_empty());
    assert!(approx(store.get_capital(&orphan.id).unwrap().funding, 250.0));
}

#[test]
fn test_large_deposit_uses_percentages() {
    let store = Store::new();
    let (a, b, c, d) = four_level_chain(&store);

    let deposit = store.create_deposit(&d.id, 1000.0, None).unwrap();
    store.approve_deposit(deposit.id).unwrap();

    assert!(approx(store.get_capital(&c.id).unwrap().profit_buffer, 70.0));
    assert!(approx(store.get_capital(&b.id).unwrap().profit_buffer, 20.0));
    assert!(approx(store.get_capital(&a.id).unwrap().profit_buffer, 10.0));
}

#[test]
fn test_commission_becomes_withdrawable() {
    let store = Store::new();
    let (_, _, c, d) = four_level_chain(&store);

    let deposit = store.create_deposit(&d.id, 1000.0, None).unwrap();
    store.approve_deposit(deposit.id).unwrap();

    // The depositor's principal is not withdrawable
    assert!(matches!(
        store.create_withdrawal(&d.id, 50.0, "TDepositor"),
        Err(LedgerError::InsufficientProfit(_))
    ));

    let receipt = store.create_withdrawal(&c.id, 70.0, "TReferrer").unwrap();
    assert!(approx(receipt.fee, 14.0));
    assert!(approx(receipt.net_amount, 56.0));
    assert!(approx(store.get_capital(&c.id).unwrap().profit_buffer, 0.0));
}

#[test]
fn test_concurrent_approvals_credit_once() {
    let store = Store::new();
    let (_, _, c, d) = four_level_chain(&store);
    let deposit = store.create_deposit(&d.id, 100.0, None).unwrap();

    let deposit_id = deposit.id;
    let store = Arc::new(store);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || store.approve_deposit(deposit_id)));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == LedgerError::AlreadyProcessed(deposit.id))
    );
    assert!(approx(store.get_capital(&d.id).unwrap().funding, 100.0));
    assert!(approx(store.get_capital(&c.id).unwrap().profit_buffer, 7.0));
}

#[test]
fn test_referral_team_and_info() {
    let store = Store::new();
    let (a, b, _, _) = four_level_chain(&store);
    register(&store, "b2", Some(&a));

    let team = store.referral_team(&a.id).unwrap();
    assert_eq!((team.level1, team.level2, team.level3, team.total), (2, 1, 1, 4));

    let info = store.referral_info(&b.id, "https://app.example.com/").unwrap();
    assert_eq!(info.referral_code, b.referral_code);
    assert_eq!(
        info.referral_link,
        format!("https://app.example.com/register?ref={}", b.referral_code)
    );
}

#[test]
fn test_approved_cascade_survives_reopen() {
    let path = std::env::temp_dir()
        .join(format!("ledger-{}", uuid::Uuid::new_v4()))
        .join("ledger.json");

    let (c, d, deposit_id) = {
        let store = Store::open(&path).unwrap();
        let (_, _, c, d) = four_level_chain(&store);
        let deposit = store.create_deposit(&d.id, 100.0, None).unwrap();
        store.approve_deposit(deposit.id).unwrap();
        (c, d, deposit.id)
    };

    let store = Store::open(&path).unwrap();
    assert!(approx(store.get_capital(&d.id).unwrap().funding, 100.0));
    assert!(approx(store.get_capital(&c.id).unwrap().profit_buffer, 7.0));
    assert_eq!(
        store.approve_deposit(deposit_id),
        Err(LedgerError::AlreadyProcessed(deposit_id))
    );
    let commissions = store.user_transactions(&c.id, 10).unwrap();
    assert_eq!(commissions.len(), 1);
    assert_eq!(commissions[0].kind, TransactionType::ReferralCommission);
    assert_eq!(store.get_user(&c.id).unwrap().referral_code, c.referral_code);
}
