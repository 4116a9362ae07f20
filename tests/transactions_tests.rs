// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerclip::errors::LedgerError;
use ledgerclip::models::{AccountType, TransactionType};
use ledgerclip::store::{self, PostingHeader, SplitLine};
use ledgerclip::{cli, commands::transactions, db, query};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn personal(conn: &Connection, name: &str) -> i64 {
    store::create_account(conn, name, AccountType::Personal, None, true)
        .unwrap()
        .id
}

#[test]
fn transfer_balances_to_zero() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let savings = personal(&conn, "savings");

    let tx = store::transfer(
        &mut conn,
        checking,
        savings,
        dec("100"),
        date("2020-01-01"),
        "Move to savings",
        None,
        None,
    )
    .unwrap();

    assert_eq!(tx.transaction_type, TransactionType::Transfer);
    assert_eq!(tx.splits.len(), 2);
    let sum: Decimal = tx.splits.iter().map(|s| s.amount).sum();
    assert!(sum.is_zero());

    let d = date("2020-01-01");
    assert_eq!(query::balance_on(&conn, checking, d).unwrap(), dec("-100"));
    assert_eq!(query::balance_on(&conn, savings, d).unwrap(), dec("100"));
    let total = query::balance_on(&conn, checking, d).unwrap()
        + query::balance_on(&conn, savings, d).unwrap();
    assert!(total.is_zero());
}

#[test]
fn withdraw_auto_creates_foreign() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");

    let tx = store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("40"),
        date("2020-02-15"),
        "Groceries",
        None,
        None,
    )
    .unwrap();

    assert_eq!(tx.transaction_type, TransactionType::Withdraw);
    let grocer = store::find_account(&conn, "Grocer", AccountType::Foreign)
        .unwrap()
        .expect("foreign account created");
    assert_eq!(tx.dst_id, grocer.id);
    assert_eq!(
        query::balance_on(&conn, checking, date("2020-02-15")).unwrap(),
        dec("-40")
    );
}

#[test]
fn deposit_auto_creates_foreign() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");

    let tx = store::deposit(
        &mut conn,
        checking,
        "Employer",
        dec("1000"),
        date("2020-03-01"),
        "Salary",
        None,
        None,
    )
    .unwrap();

    assert_eq!(tx.transaction_type, TransactionType::Deposit);
    assert!(
        store::find_account(&conn, "Employer", AccountType::Foreign)
            .unwrap()
            .is_some()
    );
    assert_eq!(
        query::balance_on(&conn, checking, date("2020-03-01")).unwrap(),
        dec("1000")
    );
}

#[test]
fn transfer_rejects_same_account() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let err = store::transfer(
        &mut conn,
        checking,
        checking,
        dec("10"),
        date("2020-01-01"),
        "Self",
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidPosting(_))
    ));
}

#[test]
fn posting_rejects_nonpositive_amount() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let savings = personal(&conn, "savings");
    for amount in ["0", "-5"] {
        let err = store::transfer(
            &mut conn,
            checking,
            savings,
            dec(amount),
            date("2020-01-01"),
            "Bad",
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidPosting(_))
        ));
    }
}

#[test]
fn posting_rejects_unbalanced_splits() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let savings = personal(&conn, "savings");
    let header = PostingHeader {
        title: "Lopsided".to_string(),
        date: date("2020-01-01"),
        src_id: checking,
        dst_id: savings,
        amount: dec("100"),
        transaction_type: None,
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let splits = vec![
        SplitLine {
            account_id: checking,
            opposing_id: savings,
            amount: dec("-100"),
            date: date("2020-01-01"),
            category_id: None,
        },
        SplitLine {
            account_id: savings,
            opposing_id: checking,
            amount: dec("90"),
            date: date("2020-01-01"),
            category_id: None,
        },
    ];
    let err = store::post(&mut conn, &header, Some(splits)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidPosting(_))
    ));
}

#[test]
fn posting_rejects_system_participant() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let system = store::system_account(&conn).unwrap();
    let header = PostingHeader {
        title: "Sneaky".to_string(),
        date: date("2020-01-01"),
        src_id: checking,
        dst_id: system.id,
        amount: dec("10"),
        transaction_type: Some(TransactionType::Transfer),
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let err = store::post(&mut conn, &header, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidPosting(_))
    ));
}

#[test]
fn update_preserves_mirror_split_ids() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let tx = store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("40"),
        date("2020-02-15"),
        "Groceries",
        None,
        None,
    )
    .unwrap();

    let mut old_ids: Vec<i64> = tx.splits.iter().map(|s| s.id).collect();
    old_ids.sort();

    let header = PostingHeader {
        title: "Groceries and more".to_string(),
        date: date("2020-02-16"),
        src_id: tx.src_id,
        dst_id: tx.dst_id,
        amount: dec("55"),
        transaction_type: Some(TransactionType::Withdraw),
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let updated = store::update_posting(&mut conn, tx.id, &header, None).unwrap();

    let mut new_ids: Vec<i64> = updated.splits.iter().map(|s| s.id).collect();
    new_ids.sort();
    assert_eq!(old_ids, new_ids);
    assert_eq!(
        query::balance_on(&conn, checking, date("2020-02-16")).unwrap(),
        dec("-55")
    );
    assert_eq!(updated.title, "Groceries and more");
}

#[test]
fn delete_cascades_to_splits() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let tx = store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("40"),
        date("2020-02-15"),
        "Groceries",
        None,
        None,
    )
    .unwrap();

    store::delete_transaction(&conn, tx.id).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM splits", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn n_way_split_preserves_zero_sum() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let grocer = store::get_or_create_foreign(&conn, "Grocer").unwrap().id;
    let food = store::create_category(&conn, "Food").unwrap().id;
    let household = store::create_category(&conn, "Household").unwrap().id;

    let header = PostingHeader {
        title: "Big shop".to_string(),
        date: date("2020-04-04"),
        src_id: checking,
        dst_id: grocer,
        amount: dec("100"),
        transaction_type: None,
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let splits = vec![
        SplitLine {
            account_id: checking,
            opposing_id: grocer,
            amount: dec("-100"),
            date: date("2020-04-04"),
            category_id: None,
        },
        SplitLine {
            account_id: grocer,
            opposing_id: checking,
            amount: dec("60"),
            date: date("2020-04-04"),
            category_id: Some(food),
        },
        SplitLine {
            account_id: grocer,
            opposing_id: checking,
            amount: dec("40"),
            date: date("2020-04-04"),
            category_id: Some(household),
        },
    ];
    let tx = store::post(&mut conn, &header, Some(splits)).unwrap();
    assert_eq!(tx.splits.len(), 3);
    let sum: Decimal = tx.splits.iter().map(|s| s.amount).sum();
    assert!(sum.is_zero());
    assert_eq!(
        query::balance_on(&conn, checking, date("2020-04-04")).unwrap(),
        dec("-100")
    );
}

#[test]
fn list_limit_respected() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    for i in 1..=3 {
        store::withdraw(
            &mut conn,
            checking,
            "Grocer",
            dec("10"),
            date(&format!("2025-01-0{}", i)),
            "Groceries",
            None,
            None,
        )
        .unwrap();
    }

    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["ledgerclip", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2025-01-03");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}
