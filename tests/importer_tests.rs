// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerclip::import::{self, ImportStatement};
use ledgerclip::models::{AccountType, TransactionType};
use ledgerclip::{db, query, store};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> (Connection, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    let checking = store::create_account(&conn, "checking", AccountType::Personal, None, true)
        .unwrap()
        .id;
    (conn, checking)
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn statement(book: &str, account: &str, iban: &str, amount: &str) -> ImportStatement {
    ImportStatement {
        book_date: date(book),
        transaction_date: date(book),
        account: account.to_string(),
        notes: String::new(),
        iban: iban.to_string(),
        amount: dec(amount),
    }
}

#[test]
fn read_statements_defaults_transaction_date() {
    let csv = "book_date,transaction_date,account,notes,iban,amount\n\
               2020-05-10,,Grocer,weekly shop,DE02100100109307118603,-40.00\n\
               2020-05-11,2020-05-12,Employer,,,1500.00\n";
    let records = import::read_statements(csv.as_bytes()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].transaction_date, date("2020-05-10"));
    assert_eq!(records[0].amount, dec("-40.00"));
    assert_eq!(records[1].transaction_date, date("2020-05-12"));
}

#[test]
fn read_statements_rejects_bad_date() {
    let csv = "book_date,transaction_date,account,notes,iban,amount\n\
               2020-13-10,,Grocer,,,-40.00\n";
    let err = import::read_statements(csv.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("Invalid book date '2020-13-10'"));
}

#[test]
fn classify_prefers_iban_hints() {
    let (conn, _checking) = setup();
    let grocer = store::get_or_create_foreign(&conn, "Grocer").unwrap().id;
    conn.execute(
        "INSERT INTO account_ibans(account_id, iban) VALUES (?1, 'DE123')",
        [grocer],
    )
    .unwrap();

    let staged = import::classify(
        &conn,
        vec![statement("2020-05-10", "Some new label", "DE123", "-40")],
    )
    .unwrap();
    assert_eq!(staged[0].suggested_account, Some(grocer));
}

#[test]
fn classify_uses_unambiguous_name_hints() {
    let (conn, _checking) = setup();
    let grocer = store::get_or_create_foreign(&conn, "Grocer").unwrap().id;
    conn.execute(
        "INSERT INTO account_names(account_id, name) VALUES (?1, 'SUPERMARKET GMBH')",
        [grocer],
    )
    .unwrap();

    let staged = import::classify(
        &conn,
        vec![statement("2020-05-10", "SUPERMARKET GMBH", "", "-40")],
    )
    .unwrap();
    assert_eq!(staged[0].suggested_account, Some(grocer));
}

#[test]
fn classify_drops_ambiguous_names() {
    let (conn, _checking) = setup();
    let a = store::get_or_create_foreign(&conn, "Grocer A").unwrap().id;
    let b = store::get_or_create_foreign(&conn, "Grocer B").unwrap().id;
    for id in [a, b] {
        conn.execute(
            "INSERT INTO account_names(account_id, name) VALUES (?1, 'SUPERMARKET GMBH')",
            [id],
        )
        .unwrap();
    }

    let staged = import::classify(
        &conn,
        vec![statement("2020-05-10", "SUPERMARKET GMBH", "", "-40")],
    )
    .unwrap();
    assert_eq!(staged[0].suggested_account, None);
}

#[test]
fn commit_creates_foreign_learns_hints_and_posts() {
    let (mut conn, checking) = setup();
    let staged = import::stage(
        &mut conn,
        vec![statement("2020-05-10", "Grocer", "DE123", "-40")],
    )
    .unwrap();
    assert_eq!(staged[0].suggested_account, None);

    let outcome = import::commit_session(&mut conn, checking, &staged).unwrap();
    assert_eq!(outcome.posted, 1);
    assert!(outcome.errors.is_empty());

    let grocer = store::find_account(&conn, "Grocer", AccountType::Foreign)
        .unwrap()
        .expect("created on commit");
    let iban_hint: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM account_ibans WHERE account_id=?1 AND iban='DE123'",
            [grocer.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(iban_hint, 1);
    let name_hint: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM account_names WHERE account_id=?1 AND name='Grocer'",
            [grocer.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(name_hint, 1);

    assert_eq!(
        query::balance_on(&conn, checking, date("2020-05-10")).unwrap(),
        dec("-40")
    );
}

#[test]
fn reimport_marks_duplicates_and_posts_nothing() {
    let (mut conn, checking) = setup();
    let records = vec![statement("2020-05-10", "Grocer", "", "-40")];

    let staged = import::stage(&mut conn, records.clone()).unwrap();
    let outcome = import::commit_session(&mut conn, checking, &staged).unwrap();
    assert_eq!(outcome.posted, 1);

    // Second pass: the learned name hint now suggests the account, and the
    // fingerprint matches the posted withdraw.
    let staged = import::stage(&mut conn, records).unwrap();
    assert!(staged[0].ignore);
    let outcome = import::commit_session(&mut conn, checking, &staged).unwrap();
    assert_eq!(outcome.posted, 0);
    assert_eq!(outcome.ignored, 1);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn commit_keeps_book_and_transaction_dates() {
    let (mut conn, checking) = setup();
    let mut rec = statement("2020-05-10", "Grocer", "", "-40");
    rec.transaction_date = date("2020-05-12");

    let staged = import::stage(&mut conn, vec![rec]).unwrap();
    let tx_id = import::commit_record(&mut conn, checking, &staged[0], "Groceries", None, None)
        .unwrap()
        .id;

    let tx = store::get_transaction(&conn, tx_id).unwrap();
    assert_eq!(tx.date, date("2020-05-12"));
    let own = tx
        .splits
        .iter()
        .find(|s| s.account_id == checking)
        .unwrap();
    assert_eq!(own.date, date("2020-05-10"));
    let other = tx
        .splits
        .iter()
        .find(|s| s.account_id != checking)
        .unwrap();
    assert_eq!(other.date, date("2020-05-12"));

    // Bank-book view: the outflow is visible on the book date already.
    assert_eq!(
        query::balance_on(&conn, checking, date("2020-05-10")).unwrap(),
        dec("-40")
    );
}

#[test]
fn positive_amount_becomes_deposit_and_personal_becomes_transfer() {
    let (mut conn, checking) = setup();
    let savings = store::create_account(&conn, "savings", AccountType::Personal, None, true)
        .unwrap()
        .id;
    conn.execute(
        "INSERT INTO account_names(account_id, name) VALUES (?1, 'SAVINGS REF')",
        [savings],
    )
    .unwrap();

    let staged = import::stage(
        &mut conn,
        vec![
            statement("2020-05-10", "Employer", "", "1500"),
            statement("2020-05-11", "SAVINGS REF", "", "-200"),
        ],
    )
    .unwrap();
    let outcome = import::commit_session(&mut conn, checking, &staged).unwrap();
    assert_eq!(outcome.posted, 2);

    let types: Vec<String> = conn
        .prepare("SELECT type FROM transactions ORDER BY id")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(types, vec!["deposit", "transfer"]);

    assert_eq!(
        query::balance_on(&conn, savings, date("2020-05-11")).unwrap(),
        dec("200")
    );
}

#[test]
fn commit_session_isolates_record_failures() {
    let (mut conn, checking) = setup();
    let staged = import::stage(
        &mut conn,
        vec![
            statement("2020-05-10", "Grocer", "", "-40"),
            statement("2020-05-11", "Broken", "", "0"),
        ],
    )
    .unwrap();

    let outcome = import::commit_session(&mut conn, checking, &staged).unwrap();
    assert_eq!(outcome.posted, 1);
    assert_eq!(outcome.errors.len(), 1);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn firefly_import_is_idempotent_and_skips_transfer_mirrors() {
    let (mut conn, _checking) = setup();
    let csv = "date,title,type,amount,source_name,destination_name,category,notes\n\
               2020-01-05,Salary,Deposit,2000.00,Employer,main,Income,\n\
               2020-01-06,Groceries,Withdrawal,-45.50,main,Grocer,Food,\n\
               2020-01-07,To savings,Transfer,-300.00,main,savings,,\n\
               2020-01-07,To savings,Transfer,300.00,savings,main,,\n";

    let outcome = import::import_firefly(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.skipped, 1);

    assert!(
        store::find_account(&conn, "main", AccountType::Personal)
            .unwrap()
            .is_some()
    );
    assert!(
        store::find_account(&conn, "Grocer", AccountType::Foreign)
            .unwrap()
            .is_some()
    );

    // Re-running the same file creates nothing new.
    let outcome = import::import_firefly(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.skipped, 4);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 3);

    let transfer_type: String = conn
        .query_row(
            "SELECT type FROM transactions WHERE title='To savings'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(transfer_type, TransactionType::Transfer.as_str());
}
