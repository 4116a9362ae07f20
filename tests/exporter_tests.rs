// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerclip::commands::exporter::export_splits;
use ledgerclip::models::AccountType;
use ledgerclip::{db, store};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> (Connection, i64, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    let checking = store::create_account(&conn, "checking", AccountType::Personal, None, true)
        .unwrap()
        .id;
    let savings = store::create_account(&conn, "savings", AccountType::Personal, None, true)
        .unwrap()
        .id;
    (conn, checking, savings)
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn export_emits_each_transfer_once() {
    let (mut conn, checking, savings) = setup();
    let food = store::create_category(&conn, "Food").unwrap().id;
    store::transfer(
        &mut conn,
        checking,
        savings,
        dec("300"),
        date("2021-02-01"),
        "Stash",
        None,
        None,
    )
    .unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("45.5"),
        date("2021-02-02"),
        "Shop",
        Some(food),
        None,
    )
    .unwrap();

    let mut buf = Vec::new();
    let n = export_splits(
        &conn,
        date("2021-02-01"),
        date("2021-02-28"),
        &[],
        &mut buf,
    )
    .unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "account;opposing_account;date;amount;category"
    );
    // One transfer row plus both sides of the withdraw.
    assert_eq!(n, 3);
    assert_eq!(lines[1], "checking;savings;2021-02-01;-300.00;");
    assert!(lines.contains(&"checking;Grocer;2021-02-02;-45.50;Food"));
    assert!(lines.contains(&"Grocer;checking;2021-02-02;45.50;Food"));
}

#[test]
fn export_respects_account_filter_and_range() {
    let (mut conn, checking, savings) = setup();
    store::transfer(
        &mut conn,
        checking,
        savings,
        dec("300"),
        date("2021-02-01"),
        "Stash",
        None,
        None,
    )
    .unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("10"),
        date("2021-03-05"),
        "Out of range",
        None,
        None,
    )
    .unwrap();

    let mut buf = Vec::new();
    let n = export_splits(
        &conn,
        date("2021-02-01"),
        date("2021-02-28"),
        &[checking],
        &mut buf,
    )
    .unwrap();
    assert_eq!(n, 1);
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("checking;savings;2021-02-01;-300.00;"));
    assert!(!text.contains("Out of range"));
}
