// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerclip::{db, query, store};
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

#[test]
fn set_budget_upserts_per_category_and_month() {
    let conn = setup();
    let food = store::create_category(&conn, "Food").unwrap().id;

    store::set_budget(&conn, food, "2021-06", dec("100")).unwrap();
    store::set_budget(&conn, food, "2021-06", dec("120")).unwrap();
    store::set_budget(&conn, food, "2021-07", dec("80")).unwrap();

    assert_eq!(
        store::budget_for(&conn, food, "2021-06").unwrap(),
        Some(dec("120"))
    );
    assert_eq!(store::list_budgets(&conn, None).unwrap().len(), 2);
    assert_eq!(
        store::list_budgets(&conn, Some("2021-07")).unwrap()[0].amount,
        dec("80")
    );
}

#[test]
fn overview_defaults_missing_budget_to_zero() {
    let conn = setup();
    store::create_category(&conn, "Unbudgeted").unwrap();

    let overview = query::budget_overview(&conn, "2021-06").unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].budget, Decimal::ZERO);
    assert_eq!(overview[0].left, Decimal::ZERO);
}

#[test]
fn deleting_category_drops_its_budgets() {
    let conn = setup();
    let food = store::create_category(&conn, "Food").unwrap().id;
    store::set_budget(&conn, food, "2021-06", dec("100")).unwrap();

    store::delete_category(&conn, food).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM budgets", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
