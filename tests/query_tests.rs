// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerclip::errors::LedgerError;
use ledgerclip::models::{AccountType, Interval, RecurringTransaction, TransactionType, WeekendHandling};
use ledgerclip::store::{self, PostingHeader, SplitLine};
use ledgerclip::{db, query, recurrence};
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
fn balance_uses_split_value_dates() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let grocer = store::get_or_create_foreign(&conn, "Grocer").unwrap().id;

    // Booked on the 10th, valued on the counterparty side on the 12th.
    let header = PostingHeader {
        title: "Shop".to_string(),
        date: date("2021-05-12"),
        src_id: checking,
        dst_id: grocer,
        amount: dec("40"),
        transaction_type: Some(TransactionType::Withdraw),
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let splits = vec![
        SplitLine {
            account_id: checking,
            opposing_id: grocer,
            amount: dec("-40"),
            date: date("2021-05-10"),
            category_id: None,
        },
        SplitLine {
            account_id: grocer,
            opposing_id: checking,
            amount: dec("40"),
            date: date("2021-05-12"),
            category_id: None,
        },
    ];
    store::post(&mut conn, &header, Some(splits)).unwrap();

    assert_eq!(
        query::balance_on(&conn, checking, date("2021-05-10")).unwrap(),
        dec("-40")
    );
    assert_eq!(
        query::balance_on(&conn, grocer, date("2021-05-10")).unwrap(),
        Decimal::ZERO
    );
    assert_eq!(
        query::balance_on(&conn, grocer, date("2021-05-12")).unwrap(),
        dec("40")
    );
}

#[test]
fn data_points_walk_daily_steps() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    store::set_initial_balance(&mut conn, checking, dec("100"), date("2020-01-01")).unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("10"),
        date("2020-01-05"),
        "Shop",
        None,
        None,
    )
    .unwrap();

    let points =
        query::data_points(&conn, checking, date("2020-01-01"), date("2020-01-10"), 10).unwrap();
    assert_eq!(points.len(), 10);
    assert_eq!(points[0], (date("2020-01-01"), dec("100")));
    assert_eq!(points[3], (date("2020-01-04"), dec("100")));
    assert_eq!(points[4], (date("2020-01-05"), dec("90")));
    assert_eq!(*points.last().unwrap(), (date("2020-01-10"), dec("90")));
}

#[test]
fn data_points_final_point_includes_leftovers() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    store::set_initial_balance(&mut conn, checking, dec("100"), date("2020-01-01")).unwrap();
    // Lands between the last full step and the range end.
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("25"),
        date("2020-03-30"),
        "Shop",
        None,
        None,
    )
    .unwrap();

    let points =
        query::data_points(&conn, checking, date("2020-01-01"), date("2020-03-31"), 7).unwrap();
    assert_eq!(*points.last().unwrap(), (date("2020-03-31"), dec("75")));
}

#[test]
fn data_points_reject_reversed_range() {
    let conn = setup();
    let err = query::data_points(&conn, 1, date("2020-02-01"), date("2020-01-01"), 10).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidDate(_))
    ));
}

#[test]
fn dashboard_aggregates_current_and_previous_month() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let today = date("2021-06-15");

    // Previous month flows.
    store::deposit(
        &mut conn,
        checking,
        "Employer",
        dec("500"),
        date("2021-05-03"),
        "Salary",
        None,
        None,
    )
    .unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("100"),
        date("2021-05-10"),
        "Shop",
        None,
        None,
    )
    .unwrap();

    // Current month flows.
    store::deposit(
        &mut conn,
        checking,
        "Employer",
        dec("1000"),
        date("2021-06-01"),
        "Salary",
        None,
        None,
    )
    .unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("200"),
        date("2021-06-10"),
        "Shop",
        None,
        None,
    )
    .unwrap();
    // Value-dated after today: upcoming, not yet part of the balance.
    store::withdraw(
        &mut conn,
        checking,
        "Landlord",
        dec("100"),
        date("2021-06-20"),
        "Rent",
        None,
        None,
    )
    .unwrap();

    let grocer = store::find_account(&conn, "Grocer", AccountType::Foreign)
        .unwrap()
        .unwrap()
        .id;
    recurrence::create_recurrence(
        &conn,
        &RecurringTransaction {
            id: 0,
            title: "Gym".to_string(),
            amount: dec("50"),
            date: date("2021-06-25"),
            src_id: checking,
            dst_id: grocer,
            interval: Interval::Monthly,
            multiplier: 1,
            weekend_handling: WeekendHandling::SameDay,
            usual_month_day: 0,
            transaction_type: TransactionType::Withdraw,
            category_id: None,
        },
    )
    .unwrap();

    let summary = query::dashboard(&conn, today).unwrap();
    assert_eq!(summary.income, dec("1000"));
    assert_eq!(summary.expenses, dec("200"));
    assert_eq!(summary.difference, dec("800"));
    assert_eq!(summary.previous_income, dec("500"));
    assert_eq!(summary.previous_expenses, dec("100"));
    assert_eq!(summary.previous_difference, dec("400"));
    // 500 - 100 + 1000 - 200 on or before today.
    assert_eq!(summary.balance, dec("1200"));
    assert_eq!(summary.upcoming, dec("-100"));
    // Upcoming rent plus the gym obligation due this month.
    assert_eq!(summary.outstanding, dec("-150"));
    assert_eq!(summary.expected_balance, dec("1050"));
}

#[test]
fn last_transactions_show_transfers_once() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let savings = personal(&conn, "savings");
    store::transfer(
        &mut conn,
        checking,
        savings,
        dec("100"),
        date("2021-06-01"),
        "Stash",
        None,
        None,
    )
    .unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("40"),
        date("2021-06-02"),
        "Shop",
        None,
        None,
    )
    .unwrap();

    let rows = query::last_transactions(&conn, 10).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "Shop");
    assert_eq!(rows[1].title, "Stash");
    assert_eq!(rows[1].amount, dec("-100"));
}

#[test]
fn category_spending_splits_spent_and_income() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let food = store::create_category(&conn, "Food").unwrap().id;
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("60"),
        date("2021-06-05"),
        "Shop",
        Some(food),
        None,
    )
    .unwrap();
    store::deposit(
        &mut conn,
        checking,
        "Grocer",
        dec("20"),
        date("2021-06-07"),
        "Refund",
        Some(food),
        None,
    )
    .unwrap();

    let spending = query::category_spending(&conn, "2021-06").unwrap();
    assert_eq!(spending.len(), 1);
    assert_eq!(spending[0].category, "Food");
    assert_eq!(spending[0].spent, dec("60"));
    assert_eq!(spending[0].income, dec("20"));
}

#[test]
fn budget_overview_reports_left() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let food = store::create_category(&conn, "Food").unwrap().id;
    store::set_budget(&conn, food, "2021-06", dec("100")).unwrap();
    store::withdraw(
        &mut conn,
        checking,
        "Grocer",
        dec("60"),
        date("2021-06-05"),
        "Shop",
        Some(food),
        None,
    )
    .unwrap();

    let overview = query::budget_overview(&conn, "2021-06").unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].budget, dec("100"));
    assert_eq!(overview[0].spent, dec("60"));
    assert_eq!(overview[0].left, dec("40"));
}

#[test]
fn category_history_averages_prior_months() {
    let mut conn = setup();
    let checking = personal(&conn, "checking");
    let food = store::create_category(&conn, "Food").unwrap().id;
    for (d, amount) in [
        ("2021-04-10", "30"),
        ("2021-05-10", "50"),
        ("2021-06-10", "70"),
    ] {
        store::withdraw(
            &mut conn,
            checking,
            "Grocer",
            dec(amount),
            date(d),
            "Shop",
            Some(food),
            None,
        )
        .unwrap();
    }

    let history = query::category_history(&conn, food, "2021-06").unwrap();
    assert_eq!(history.spent, dec("70"));
    assert_eq!(history.last_month, dec("50"));
    assert_eq!(history.two_month_average, dec("40"));
}
