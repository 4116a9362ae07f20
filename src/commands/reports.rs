// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::AccountType;
use crate::query;
use crate::utils::{
    id_for_account, id_for_category, maybe_print_json, parse_date, parse_month, pretty_table,
};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("balance", sub)) => balance(conn, sub)?,
        Some(("series", sub)) => series(conn, sub)?,
        Some(("dashboard", sub)) => dashboard(conn, sub)?,
        Some(("spend-by-category", sub)) => spend_by_category(conn, sub)?,
        Some(("category-history", sub)) => category_history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn balance(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("account").unwrap();
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => chrono::Utc::now().date_naive(),
    };
    let id = id_for_account(conn, name, AccountType::Personal)?;
    let bal = query::balance_on(conn, id, date)?;
    println!("{} on {}: {:.2}", name, date, bal);
    Ok(())
}

fn series(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let steps = *sub.get_one::<u32>("steps").unwrap();
    let points = match sub.get_one::<String>("account") {
        Some(name) => {
            let id = id_for_account(conn, name, AccountType::Personal)?;
            query::data_points(conn, id, start, end, steps)?
        }
        None => query::dashboard_data_points(conn, start, end, steps)?,
    };

    // Same shape the balance chart consumes: labels and data as strings.
    let labels: Vec<String> = points.iter().map(|(d, _)| d.to_string()).collect();
    let data: Vec<String> = points.iter().map(|(_, b)| format!("{:.2}", b)).collect();
    let payload = serde_json::json!({ "labels": labels, "data": data });
    if !maybe_print_json(json_flag, jsonl_flag, &payload)? {
        let rows = points
            .iter()
            .map(|(d, b)| vec![d.to_string(), format!("{:.2}", b)])
            .collect();
        println!("{}", pretty_table(&["Date", "Balance"], rows));
    }
    Ok(())
}

fn dashboard(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let today = chrono::Utc::now().date_naive();
    let summary = query::dashboard(conn, today)?;
    if !maybe_print_json(json_flag, jsonl_flag, &summary)? {
        let rows = vec![
            vec!["Income".to_string(), format!("{:.2}", summary.income)],
            vec!["Expenses".to_string(), format!("{:.2}", summary.expenses)],
            vec!["Difference".to_string(), format!("{:.2}", summary.difference)],
            vec!["Balance".to_string(), format!("{:.2}", summary.balance)],
            vec![
                "Previous income".to_string(),
                format!("{:.2}", summary.previous_income),
            ],
            vec![
                "Previous expenses".to_string(),
                format!("{:.2}", summary.previous_expenses),
            ],
            vec![
                "Previous difference".to_string(),
                format!("{:.2}", summary.previous_difference),
            ],
            vec!["Upcoming".to_string(), format!("{:.2}", summary.upcoming)],
            vec![
                "Outstanding".to_string(),
                format!("{:.2}", summary.outstanding),
            ],
            vec![
                "Expected balance".to_string(),
                format!("{:.2}", summary.expected_balance),
            ],
        ];
        println!("{}", pretty_table(&["Metric", "Amount"], rows));

        let recent = query::last_transactions(conn, 10)?;
        let rows = recent
            .iter()
            .map(|s| {
                vec![
                    s.date.to_string(),
                    s.title.clone(),
                    format!("{:.2}", s.amount),
                    s.account.clone(),
                    s.opposing.clone(),
                    s.category.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Title", "Amount", "Account", "Opposing", "Category"],
                rows
            )
        );
    }
    Ok(())
}

fn spend_by_category(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let spending = query::category_spending(conn, &month)?;
    if !maybe_print_json(json_flag, jsonl_flag, &spending)? {
        let rows = spending
            .iter()
            .map(|c| {
                vec![
                    c.category.clone(),
                    format!("{:.2}", c.spent),
                    format!("{:.2}", c.income),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Spent", "Income"], rows));
    }
    Ok(())
}

fn category_history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let name = sub.get_one::<String>("category").unwrap();
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let id = id_for_category(conn, name)?;
    let history = query::category_history(conn, id, &month)?;
    if !maybe_print_json(json_flag, jsonl_flag, &history)? {
        let rows = vec![
            vec![month.clone(), format!("{:.2}", history.spent)],
            vec!["Last month".to_string(), format!("{:.2}", history.last_month)],
            vec![
                "Two-month average".to_string(),
                format!("{:.2}", history.two_month_average),
            ],
        ];
        println!("{}", pretty_table(&[name.as_str(), "Spent"], rows));
    }
    Ok(())
}
