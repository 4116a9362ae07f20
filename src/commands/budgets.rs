// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::query;
use crate::store;
use crate::utils::{id_for_category, parse_decimal, parse_month, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("report", sub)) => report(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let cat = sub.get_one::<String>("category").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let cat_id = id_for_category(conn, cat)?;
    store::set_budget(conn, cat_id, &month, amount)?;
    println!("Budget set for {} / {} = {}", month, cat, amount);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let month = sub.get_one::<String>("month").map(|s| s.as_str());
    let budgets = store::list_budgets(conn, month)?;
    let categories = store::list_categories(conn, false)?;
    let rows = budgets
        .iter()
        .map(|b| {
            let cat = categories
                .iter()
                .find(|c| c.id == b.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            vec![b.month.clone(), cat, format!("{:.2}", b.amount)]
        })
        .collect();
    println!("{}", pretty_table(&["Month", "Category", "Budget"], rows));
    Ok(())
}

fn report(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let overview = query::budget_overview(conn, &month)?;
    if !crate::utils::maybe_print_json(json_flag, jsonl_flag, &overview)? {
        let rows = overview
            .iter()
            .map(|r| {
                vec![
                    r.category.clone(),
                    format!("{:.2}", r.budget),
                    format!("{:.2}", r.spent),
                    format!("{:.2}", r.left),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Category", "Budget", "Spent", "Left"], rows)
        );
    }
    Ok(())
}
