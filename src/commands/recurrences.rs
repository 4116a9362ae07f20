// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{AccountType, Interval, RecurringTransaction, WeekendHandling};
use crate::recurrence;
use crate::store;
use crate::utils::{id_for_account, id_for_category, parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("skip", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let next = recurrence::skip(conn, id)?;
            println!("Recurrence {} skipped; next due {}", id, next);
        }
        Some(("generate", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let date = sub
                .get_one::<String>("date")
                .map(|d| parse_date(d))
                .transpose()?;
            let tx = recurrence::generate(conn, id, date)?;
            println!("Posted '{}' from recurrence {} (id {})", tx.title, id, tx.id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            recurrence::delete_recurrence(conn, id)?;
            println!("Removed recurrence {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let src_type = AccountType::parse(sub.get_one::<String>("src-type").unwrap())?;
    let dst_type = AccountType::parse(sub.get_one::<String>("dst-type").unwrap())?;
    let src_id = id_for_account(conn, sub.get_one::<String>("src").unwrap(), src_type)?;
    let dst_id = id_for_account(conn, sub.get_one::<String>("dst").unwrap(), dst_type)?;
    let transaction_type = store::derive_type(src_type, dst_type)?;
    let category_id = sub
        .get_one::<String>("category")
        .map(|c| id_for_category(conn, c))
        .transpose()?;

    let r = recurrence::create_recurrence(
        conn,
        &RecurringTransaction {
            id: 0,
            title: sub.get_one::<String>("title").unwrap().clone(),
            amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
            date: parse_date(sub.get_one::<String>("date").unwrap())?,
            src_id,
            dst_id,
            interval: Interval::parse(sub.get_one::<String>("interval").unwrap())?,
            multiplier: *sub.get_one::<u32>("multiplier").unwrap(),
            weekend_handling: WeekendHandling::parse(sub.get_one::<String>("weekend").unwrap())?,
            usual_month_day: *sub.get_one::<u32>("month-day").unwrap(),
            transaction_type,
            category_id,
        },
    )?;
    println!("Added recurrence '{}' next due {} (id {})", r.title, r.date, r.id);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let recurrences = recurrence::list_recurrences(conn)?;
    if !crate::utils::maybe_print_json(json_flag, jsonl_flag, &recurrences)? {
        let rows = recurrences
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.title.clone(),
                    r.date.to_string(),
                    format!("{} x{}", r.interval.as_str(), r.multiplier),
                    r.weekend_handling.as_str().to_string(),
                    format!("{:.2}", r.amount),
                    r.transaction_type.as_str().to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Title", "Next due", "Interval", "Weekend", "Amount", "Type"],
                rows
            )
        );
    }
    Ok(())
}
