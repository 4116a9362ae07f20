// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::AccountType;
use crate::store;
use crate::utils::{id_for_account, parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let account_type = AccountType::parse(sub.get_one::<String>("type").unwrap())?;
            let iban = sub.get_one::<String>("iban").map(|s| s.as_str());
            let dashboard = sub.get_flag("dashboard");
            let acct = store::create_account(conn, name, account_type, iban, dashboard)?;
            println!("Added account '{}' ({})", acct.name, acct.account_type.as_str());
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let filter = sub
                .get_one::<String>("type")
                .map(|s| AccountType::parse(s))
                .transpose()?;
            let accounts = store::list_accounts(conn, filter)?;
            if !crate::utils::maybe_print_json(json_flag, jsonl_flag, &accounts)? {
                let rows = accounts
                    .iter()
                    .map(|a| {
                        vec![
                            a.name.clone(),
                            a.account_type.as_str().to_string(),
                            if a.active { "yes" } else { "no" }.to_string(),
                            if a.show_on_dashboard { "yes" } else { "no" }.to_string(),
                            a.iban.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Type", "Active", "Dashboard", "IBAN"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let account_type = AccountType::parse(sub.get_one::<String>("type").unwrap())?;
            let id = id_for_account(conn, name, account_type)?;
            store::delete_account(conn, id)?;
            println!("Removed account '{}'", name);
        }
        Some(("merge", sub)) => {
            let into_name = sub.get_one::<String>("into").unwrap();
            let into = id_for_account(conn, into_name, AccountType::Foreign)?;
            let mut targets = Vec::new();
            for name in sub.get_many::<String>("targets").unwrap() {
                targets.push(id_for_account(conn, name, AccountType::Foreign)?);
            }
            let n = store::merge_accounts(conn, &targets, into)?;
            println!("{} accounts merged into {}", n, into_name);
        }
        Some(("set-balance", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let id = id_for_account(conn, name, AccountType::Personal)?;
            store::set_initial_balance(conn, id, amount, date)?;
            println!("Initial balance of {} recorded for '{}'", amount, name);
        }
        _ => {}
    }
    Ok(())
}
