// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::import;
use crate::models::AccountType;
use crate::utils::{id_for_account, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fs::File;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("statements", sub)) => import_statements(conn, sub),
        Some(("firefly", sub)) => import_firefly(conn, sub),
        _ => Ok(()),
    }
}

fn import_statements(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let account_name = sub.get_one::<String>("account").unwrap();
    let dry_run = sub.get_flag("dry-run");
    let target = id_for_account(conn, account_name, AccountType::Personal)?;

    let file = File::open(path).with_context(|| format!("Open CSV {}", path))?;
    let records = import::read_statements(file)?;
    let staged = import::stage(conn, records)?;

    if dry_run {
        let rows = staged
            .iter()
            .map(|s| {
                vec![
                    s.statement.book_date.to_string(),
                    s.statement.account.clone(),
                    format!("{:.2}", s.statement.amount),
                    s.suggested_account
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    if s.ignore { "duplicate" } else { "" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Date", "Counterparty", "Amount", "Suggested", "Status"], rows)
        );
        return Ok(());
    }

    let outcome = import::commit_session(conn, target, &staged)?;
    println!(
        "Imported {} records into '{}' ({} duplicates ignored)",
        outcome.posted, account_name, outcome.ignored
    );
    for err in &outcome.errors {
        eprintln!("skipped: {}", err);
    }
    Ok(())
}

fn import_firefly(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let file = File::open(path).with_context(|| format!("Open CSV {}", path))?;
    let outcome = import::import_firefly(conn, file)?;
    println!(
        "Firefly import complete: {} created, {} skipped",
        outcome.created, outcome.skipped
    );
    Ok(())
}
