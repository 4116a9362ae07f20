// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{id_for_category, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            store::create_category(conn, name)?;
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let categories = store::list_categories(conn, false)?;
            if !crate::utils::maybe_print_json(json_flag, jsonl_flag, &categories)? {
                let rows = categories
                    .iter()
                    .map(|c| {
                        vec![
                            c.name.clone(),
                            if c.active { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Category", "Active"], rows));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_category(conn, name)?;
            store::delete_category(conn, id)?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
