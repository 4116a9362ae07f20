// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::parse_date;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::io::Write;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let out = sub.get_one::<String>("out").unwrap();

    let account_ids = match sub.get_many::<String>("account") {
        Some(names) => {
            let mut ids = Vec::new();
            for name in names {
                let id: i64 = conn
                    .query_row(
                        "SELECT id FROM accounts WHERE name=?1 AND type != 'system'",
                        [name],
                        |r| r.get(0),
                    )
                    .map_err(|_| anyhow!("Account '{}' not found", name))?;
                ids.push(id);
            }
            ids
        }
        None => Vec::new(),
    };

    let file = std::fs::File::create(out)?;
    let n = export_splits(conn, start, end, &account_ids, file)?;
    println!("Exported {} rows to {}", n, out);
    Ok(())
}

/// Write splits in [start, end] as semicolon-separated CSV, one row per
/// transfer (the positive mirror side is excluded). An empty account set
/// exports every account.
pub fn export_splits<W: Write>(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    account_ids: &[i64],
    out: W,
) -> Result<usize> {
    let mut sql = String::from(
        "SELECT a.name, o.name, s.date, s.amount, c.name
         FROM splits s
         JOIN transactions t ON t.id = s.transaction_id
         JOIN accounts a ON a.id = s.account_id
         JOIN accounts o ON o.id = s.opposing_id
         LEFT JOIN categories c ON c.id = s.category_id
         WHERE s.date >= ?1 AND s.date <= ?2
           AND NOT (t.type='transfer' AND CAST(s.amount AS REAL) > 0)",
    );
    let mut params_vec: Vec<String> = vec![start.to_string(), end.to_string()];
    if !account_ids.is_empty() {
        sql.push_str(" AND s.account_id IN (");
        for (i, id) in account_ids.iter().enumerate() {
            if i > 0 {
                sql.push(',');
            }
            sql.push('?');
            params_vec.push(id.to_string());
        }
        sql.push(')');
    }
    sql.push_str(" ORDER BY s.date, s.id");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
    wtr.write_record(["account", "opposing_account", "date", "amount", "category"])?;
    let mut n = 0usize;
    while let Some(r) = rows.next()? {
        let account: String = r.get(0)?;
        let opposing: String = r.get(1)?;
        let date: String = r.get(2)?;
        let amount_s: String = r.get(3)?;
        let category: Option<String> = r.get(4)?;
        let amount = crate::utils::parse_decimal(&amount_s)?;
        wtr.write_record([
            account,
            opposing,
            date,
            format!("{:.2}", amount),
            category.unwrap_or_default(),
        ])?;
        n += 1;
    }
    wtr.flush()?;
    Ok(n)
}
