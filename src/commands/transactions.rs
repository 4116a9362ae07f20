// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::AccountType;
use crate::store::{self, PostingHeader, SplitLine};
use crate::utils::{
    id_for_account, id_for_category, maybe_print_json, parse_date, parse_decimal, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transfer", sub)) => transfer(conn, sub)?,
        Some(("withdraw", sub)) => withdraw(conn, sub)?,
        Some(("deposit", sub)) => deposit(conn, sub)?,
        Some(("split", sub)) => split(conn, sub)?,
        Some(("reconcile", sub)) => reconcile(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            store::delete_transaction(conn, id)?;
            println!("Removed transaction {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn category_arg(conn: &Connection, sub: &clap::ArgMatches) -> Result<Option<i64>> {
    sub.get_one::<String>("category")
        .map(|c| id_for_category(conn, c))
        .transpose()
}

fn transfer(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let src = id_for_account(
        conn,
        sub.get_one::<String>("src").unwrap(),
        AccountType::Personal,
    )?;
    let dst = id_for_account(
        conn,
        sub.get_one::<String>("dst").unwrap(),
        AccountType::Personal,
    )?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let title = sub.get_one::<String>("title").unwrap();
    let category = category_arg(conn, sub)?;
    let note = sub.get_one::<String>("note").cloned();
    let tx = store::transfer(conn, src, dst, amount, date, title, category, note)?;
    println!("Recorded transfer '{}' of {} (id {})", title, amount, tx.id);
    Ok(())
}

fn withdraw(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let account = id_for_account(
        conn,
        sub.get_one::<String>("account").unwrap(),
        AccountType::Personal,
    )?;
    let payee = sub.get_one::<String>("payee").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let title = sub.get_one::<String>("title").unwrap();
    let category = category_arg(conn, sub)?;
    let note = sub.get_one::<String>("note").cloned();
    let tx = store::withdraw(conn, account, payee, amount, date, title, category, note)?;
    println!(
        "Recorded withdraw '{}' of {} at '{}' (id {})",
        title, amount, payee, tx.id
    );
    Ok(())
}

fn deposit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let account = id_for_account(
        conn,
        sub.get_one::<String>("account").unwrap(),
        AccountType::Personal,
    )?;
    let payer = sub.get_one::<String>("payer").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let title = sub.get_one::<String>("title").unwrap();
    let category = category_arg(conn, sub)?;
    let note = sub.get_one::<String>("note").cloned();
    let tx = store::deposit(conn, account, payer, amount, date, title, category, note)?;
    println!(
        "Recorded deposit '{}' of {} from '{}' (id {})",
        title, amount, payer, tx.id
    );
    Ok(())
}

fn resolve_any_account(conn: &Connection, name: &str) -> Result<i64> {
    for t in [AccountType::Personal, AccountType::Foreign] {
        if let Some(acct) = store::find_account(conn, name, t)? {
            return Ok(acct.id);
        }
    }
    Err(anyhow!("Account '{}' not found", name))
}

fn split(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let title = sub.get_one::<String>("title").unwrap();
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let src = resolve_any_account(conn, sub.get_one::<String>("src").unwrap())?;
    let dst = resolve_any_account(conn, sub.get_one::<String>("dst").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;

    let mut lines = Vec::new();
    for raw in sub.get_many::<String>("line").unwrap() {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 {
            return Err(anyhow!(
                "Invalid split line '{}', expected account:opposing:amount[:category]",
                raw
            ));
        }
        let category = match parts.get(3) {
            Some(c) if !c.is_empty() => Some(id_for_category(conn, c)?),
            _ => None,
        };
        lines.push(SplitLine {
            account_id: resolve_any_account(conn, parts[0])?,
            opposing_id: resolve_any_account(conn, parts[1])?,
            amount: parse_decimal(parts[2])
                .with_context(|| format!("Invalid amount in split line '{}'", raw))?,
            date,
            category_id: category,
        });
    }

    let tx = store::post(
        conn,
        &PostingHeader {
            title: title.to_string(),
            date,
            src_id: src,
            dst_id: dst,
            amount,
            transaction_type: None,
            category_id: None,
            recurrence_id: None,
            notes: None,
        },
        Some(lines),
    )?;
    println!(
        "Recorded split transaction '{}' with {} lines (id {})",
        title,
        tx.splits.len(),
        tx.id
    );
    Ok(())
}

fn reconcile(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let account_name = sub.get_one::<String>("account").unwrap();
    let account = id_for_account(conn, account_name, AccountType::Personal)?;
    let balance = parse_decimal(sub.get_one::<String>("balance").unwrap())?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let title = sub.get_one::<String>("title").unwrap();
    let tx = store::reconcile(conn, account, balance, date, title)?;
    println!(
        "Reconciled '{}' to {} (correction of {}, id {})",
        account_name, balance, tx.amount, tx.id
    );
    Ok(())
}

fn update(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let existing = store::get_transaction(conn, id)?;
    let header = PostingHeader {
        title: sub
            .get_one::<String>("title")
            .cloned()
            .unwrap_or(existing.title),
        date: sub
            .get_one::<String>("date")
            .map(|d| parse_date(d))
            .transpose()?
            .unwrap_or(existing.date),
        src_id: existing.src_id,
        dst_id: existing.dst_id,
        amount: sub
            .get_one::<String>("amount")
            .map(|a| parse_decimal(a))
            .transpose()?
            .unwrap_or(existing.amount),
        transaction_type: Some(existing.transaction_type),
        category_id: existing.splits.first().and_then(|s| s.category_id),
        recurrence_id: existing.recurrence_id,
        notes: existing.notes,
    };
    store::update_posting(conn, id, &header, None)?;
    println!("Updated transaction {}", id);
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub title: String,
    pub transaction_type: String,
    pub amount: String,
    pub src: String,
    pub dst: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.title, t.type, t.amount, s.name, d.name FROM transactions t \
         JOIN accounts s ON t.src_id=s.id JOIN accounts d ON t.dst_id=d.id WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND (s.name=? OR d.name=?)");
        params_vec.push(acct.into());
        params_vec.push(acct.into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            title: r.get(2)?,
            transaction_type: r.get(3)?,
            amount: r.get(4)?,
            src: r.get(5)?,
            dst: r.get(6)?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.title.clone(),
                    r.transaction_type.clone(),
                    r.amount.clone(),
                    r.src.clone(),
                    r.dst.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Id", "Date", "Title", "Type", "Amount", "From", "To"], rows)
        );
    }
    Ok(())
}
