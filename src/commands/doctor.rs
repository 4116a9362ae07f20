// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    let mut stmt = conn.prepare("SELECT id FROM transactions ORDER BY id")?;
    let ids: Vec<i64> = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    for id in ids {
        let tx = store::get_transaction(conn, id)?;

        let sum: Decimal = tx.splits.iter().map(|s| s.amount).sum();
        if !sum.is_zero() {
            rows.push(vec![
                "unbalanced_splits".into(),
                format!("transaction {} sums to {}", id, sum),
            ]);
        }

        if tx.amount < Decimal::ZERO {
            rows.push(vec![
                "negative_headline".into(),
                format!("transaction {} amount {}", id, tx.amount),
            ]);
        }

        let src = store::get_account(conn, tx.src_id)?;
        let dst = store::get_account(conn, tx.dst_id)?;
        match store::derive_type(src.account_type, dst.account_type) {
            Ok(derived) if derived == tx.transaction_type => {}
            Ok(derived) => rows.push(vec![
                "type_mismatch".into(),
                format!(
                    "transaction {} stored {} but participants imply {}",
                    id,
                    tx.transaction_type.as_str(),
                    derived.as_str()
                ),
            ]),
            Err(_) => rows.push(vec![
                "untypable_participants".into(),
                format!("transaction {} ({} -> {})", id, src.name, dst.name),
            ]),
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
