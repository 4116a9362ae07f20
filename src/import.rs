// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;

use crate::models::{AccountType, Transaction, TransactionType};
use crate::store::{self, PostingHeader, SplitLine};
use crate::utils::{parse_date, parse_decimal};

/// One parsed bank-statement record. Negative amounts are outflows from
/// the user's account. `transaction_date` falls back to `book_date` when
/// the statement does not carry one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatement {
    pub book_date: NaiveDate,
    pub transaction_date: NaiveDate,
    pub account: String,
    pub notes: String,
    pub iban: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedRecord {
    pub statement: ImportStatement,
    pub suggested_account: Option<i64>,
    pub ignore: bool,
}

/// Read statement records from CSV with columns
/// `book_date,transaction_date,account,notes,iban,amount`.
pub fn read_statements<R: Read>(reader: R) -> Result<Vec<ImportStatement>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut out = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        let book_raw = rec.get(0).context("book_date missing")?.trim().to_string();
        let txn_raw = rec.get(1).unwrap_or("").trim().to_string();
        let account = rec.get(2).context("account missing")?.trim().to_string();
        let notes = rec.get(3).unwrap_or("").trim().to_string();
        let iban = rec.get(4).unwrap_or("").trim().to_string();
        let amount_raw = rec.get(5).context("amount missing")?.trim().to_string();

        let book_date = parse_date(&book_raw)
            .with_context(|| format!("Invalid book date '{}'", book_raw))?;
        let transaction_date = if txn_raw.is_empty() {
            book_date
        } else {
            parse_date(&txn_raw)
                .with_context(|| format!("Invalid transaction date '{}'", txn_raw))?
        };
        let amount = parse_decimal(&amount_raw)
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw, account))?;
        out.push(ImportStatement {
            book_date,
            transaction_date,
            account,
            notes,
            iban,
            amount,
        });
    }
    Ok(out)
}

/// Stage 1: suggest an account per record. IBAN hints win; name hints are
/// consulted next, except names that map to more than one account, which
/// are ambiguous and dropped.
pub fn classify(conn: &Connection, records: Vec<ImportStatement>) -> Result<Vec<StagedRecord>> {
    let mut ibans: HashMap<String, i64> = HashMap::new();
    let mut stmt = conn.prepare("SELECT iban, account_id FROM account_ibans")?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let iban: String = r.get(0)?;
        let account_id: i64 = r.get(1)?;
        ibans.entry(iban).or_insert(account_id);
    }

    // None marks a name claimed by more than one account.
    let mut names: HashMap<String, Option<i64>> = HashMap::new();
    let mut stmt = conn.prepare("SELECT name, account_id FROM account_names")?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let name: String = r.get(0)?;
        let account_id: i64 = r.get(1)?;
        names
            .entry(name)
            .and_modify(|existing| {
                if *existing != Some(account_id) {
                    *existing = None;
                }
            })
            .or_insert(Some(account_id));
    }

    Ok(records
        .into_iter()
        .map(|statement| {
            let suggested_account = if !statement.iban.is_empty() {
                ibans.get(&statement.iban).copied()
            } else {
                None
            }
            .or_else(|| names.get(&statement.account).copied().flatten());
            StagedRecord {
                statement,
                suggested_account,
                ignore: false,
            }
        })
        .collect())
}

/// Stage 2: mark records that already exist in the ledger. Fingerprints
/// are (counterparty account, date, headline amount) over the record date
/// range; transfers contribute both sides.
pub fn mark_duplicates(conn: &Connection, staged: &mut [StagedRecord]) -> Result<()> {
    let Some(min_d) = staged.iter().map(|s| s.statement.book_date).min() else {
        return Ok(());
    };
    let max_d = staged.iter().map(|s| s.statement.book_date).max().unwrap();

    let mut seen: HashSet<(i64, NaiveDate, Decimal)> = HashSet::new();
    let mut stmt = conn.prepare(
        "SELECT type, date, amount, src_id, dst_id FROM transactions
         WHERE date >= ?1 AND date <= ?2",
    )?;
    let mut rows = stmt.query(params![min_d.to_string(), max_d.to_string()])?;
    while let Some(r) = rows.next()? {
        let type_s: String = r.get(0)?;
        let date_s: String = r.get(1)?;
        let amount_s: String = r.get(2)?;
        let src_id: i64 = r.get(3)?;
        let dst_id: i64 = r.get(4)?;
        let date = parse_date(&date_s)?;
        let amount = amount_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}'", amount_s))?
            .normalize();
        match TransactionType::parse(&type_s)? {
            TransactionType::Transfer => {
                seen.insert((src_id, date, amount));
                seen.insert((dst_id, date, amount));
            }
            TransactionType::Deposit => {
                seen.insert((src_id, date, amount));
            }
            TransactionType::Withdraw => {
                seen.insert((dst_id, date, amount));
            }
            TransactionType::System => {}
        }
    }

    for rec in staged.iter_mut() {
        if let Some(account_id) = rec.suggested_account {
            let key = (
                account_id,
                rec.statement.book_date,
                rec.statement.amount.abs().normalize(),
            );
            if seen.contains(&key) {
                rec.ignore = true;
            }
        }
    }
    Ok(())
}

/// Stages 1 and 2 together: classify, then mark duplicates.
pub fn stage(conn: &Connection, records: Vec<ImportStatement>) -> Result<Vec<StagedRecord>> {
    let mut staged = classify(conn, records)?;
    mark_duplicates(conn, &mut staged)?;
    Ok(staged)
}

fn learn_hints(conn: &Connection, account_id: i64, statement: &ImportStatement) -> Result<()> {
    if !statement.iban.is_empty() {
        conn.execute(
            "INSERT OR IGNORE INTO account_ibans(account_id, iban) VALUES (?1, ?2)",
            params![account_id, statement.iban],
        )?;
    }
    if !statement.account.is_empty() {
        conn.execute(
            "INSERT OR IGNORE INTO account_names(account_id, name) VALUES (?1, ?2)",
            params![account_id, statement.account],
        )?;
    }
    Ok(())
}

/// Stage 3 for a single confirmed record: resolve the counterparty
/// (get-or-create FOREIGN by name when nothing was suggested), remember
/// its IBAN and name for future classification, derive direction from the
/// amount sign, and post with dual value dates (the target-account split
/// keeps the bank book date).
pub fn commit_record(
    conn: &mut Connection,
    target_id: i64,
    rec: &StagedRecord,
    title: &str,
    category_id: Option<i64>,
    recurrence_id: Option<i64>,
) -> Result<Transaction> {
    let statement = &rec.statement;
    let counterparty_id = match rec.suggested_account {
        Some(id) => id,
        None => store::get_or_create_foreign(conn, &statement.account)?.id,
    };
    learn_hints(conn, counterparty_id, statement)?;

    let counterparty = store::get_account(conn, counterparty_id)?;
    let outflow = statement.amount < Decimal::ZERO;
    let (src_id, dst_id, transaction_type) = match counterparty.account_type {
        AccountType::Personal => {
            if outflow {
                (target_id, counterparty_id, TransactionType::Transfer)
            } else {
                (counterparty_id, target_id, TransactionType::Transfer)
            }
        }
        AccountType::Foreign => {
            if outflow {
                (target_id, counterparty_id, TransactionType::Withdraw)
            } else {
                (counterparty_id, target_id, TransactionType::Deposit)
            }
        }
        AccountType::System => {
            return Err(anyhow!("cannot import against the system account"));
        }
    };

    let header = PostingHeader {
        title: title.to_string(),
        date: statement.transaction_date,
        src_id,
        dst_id,
        amount: statement.amount.abs(),
        transaction_type: Some(transaction_type),
        category_id,
        recurrence_id,
        notes: if statement.notes.is_empty() {
            None
        } else {
            Some(statement.notes.clone())
        },
    };
    let splits = vec![
        SplitLine {
            account_id: target_id,
            opposing_id: counterparty_id,
            amount: statement.amount,
            date: statement.book_date,
            category_id,
        },
        SplitLine {
            account_id: counterparty_id,
            opposing_id: target_id,
            amount: -statement.amount,
            date: statement.transaction_date,
            category_id,
        },
    ];
    store::post(conn, &header, Some(splits))
}

#[derive(Debug, Default, Serialize)]
pub struct CommitOutcome {
    pub posted: usize,
    pub ignored: usize,
    pub errors: Vec<String>,
}

/// Commit every confirmed record. Each record posts in its own database
/// transaction; a record that fails is recorded and skipped so the rest of
/// the session still lands.
pub fn commit_session(
    conn: &mut Connection,
    target_id: i64,
    staged: &[StagedRecord],
) -> Result<CommitOutcome> {
    let mut outcome = CommitOutcome::default();
    for rec in staged {
        if rec.ignore {
            outcome.ignored += 1;
            continue;
        }
        let title = if rec.statement.account.is_empty() {
            "Imported transaction".to_string()
        } else {
            rec.statement.account.clone()
        };
        match commit_record(conn, target_id, rec, &title, None, None) {
            Ok(_) => outcome.posted += 1,
            Err(e) => outcome.errors.push(format!(
                "{} {}: {:#}",
                rec.statement.book_date, rec.statement.account, e
            )),
        }
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Firefly bulk import

#[derive(Debug, Default, Serialize)]
pub struct FireflyOutcome {
    pub created: usize,
    pub skipped: usize,
}

fn get_or_create_account(
    conn: &Connection,
    name: &str,
    account_type: AccountType,
) -> Result<i64> {
    if let Some(acct) = store::find_account(conn, name.trim(), account_type)? {
        return Ok(acct.id);
    }
    Ok(store::create_account(conn, name, account_type, None, false)?.id)
}

/// Bulk import from a Firefly-style CSV export with columns
/// `date,title,type,amount,source_name,destination_name,category,notes`.
/// Accounts and categories are created on first sight by exact name.
/// Transfer rows with a positive amount are the mirror half of a transfer
/// already present in the file and are skipped, as are rows identical to
/// an already-stored transaction, so re-running the import is safe.
pub fn import_firefly<R: Read>(conn: &mut Connection, reader: R) -> Result<FireflyOutcome> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut outcome = FireflyOutcome::default();

    for result in rdr.records() {
        let rec = result?;
        let date_raw = rec.get(0).context("date missing")?.trim().to_string();
        let title = rec.get(1).context("title missing")?.trim().to_string();
        let type_raw = rec.get(2).context("type missing")?.trim().to_lowercase();
        let amount_raw = rec.get(3).context("amount missing")?.trim().to_string();
        let source = rec.get(4).unwrap_or("").trim().to_string();
        let destination = rec.get(5).unwrap_or("").trim().to_string();
        let category = rec.get(6).unwrap_or("").trim().to_string();
        let notes = rec
            .get(7)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let date = parse_date(&date_raw)
            .with_context(|| format!("Invalid date '{}'", date_raw))?;
        let amount = parse_decimal(&amount_raw)
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw, title))?;

        let transaction_type = match type_raw.as_str() {
            "withdrawal" => TransactionType::Withdraw,
            "deposit" => TransactionType::Deposit,
            "transfer" => TransactionType::Transfer,
            other => return Err(anyhow!("Unknown record type '{}'", other)),
        };
        if transaction_type == TransactionType::Transfer && amount > Decimal::ZERO {
            outcome.skipped += 1;
            continue;
        }

        let (src_id, dst_id) = match transaction_type {
            TransactionType::Withdraw => (
                get_or_create_account(conn, &source, AccountType::Personal)?,
                get_or_create_account(conn, &destination, AccountType::Foreign)?,
            ),
            TransactionType::Deposit => (
                get_or_create_account(conn, &source, AccountType::Foreign)?,
                get_or_create_account(conn, &destination, AccountType::Personal)?,
            ),
            _ => (
                get_or_create_account(conn, &source, AccountType::Personal)?,
                get_or_create_account(conn, &destination, AccountType::Personal)?,
            ),
        };

        let headline = amount.abs();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions
              WHERE title=?1 AND date=?2 AND amount=?3 AND type=?4 AND src_id=?5 AND dst_id=?6)",
            params![
                title,
                date.to_string(),
                headline.to_string(),
                transaction_type.as_str(),
                src_id,
                dst_id,
            ],
            |r| r.get(0),
        )?;
        if exists {
            outcome.skipped += 1;
            continue;
        }

        let category_id = if category.is_empty() {
            None
        } else {
            Some(store::get_or_create_category(conn, &category)?.id)
        };
        store::post(
            conn,
            &PostingHeader {
                title,
                date,
                src_id,
                dst_id,
                amount: headline,
                transaction_type: Some(transaction_type),
                category_id,
                recurrence_id: None,
                notes,
            },
            None,
        )?;
        outcome.created += 1;
    }
    Ok(outcome)
}
