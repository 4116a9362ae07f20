// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::errors::LedgerError;
use crate::models::{Account, AccountType, Budget, Category, Split, Transaction, TransactionType};

pub const MAX_ACCOUNT_NAME_LEN: usize = 64;
pub const INITIAL_BALANCE_TITLE: &str = "Initial Balance";

/// Header fields for the single write primitive. When `transaction_type`
/// is None the type is derived from the participants' account types;
/// when Some it is cross-checked against the derivation.
#[derive(Debug, Clone)]
pub struct PostingHeader {
    pub title: String,
    pub date: NaiveDate,
    pub src_id: i64,
    pub dst_id: i64,
    pub amount: Decimal,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<i64>,
    pub recurrence_id: Option<i64>,
    pub notes: Option<String>,
}

/// One posting line as supplied by a caller. Ids are assigned on commit.
#[derive(Debug, Clone)]
pub struct SplitLine {
    pub account_id: i64,
    pub opposing_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Accounts

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, bool, bool, Option<String>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn map_account(raw: (i64, String, String, bool, bool, Option<String>)) -> Result<Account> {
    Ok(Account {
        id: raw.0,
        name: raw.1,
        account_type: AccountType::parse(&raw.2)?,
        active: raw.3,
        show_on_dashboard: raw.4,
        iban: raw.5,
    })
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    let raw = conn
        .query_row(
            "SELECT id, name, type, active, show_on_dashboard, iban FROM accounts WHERE id=?1",
            params![id],
            account_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))?;
    map_account(raw)
}

pub fn find_account(conn: &Connection, name: &str, account_type: AccountType) -> Result<Option<Account>> {
    let raw = conn
        .query_row(
            "SELECT id, name, type, active, show_on_dashboard, iban
             FROM accounts WHERE name=?1 AND type=?2",
            params![name, account_type.as_str()],
            account_from_row,
        )
        .optional()?;
    raw.map(map_account).transpose()
}

pub fn create_account(
    conn: &Connection,
    name: &str,
    account_type: AccountType,
    iban: Option<&str>,
    show_on_dashboard: bool,
) -> Result<Account> {
    if account_type == AccountType::System {
        return Err(LedgerError::SystemAccountProtected.into());
    }
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_ACCOUNT_NAME_LEN {
        return Err(LedgerError::InvalidPosting(format!(
            "account name must be 1-{} characters",
            MAX_ACCOUNT_NAME_LEN
        ))
        .into());
    }
    if find_account(conn, name, account_type)?.is_some() {
        return Err(LedgerError::DuplicateAccountName(name.to_string()).into());
    }
    conn.execute(
        "INSERT INTO accounts(name, type, active, show_on_dashboard, iban) VALUES (?1, ?2, 1, ?3, ?4)",
        params![name, account_type.as_str(), show_on_dashboard, iban],
    )?;
    get_account(conn, conn.last_insert_rowid())
}

/// Counterparties named on withdraws, deposits and imports are created on
/// first sight.
pub fn get_or_create_foreign(conn: &Connection, name: &str) -> Result<Account> {
    if let Some(acct) = find_account(conn, name.trim(), AccountType::Foreign)? {
        return Ok(acct);
    }
    create_account(conn, name, AccountType::Foreign, None, false)
}

/// Active accounts first, then by name.
pub fn list_accounts(conn: &Connection, filter: Option<AccountType>) -> Result<Vec<Account>> {
    let mut sql = String::from(
        "SELECT id, name, type, active, show_on_dashboard, iban FROM accounts",
    );
    if filter.is_some() {
        sql.push_str(" WHERE type=?1");
    }
    sql.push_str(" ORDER BY active DESC, name");
    let mut stmt = conn.prepare(&sql)?;
    let mut out = Vec::new();
    let mut rows = match filter {
        Some(t) => stmt.query(params![t.as_str()])?,
        None => stmt.query([])?,
    };
    while let Some(row) = rows.next()? {
        out.push(map_account(account_from_row(row)?)?);
    }
    Ok(out)
}

pub fn rename_account(conn: &Connection, id: i64, new_name: &str) -> Result<()> {
    let acct = get_account(conn, id)?;
    if acct.account_type == AccountType::System {
        return Err(LedgerError::SystemAccountProtected.into());
    }
    let new_name = new_name.trim();
    if new_name.chars().count() > MAX_ACCOUNT_NAME_LEN || new_name.is_empty() {
        return Err(LedgerError::InvalidPosting(format!(
            "account name must be 1-{} characters",
            MAX_ACCOUNT_NAME_LEN
        ))
        .into());
    }
    if let Some(other) = find_account(conn, new_name, acct.account_type)? {
        if other.id != id {
            return Err(LedgerError::DuplicateAccountName(new_name.to_string()).into());
        }
    }
    conn.execute(
        "UPDATE accounts SET name=?1 WHERE id=?2",
        params![new_name, id],
    )?;
    Ok(())
}

pub fn set_account_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    let acct = get_account(conn, id)?;
    if acct.account_type == AccountType::System {
        return Err(LedgerError::SystemAccountProtected.into());
    }
    conn.execute(
        "UPDATE accounts SET active=?1 WHERE id=?2",
        params![active, id],
    )?;
    Ok(())
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<()> {
    let acct = get_account(conn, id)?;
    if acct.account_type == AccountType::System {
        return Err(LedgerError::SystemAccountProtected.into());
    }
    conn.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
    Ok(())
}

pub fn system_account(conn: &Connection) -> Result<Account> {
    let raw = conn
        .query_row(
            "SELECT id, name, type, active, show_on_dashboard, iban
             FROM accounts WHERE type='system'",
            [],
            account_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound("system account".to_string()))?;
    map_account(raw)
}

// ---------------------------------------------------------------------------
// Categories and budgets

pub fn create_category(conn: &Connection, name: &str) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories(name, active) VALUES (?1, 1)",
        params![name.trim()],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.trim().to_string(),
        active: true,
    })
}

pub fn get_or_create_category(conn: &Connection, name: &str) -> Result<Category> {
    let existing: Option<(i64, String, bool)> = conn
        .query_row(
            "SELECT id, name, active FROM categories WHERE name=?1",
            params![name.trim()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    if let Some((id, name, active)) = existing {
        return Ok(Category { id, name, active });
    }
    create_category(conn, name)
}

pub fn list_categories(conn: &Connection, active_only: bool) -> Result<Vec<Category>> {
    let sql = if active_only {
        "SELECT id, name, active FROM categories WHERE active=1 ORDER BY name"
    } else {
        "SELECT id, name, active FROM categories ORDER BY name"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            active: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn set_category_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    let n = conn.execute(
        "UPDATE categories SET active=?1 WHERE id=?2",
        params![active, id],
    )?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("category {}", id)).into());
    }
    Ok(())
}

/// Deleting a category leaves its splits uncategorized (schema SET NULL).
pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("category {}", id)).into());
    }
    Ok(())
}

pub fn set_budget(conn: &Connection, category_id: i64, month: &str, amount: Decimal) -> Result<()> {
    conn.execute(
        "INSERT INTO budgets(category_id, month, amount) VALUES (?1,?2,?3)
         ON CONFLICT(category_id, month) DO UPDATE SET amount=excluded.amount",
        params![category_id, month, amount.to_string()],
    )?;
    Ok(())
}

pub fn budget_for(conn: &Connection, category_id: i64, month: &str) -> Result<Option<Decimal>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT amount FROM budgets WHERE category_id=?1 AND month=?2",
            params![category_id, month],
            |r| r.get(0),
        )
        .optional()?;
    raw.map(|s| {
        s.parse::<Decimal>()
            .with_context(|| format!("Invalid budget amount '{}'", s))
    })
    .transpose()
}

pub fn list_budgets(conn: &Connection, month: Option<&str>) -> Result<Vec<Budget>> {
    let mut sql =
        String::from("SELECT id, category_id, month, amount FROM budgets");
    if month.is_some() {
        sql.push_str(" WHERE month=?1");
    }
    sql.push_str(" ORDER BY month DESC, category_id");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match month {
        Some(m) => stmt.query(params![m])?,
        None => stmt.query([])?,
    };
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let amount_s: String = r.get(3)?;
        out.push(Budget {
            id: r.get(0)?,
            category_id: r.get(1)?,
            month: r.get(2)?,
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid budget amount '{}'", amount_s))?,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Posting primitive

/// Derive the transaction type from the participants' account types.
pub fn derive_type(src: AccountType, dst: AccountType) -> Result<TransactionType> {
    use AccountType::*;
    match (src, dst) {
        (Personal, Personal) => Ok(TransactionType::Transfer),
        (Personal, Foreign) => Ok(TransactionType::Withdraw),
        (Foreign, Personal) => Ok(TransactionType::Deposit),
        (System, System) => Err(LedgerError::InvalidPosting(
            "both sides are the system account".to_string(),
        )
        .into()),
        (System, _) | (_, System) => Ok(TransactionType::System),
        (Foreign, Foreign) => Err(LedgerError::InvalidPosting(
            "a posting between two foreign accounts has no type".to_string(),
        )
        .into()),
    }
}

fn mirror_splits(header: &PostingHeader) -> Vec<SplitLine> {
    vec![
        SplitLine {
            account_id: header.src_id,
            opposing_id: header.dst_id,
            amount: -header.amount,
            date: header.date,
            category_id: header.category_id,
        },
        SplitLine {
            account_id: header.dst_id,
            opposing_id: header.src_id,
            amount: header.amount,
            date: header.date,
            category_id: header.category_id,
        },
    ]
}

/// Validate the header against account types and the split set against the
/// zero-sum and simple-case consistency rules. Returns the resolved type.
pub(crate) fn validate_posting(
    conn: &Connection,
    header: &PostingHeader,
    splits: &[SplitLine],
) -> Result<TransactionType> {
    let src = get_account(conn, header.src_id)?;
    let dst = get_account(conn, header.dst_id)?;

    if header.src_id == header.dst_id {
        return Err(LedgerError::InvalidPosting(
            "source and destination are the same account".to_string(),
        )
        .into());
    }

    let derived = derive_type(src.account_type, dst.account_type)?;
    if let Some(hint) = header.transaction_type {
        if hint != derived {
            return Err(LedgerError::InvalidPosting(format!(
                "type {} does not match participants ({} -> {})",
                hint.as_str(),
                src.account_type.as_str(),
                dst.account_type.as_str()
            ))
            .into());
        }
    }

    if derived == TransactionType::System {
        if header.amount < Decimal::ZERO {
            return Err(
                LedgerError::InvalidPosting("headline amount must not be negative".to_string())
                    .into(),
            );
        }
    } else if header.amount <= Decimal::ZERO {
        return Err(
            LedgerError::InvalidPosting("amount must be positive".to_string()).into(),
        );
    }

    let sum: Decimal = splits.iter().map(|s| s.amount).sum();
    if !sum.is_zero() {
        return Err(
            LedgerError::InvalidPosting(format!("splits sum to {}, not zero", sum)).into(),
        );
    }
    if splits.len() < 2 {
        return Err(
            LedgerError::InvalidPosting("a transaction needs at least two splits".to_string())
                .into(),
        );
    }

    if splits.len() == 2 {
        // Simple case: the two lines must mirror the header endpoints.
        let consistent = splits.iter().all(|s| {
            (s.account_id == header.src_id && s.opposing_id == header.dst_id)
                || (s.account_id == header.dst_id && s.opposing_id == header.src_id)
        }) && splits[0].account_id != splits[1].account_id;
        if !consistent {
            return Err(LedgerError::InvalidPosting(
                "splits do not reference the header accounts".to_string(),
            )
            .into());
        }
    } else {
        for line in splits {
            let acct = get_account(conn, line.account_id)?;
            let opp = get_account(conn, line.opposing_id)?;
            if derived != TransactionType::System
                && (acct.account_type == AccountType::System
                    || opp.account_type == AccountType::System)
            {
                return Err(LedgerError::InvalidPosting(
                    "the system account cannot participate here".to_string(),
                )
                .into());
            }
        }
    }

    Ok(derived)
}

fn insert_splits(
    conn: &Connection,
    transaction_id: i64,
    title: &str,
    splits: &[SplitLine],
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO splits(transaction_id, title, amount, date, account_id, opposing_id, category_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
    )?;
    for line in splits {
        stmt.execute(params![
            transaction_id,
            title,
            line.amount.to_string(),
            line.date.to_string(),
            line.account_id,
            line.opposing_id,
            line.category_id,
        ])?;
    }
    Ok(())
}

/// Insert the header row and its splits. The caller supplies the enclosing
/// database transaction.
pub(crate) fn write_posting(
    conn: &Connection,
    header: &PostingHeader,
    resolved: TransactionType,
    lines: &[SplitLine],
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(title, date, notes, type, amount, src_id, dst_id, recurrence_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            header.title,
            header.date.to_string(),
            header.notes,
            resolved.as_str(),
            header.amount.to_string(),
            header.src_id,
            header.dst_id,
            header.recurrence_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    insert_splits(conn, id, &header.title, lines)?;
    Ok(id)
}

/// Synthesize the two mirror lines for a header without explicit splits.
pub(crate) fn default_splits(header: &PostingHeader) -> Vec<SplitLine> {
    mirror_splits(header)
}

/// The single write primitive: persist a header and its splits atomically.
/// When `splits` is None two mirror lines are synthesized from the header.
pub fn post(
    conn: &mut Connection,
    header: &PostingHeader,
    splits: Option<Vec<SplitLine>>,
) -> Result<Transaction> {
    let lines = splits.unwrap_or_else(|| mirror_splits(header));
    let resolved = validate_posting(conn, header, &lines)?;

    let tx = conn.transaction()?;
    let id = write_posting(&tx, header, resolved, &lines)?;
    tx.commit()?;

    get_transaction(conn, id)
}

/// Same contract as `post`, replacing the stored header and splits. For the
/// simple two-line case the split ids are preserved by sign-matched upsert;
/// larger sets are replaced wholesale.
pub fn update_posting(
    conn: &mut Connection,
    id: i64,
    header: &PostingHeader,
    splits: Option<Vec<SplitLine>>,
) -> Result<Transaction> {
    let existing = get_transaction(conn, id)?;
    let lines = splits.unwrap_or_else(|| mirror_splits(header));
    let resolved = validate_posting(conn, header, &lines)?;

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE transactions SET title=?1, date=?2, notes=?3, type=?4, amount=?5,
                src_id=?6, dst_id=?7, recurrence_id=?8, last_modified=datetime('now')
         WHERE id=?9",
        params![
            header.title,
            header.date.to_string(),
            header.notes,
            resolved.as_str(),
            header.amount.to_string(),
            header.src_id,
            header.dst_id,
            header.recurrence_id,
            id,
        ],
    )?;

    if existing.splits.len() == 2 && lines.len() == 2 {
        for line in &lines {
            let old = existing
                .splits
                .iter()
                .find(|s| s.amount.is_sign_negative() == line.amount.is_sign_negative())
                .ok_or_else(|| {
                    LedgerError::InvalidPosting("existing splits are not a mirror pair".to_string())
                })?;
            tx.execute(
                "UPDATE splits SET title=?1, amount=?2, date=?3, account_id=?4, opposing_id=?5, category_id=?6
                 WHERE id=?7",
                params![
                    header.title,
                    line.amount.to_string(),
                    line.date.to_string(),
                    line.account_id,
                    line.opposing_id,
                    line.category_id,
                    old.id,
                ],
            )?;
        }
    } else {
        tx.execute("DELETE FROM splits WHERE transaction_id=?1", params![id])?;
        insert_splits(&tx, id, &header.title, &lines)?;
    }
    tx.commit()?;

    get_transaction(conn, id)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("transaction {}", id)).into());
    }
    Ok(())
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let raw = conn
        .query_row(
            "SELECT id, title, date, notes, type, amount, src_id, dst_id, recurrence_id
             FROM transactions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, i64>(6)?,
                    r.get::<_, i64>(7)?,
                    r.get::<_, Option<i64>>(8)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))?;

    let mut tx = Transaction {
        id: raw.0,
        title: raw.1,
        date: crate::utils::parse_date(&raw.2)?,
        notes: raw.3,
        transaction_type: TransactionType::parse(&raw.4)?,
        amount: raw
            .5
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on transaction {}", raw.5, raw.0))?,
        src_id: raw.6,
        dst_id: raw.7,
        recurrence_id: raw.8,
        splits: Vec::new(),
    };

    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, title, amount, date, account_id, opposing_id, category_id
         FROM splits WHERE transaction_id=?1 ORDER BY id",
    )?;
    let mut rows = stmt.query(params![id])?;
    while let Some(r) = rows.next()? {
        let amount_s: String = r.get(3)?;
        let date_s: String = r.get(4)?;
        tx.splits.push(Split {
            id: r.get(0)?,
            transaction_id: r.get(1)?,
            title: r.get(2)?,
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid split amount '{}'", amount_s))?,
            date: crate::utils::parse_date(&date_s)?,
            account_id: r.get(5)?,
            opposing_id: r.get(6)?,
            category_id: r.get(7)?,
        });
    }
    Ok(tx)
}

// ---------------------------------------------------------------------------
// User-facing posting families

pub fn transfer(
    conn: &mut Connection,
    src_id: i64,
    dst_id: i64,
    amount: Decimal,
    date: NaiveDate,
    title: &str,
    category_id: Option<i64>,
    notes: Option<String>,
) -> Result<Transaction> {
    post(
        conn,
        &PostingHeader {
            title: title.to_string(),
            date,
            src_id,
            dst_id,
            amount,
            transaction_type: Some(TransactionType::Transfer),
            category_id,
            recurrence_id: None,
            notes,
        },
        None,
    )
}

pub fn withdraw(
    conn: &mut Connection,
    src_id: i64,
    counterparty: &str,
    amount: Decimal,
    date: NaiveDate,
    title: &str,
    category_id: Option<i64>,
    notes: Option<String>,
) -> Result<Transaction> {
    let dst = get_or_create_foreign(conn, counterparty)?;
    post(
        conn,
        &PostingHeader {
            title: title.to_string(),
            date,
            src_id,
            dst_id: dst.id,
            amount,
            transaction_type: Some(TransactionType::Withdraw),
            category_id,
            recurrence_id: None,
            notes,
        },
        None,
    )
}

pub fn deposit(
    conn: &mut Connection,
    dst_id: i64,
    counterparty: &str,
    amount: Decimal,
    date: NaiveDate,
    title: &str,
    category_id: Option<i64>,
    notes: Option<String>,
) -> Result<Transaction> {
    let src = get_or_create_foreign(conn, counterparty)?;
    post(
        conn,
        &PostingHeader {
            title: title.to_string(),
            date,
            src_id: src.id,
            dst_id,
            amount,
            transaction_type: Some(TransactionType::Deposit),
            category_id,
            recurrence_id: None,
            notes,
        },
        None,
    )
}

fn system_delta_posting(
    conn: &mut Connection,
    account_id: i64,
    delta: Decimal,
    date: NaiveDate,
    title: &str,
) -> Result<Transaction> {
    let system = system_account(conn)?;
    let header = PostingHeader {
        title: title.to_string(),
        date,
        src_id: system.id,
        dst_id: account_id,
        amount: delta.abs(),
        transaction_type: Some(TransactionType::System),
        category_id: None,
        recurrence_id: None,
        notes: None,
    };
    let splits = vec![
        SplitLine {
            account_id: system.id,
            opposing_id: account_id,
            amount: -delta,
            date,
            category_id: None,
        },
        SplitLine {
            account_id,
            opposing_id: system.id,
            amount: delta,
            date,
            category_id: None,
        },
    ];
    post(conn, &header, Some(splits))
}

/// Adjust an account to a reported balance via a system correction posting.
pub fn reconcile(
    conn: &mut Connection,
    account_id: i64,
    observed: Decimal,
    date: NaiveDate,
    title: &str,
) -> Result<Transaction> {
    let current = crate::query::balance_on(conn, account_id, date)?;
    if observed == current {
        return Err(LedgerError::ReconcileNoop.into());
    }
    system_delta_posting(conn, account_id, observed - current, date, title)
}

/// Repeated applications accumulate rather than overwrite.
pub fn set_initial_balance(
    conn: &mut Connection,
    account_id: i64,
    amount: Decimal,
    date: NaiveDate,
) -> Result<Transaction> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidPosting("initial balance of zero".to_string()).into());
    }
    system_delta_posting(conn, account_id, amount, date, INITIAL_BALANCE_TITLE)
}

// ---------------------------------------------------------------------------
// Foreign-account merge

/// Collapse `targets` into `into`, rewriting every split and recurrence
/// reference, moving import hints across, then deleting the targets.
/// All participants must be foreign accounts. Returns |targets|.
pub fn merge_accounts(conn: &mut Connection, targets: &[i64], into: i64) -> Result<usize> {
    let into_acct = get_account(conn, into)?;
    if into_acct.account_type != AccountType::Foreign {
        return Err(LedgerError::MergeNotPermitted.into());
    }
    for &t in targets {
        let acct = get_account(conn, t)?;
        if acct.account_type != AccountType::Foreign || t == into {
            return Err(LedgerError::MergeNotPermitted.into());
        }
    }

    let tx = conn.transaction()?;
    for &t in targets {
        tx.execute(
            "UPDATE splits SET account_id=?1 WHERE account_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "UPDATE splits SET opposing_id=?1 WHERE opposing_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "UPDATE transactions SET src_id=?1 WHERE src_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "UPDATE transactions SET dst_id=?1 WHERE dst_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "UPDATE recurrences SET src_id=?1 WHERE src_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "UPDATE recurrences SET dst_id=?1 WHERE dst_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO account_ibans(account_id, iban)
             SELECT ?1, iban FROM account_ibans WHERE account_id=?2",
            params![into, t],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO account_names(account_id, name)
             SELECT ?1, name FROM account_names WHERE account_id=?2",
            params![into, t],
        )?;
        tx.execute("DELETE FROM accounts WHERE id=?1", params![t])?;
    }
    tx.commit()?;
    Ok(targets.len())
}
