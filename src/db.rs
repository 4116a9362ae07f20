// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerclip", "ledgerclip"));

/// Name of the process-managed account used for reconciliations and
/// initial balances. Exactly one account of type system exists.
pub const SYSTEM_ACCOUNT_NAME: &str = "System";

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('personal','foreign','system')),
        active INTEGER NOT NULL DEFAULT 1,
        show_on_dashboard INTEGER NOT NULL DEFAULT 0,
        iban TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(name, type)
    );

    -- Import hints: IBANs and counterparty names observed on prior imports.
    CREATE TABLE IF NOT EXISTS account_ibans(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        iban TEXT NOT NULL,
        UNIQUE(account_id, iban),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );
    CREATE TABLE IF NOT EXISTS account_names(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        UNIQUE(account_id, name),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS recurrences(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        src_id INTEGER NOT NULL,
        dst_id INTEGER NOT NULL,
        interval TEXT NOT NULL DEFAULT 'disabled',
        multiplier INTEGER NOT NULL DEFAULT 1,
        weekend_handling TEXT NOT NULL DEFAULT 'same_day',
        usual_month_day INTEGER NOT NULL DEFAULT 0,
        type TEXT NOT NULL,
        category_id INTEGER,
        FOREIGN KEY(src_id) REFERENCES accounts(id),
        FOREIGN KEY(dst_id) REFERENCES accounts(id),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        date TEXT NOT NULL,
        notes TEXT,
        type TEXT NOT NULL CHECK(type IN ('deposit','withdraw','transfer','system')),
        amount TEXT NOT NULL,
        src_id INTEGER NOT NULL,
        dst_id INTEGER NOT NULL,
        recurrence_id INTEGER,
        last_modified TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(src_id) REFERENCES accounts(id),
        FOREIGN KEY(dst_id) REFERENCES accounts(id),
        FOREIGN KEY(recurrence_id) REFERENCES recurrences(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

    CREATE TABLE IF NOT EXISTS splits(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        account_id INTEGER NOT NULL,
        opposing_id INTEGER NOT NULL,
        category_id INTEGER,
        FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
        FOREIGN KEY(account_id) REFERENCES accounts(id),
        FOREIGN KEY(opposing_id) REFERENCES accounts(id),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_splits_account_date ON splits(account_id, date);
    CREATE INDEX IF NOT EXISTS idx_splits_transaction ON splits(transaction_id);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        month TEXT NOT NULL,
        amount TEXT NOT NULL,
        UNIQUE(category_id, month),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
    );
    "#,
    )?;

    conn.execute(
        "INSERT INTO accounts(name, type, active, show_on_dashboard)
         SELECT ?1, 'system', 1, 0
         WHERE NOT EXISTS (SELECT 1 FROM accounts WHERE type='system')",
        [SYSTEM_ACCOUNT_NAME],
    )?;
    Ok(())
}
