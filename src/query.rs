// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::LedgerError;
use crate::utils::{month_end, month_start, parse_date, shift_months};

/// Balance of an account on a date: the sum of its split amounts with
/// value date on or before that date, rounded to two decimals.
pub fn balance_on(conn: &Connection, account_id: i64, date: NaiveDate) -> Result<Decimal> {
    let mut stmt =
        conn.prepare_cached("SELECT amount FROM splits WHERE account_id=?1 AND date<=?2")?;
    let mut rows = stmt.query(params![account_id, date.to_string()])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid split amount '{}'", s))?;
    }
    Ok(total.round_dp(2))
}

/// Stepped balance series over [dstart, dend]. Step width is at least one
/// day; the series always ends with a point at dend carrying the full
/// range's balance.
pub fn data_points(
    conn: &Connection,
    account_id: i64,
    dstart: NaiveDate,
    dend: NaiveDate,
    steps: u32,
) -> Result<Vec<(NaiveDate, Decimal)>> {
    if dend < dstart {
        return Err(LedgerError::InvalidDate(format!("{} is after {}", dstart, dend)).into());
    }
    let span = (dend - dstart).num_days();
    let step = ((span / steps.max(1) as i64).max(1)) as i64;

    let mut stmt = conn.prepare(
        "SELECT date, amount FROM splits WHERE account_id=?1 AND date>=?2 AND date<=?3
         ORDER BY date, id",
    )?;
    let mut rows = stmt.query(params![
        account_id,
        dstart.to_string(),
        dend.to_string()
    ])?;
    let mut pending: Vec<(NaiveDate, Decimal)> = Vec::new();
    while let Some(r) = rows.next()? {
        let d: String = r.get(0)?;
        let a: String = r.get(1)?;
        pending.push((
            parse_date(&d)?,
            a.parse::<Decimal>()
                .with_context(|| format!("Invalid split amount '{}'", a))?,
        ));
    }

    let mut balance = balance_on(conn, account_id, dstart - Duration::days(1))?;
    let mut points = Vec::new();
    let mut iter = pending.into_iter().peekable();
    let mut boundary = dstart;
    while boundary < dend {
        while let Some((d, _)) = iter.peek() {
            if *d <= boundary {
                balance += iter.next().unwrap().1;
            } else {
                break;
            }
        }
        points.push((boundary, balance.round_dp(2)));
        boundary += Duration::days(step);
    }
    // Leftover splits after the last step boundary still belong to the range.
    for (_, amount) in iter {
        balance += amount;
    }
    points.push((dend, balance.round_dp(2)));
    Ok(points)
}

/// Combined balance series over every personal account flagged for the
/// dashboard, summed pointwise.
pub fn dashboard_data_points(
    conn: &Connection,
    dstart: NaiveDate,
    dend: NaiveDate,
    steps: u32,
) -> Result<Vec<(NaiveDate, Decimal)>> {
    let mut stmt = conn
        .prepare("SELECT id FROM accounts WHERE type='personal' AND show_on_dashboard=1")?;
    let ids: Vec<i64> = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut combined: Vec<(NaiveDate, Decimal)> = Vec::new();
    for id in ids {
        let points = data_points(conn, id, dstart, dend, steps)?;
        if combined.is_empty() {
            combined = points;
        } else {
            for (total, point) in combined.iter_mut().zip(points) {
                total.1 += point.1;
            }
        }
    }
    Ok(combined)
}

fn sum_where(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Decimal> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter().copied()))?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid split amount '{}'", s))?;
    }
    Ok(total)
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub income: Decimal,
    pub expenses: Decimal,
    pub difference: Decimal,
    pub balance: Decimal,
    pub previous_income: Decimal,
    pub previous_expenses: Decimal,
    pub previous_difference: Decimal,
    pub upcoming: Decimal,
    pub outstanding: Decimal,
    pub expected_balance: Decimal,
}

const PERSONAL_FOREIGN_RANGE: &str =
    "SELECT s.amount FROM splits s
     JOIN accounts a ON a.id = s.account_id
     JOIN accounts o ON o.id = s.opposing_id
     WHERE a.type='personal' AND o.type='foreign'
       AND s.date >= ?1 AND s.date <= ?2";

fn income_expenses(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Decimal, Decimal)> {
    let income = sum_where(
        conn,
        &format!("{} AND CAST(s.amount AS REAL) > 0", PERSONAL_FOREIGN_RANGE),
        &[&from.to_string(), &to.to_string()],
    )?;
    let expenses = sum_where(
        conn,
        &format!("{} AND CAST(s.amount AS REAL) < 0", PERSONAL_FOREIGN_RANGE),
        &[&from.to_string(), &to.to_string()],
    )?;
    Ok((income.abs(), expenses.abs()))
}

/// Aggregates for the personal-account overview: this month's flows, the
/// previous month's, and the projected end-of-month position including
/// recurring obligations.
pub fn dashboard(conn: &Connection, today: NaiveDate) -> Result<DashboardSummary> {
    let (income, expenses) = income_expenses(conn, month_start(today), today)?;

    let prev = shift_months(month_start(today), -1);
    let (previous_income, previous_expenses) =
        income_expenses(conn, prev, month_end(prev))?;

    let balance = sum_where(
        conn,
        "SELECT s.amount FROM splits s JOIN accounts a ON a.id = s.account_id
         WHERE a.type='personal' AND s.date <= ?1",
        &[&today.to_string()],
    )?
    .round_dp(2);

    let upcoming = sum_where(
        conn,
        "SELECT s.amount FROM splits s JOIN accounts a ON a.id = s.account_id
         WHERE a.type='personal' AND s.date > ?1",
        &[&today.to_string()],
    )?;

    let outstanding = upcoming + crate::recurrence::outstanding_sum(conn, today)?;

    Ok(DashboardSummary {
        income,
        expenses,
        difference: income - expenses,
        balance,
        previous_income,
        previous_expenses,
        previous_difference: previous_income - previous_expenses,
        upcoming,
        outstanding,
        expected_balance: balance + outstanding,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitRow {
    pub split_id: i64,
    pub transaction_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub account: String,
    pub opposing: String,
    pub category: Option<String>,
    pub transaction_type: String,
}

/// Most recent personal splits, newest first, with each transfer shown
/// once (the positive mirror side is excluded).
pub fn last_transactions(conn: &Connection, limit: usize) -> Result<Vec<SplitRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.transaction_id, s.title, s.date, s.amount, a.name, o.name, c.name, t.type
         FROM splits s
         JOIN transactions t ON t.id = s.transaction_id
         JOIN accounts a ON a.id = s.account_id
         JOIN accounts o ON o.id = s.opposing_id
         LEFT JOIN categories c ON c.id = s.category_id
         WHERE a.type='personal'
           AND NOT (t.type='transfer' AND CAST(s.amount AS REAL) > 0)
         ORDER BY s.date DESC, s.id DESC
         LIMIT ?1",
    )?;
    let mut rows = stmt.query(params![limit as i64])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let date_s: String = r.get(3)?;
        let amount_s: String = r.get(4)?;
        out.push(SplitRow {
            split_id: r.get(0)?,
            transaction_id: r.get(1)?,
            title: r.get(2)?,
            date: parse_date(&date_s)?,
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid split amount '{}'", amount_s))?,
            account: r.get(5)?,
            opposing: r.get(6)?,
            category: r.get(7)?,
            transaction_type: r.get(8)?,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySpend {
    pub category_id: i64,
    pub category: String,
    pub spent: Decimal,
    pub income: Decimal,
}

/// Per active category: personal spending (absolute) and income in a month.
pub fn category_spending(conn: &Connection, month: &str) -> Result<Vec<CategorySpend>> {
    let (from, to) = crate::utils::month_bounds(month)?;
    let mut out = Vec::new();
    for cat in crate::store::list_categories(conn, true)? {
        let (spent, income) = category_month_sums(conn, cat.id, from, to)?;
        out.push(CategorySpend {
            category_id: cat.id,
            category: cat.name,
            spent,
            income,
        });
    }
    Ok(out)
}

fn category_month_sums(
    conn: &Connection,
    category_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Decimal, Decimal)> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.amount FROM splits s JOIN accounts a ON a.id = s.account_id
         WHERE a.type='personal' AND s.category_id=?1 AND s.date >= ?2 AND s.date <= ?3",
    )?;
    let mut rows = stmt.query(params![category_id, from.to_string(), to.to_string()])?;
    let mut spent = Decimal::ZERO;
    let mut income = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        let amount = s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid split amount '{}'", s))?;
        if amount < Decimal::ZERO {
            spent += -amount;
        } else {
            income += amount;
        }
    }
    Ok((spent, income))
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryHistory {
    pub spent: Decimal,
    pub last_month: Decimal,
    /// Mean spending over the two months preceding `month`.
    pub two_month_average: Decimal,
}

pub fn category_history(conn: &Connection, category_id: i64, month: &str) -> Result<CategoryHistory> {
    let (from, to) = crate::utils::month_bounds(month)?;
    let (spent, _) = category_month_sums(conn, category_id, from, to)?;
    let m1 = shift_months(from, -1);
    let (last_month, _) = category_month_sums(conn, category_id, m1, month_end(m1))?;
    let m2 = shift_months(from, -2);
    let (two_back, _) = category_month_sums(conn, category_id, m2, month_end(m2))?;
    Ok(CategoryHistory {
        spent,
        last_month,
        two_month_average: ((last_month + two_back) / Decimal::TWO).round_dp(2),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetRow {
    pub category_id: i64,
    pub category: String,
    pub budget: Decimal,
    pub spent: Decimal,
    pub left: Decimal,
}

/// Budget page: each active category joined with its budget for the month;
/// `left` is the budgeted amount minus absolute spending.
pub fn budget_overview(conn: &Connection, month: &str) -> Result<Vec<BudgetRow>> {
    let (from, to) = crate::utils::month_bounds(month)?;
    let mut out = Vec::new();
    for cat in crate::store::list_categories(conn, true)? {
        let budget = crate::store::budget_for(conn, cat.id, month)?.unwrap_or(Decimal::ZERO);
        let (spent, _) = category_month_sums(conn, cat.id, from, to)?;
        out.push(BudgetRow {
            category_id: cat.id,
            category: cat.name,
            budget,
            spent,
            left: budget - spent,
        });
    }
    Ok(out)
}
