// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::errors::LedgerError;
use crate::models::{
    Interval, RecurringTransaction, Transaction, TransactionType, WeekendHandling,
};
use crate::store::{self, PostingHeader};
use crate::utils::{days_in_month, month_end, parse_date, shift_months};

/// Bound on schedule walks; a month of daily steps is ~31, so this is far
/// beyond any legitimate schedule.
const MAX_ADVANCE_STEPS: u32 = 1024;

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Apply the recurrence delta `steps` times from its current date. The
/// multiplier scales the base delta, so MONTHLY x2 steps by two calendar
/// months, not by a fixed day count.
fn step_date(r: &RecurringTransaction, steps: u32) -> NaiveDate {
    let mult = r.multiplier.max(1) as i64 * steps as i64;
    match r.interval {
        Interval::Disabled => r.date,
        Interval::Daily => r.date + Duration::days(mult),
        Interval::Weekly => r.date + Duration::weeks(mult),
        Interval::Monthly => shift_months(r.date, mult as i32),
        Interval::Quarterly => shift_months(r.date, 3 * mult as i32),
        Interval::Biannually => shift_months(r.date, 6 * mult as i32),
        Interval::Annually => shift_months(r.date, 12 * mult as i32),
    }
}

/// Clamp the candidate to the usual day of month, walking down from the
/// preferred day until the date is valid for that month.
fn apply_usual_month_day(cand: NaiveDate, usual_month_day: u32) -> NaiveDate {
    if usual_month_day == 0 {
        return cand;
    }
    let day = usual_month_day.min(days_in_month(cand.year(), cand.month()));
    NaiveDate::from_ymd_opt(cand.year(), cand.month(), day).unwrap_or(cand)
}

/// Next due date for a recurrence. Pure; nothing is persisted. DISABLED
/// schedules never move. DAILY and WEEKLY skip the month-day and weekend
/// rules entirely.
pub fn advance(r: &RecurringTransaction) -> NaiveDate {
    if r.interval == Interval::Disabled {
        return r.date;
    }
    let mut steps = 1u32;
    loop {
        let mut cand = step_date(r, steps);
        if matches!(r.interval, Interval::Daily | Interval::Weekly) {
            return cand;
        }
        cand = apply_usual_month_day(cand, r.usual_month_day);
        if !is_weekend(cand) {
            return cand;
        }
        match r.weekend_handling {
            WeekendHandling::SameDay => return cand,
            WeekendHandling::NextWeekday => {
                let shift = if cand.weekday() == Weekday::Sat { 2 } else { 1 };
                return cand + Duration::days(shift);
            }
            WeekendHandling::PreviousWeekday => {
                let shift = if cand.weekday() == Weekday::Sat { 1 } else { 2 };
                return cand - Duration::days(shift);
            }
            WeekendHandling::Skip => {
                steps += 1;
                if steps > MAX_ADVANCE_STEPS {
                    return cand;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence

fn map_recurrence(r: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, i64, i64, String, u32, String, u32, String, Option<i64>)> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
        r.get(9)?,
        r.get(10)?,
        r.get(11)?,
    ))
}

fn build_recurrence(
    raw: (i64, String, String, String, i64, i64, String, u32, String, u32, String, Option<i64>),
) -> Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: raw.0,
        title: raw.1,
        amount: crate::utils::parse_decimal(&raw.2)?,
        date: parse_date(&raw.3)?,
        src_id: raw.4,
        dst_id: raw.5,
        interval: Interval::parse(&raw.6)?,
        multiplier: raw.7,
        weekend_handling: WeekendHandling::parse(&raw.8)?,
        usual_month_day: raw.9,
        transaction_type: TransactionType::parse(&raw.10)?,
        category_id: raw.11,
    })
}

const SELECT_RECURRENCE: &str = "SELECT id, title, amount, date, src_id, dst_id, interval, \
     multiplier, weekend_handling, usual_month_day, type, category_id FROM recurrences";

pub fn get_recurrence(conn: &Connection, id: i64) -> Result<RecurringTransaction> {
    let raw = conn
        .query_row(
            &format!("{} WHERE id=?1", SELECT_RECURRENCE),
            params![id],
            map_recurrence,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("recurrence {}", id)))?;
    build_recurrence(raw)
}

pub fn create_recurrence(conn: &Connection, r: &RecurringTransaction) -> Result<RecurringTransaction> {
    if r.multiplier == 0 {
        return Err(LedgerError::InvalidPosting("multiplier must be positive".to_string()).into());
    }
    if r.usual_month_day > 31 {
        return Err(
            LedgerError::InvalidPosting("usual month day must be 0-31".to_string()).into(),
        );
    }
    conn.execute(
        "INSERT INTO recurrences(title, amount, date, src_id, dst_id, interval, multiplier,
                                 weekend_handling, usual_month_day, type, category_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            r.title,
            r.amount.to_string(),
            r.date.to_string(),
            r.src_id,
            r.dst_id,
            r.interval.as_str(),
            r.multiplier,
            r.weekend_handling.as_str(),
            r.usual_month_day,
            r.transaction_type.as_str(),
            r.category_id,
        ],
    )?;
    get_recurrence(conn, conn.last_insert_rowid())
}

pub fn update_recurrence(conn: &Connection, r: &RecurringTransaction) -> Result<()> {
    if r.multiplier == 0 {
        return Err(LedgerError::InvalidPosting("multiplier must be positive".to_string()).into());
    }
    let n = conn.execute(
        "UPDATE recurrences SET title=?1, amount=?2, date=?3, src_id=?4, dst_id=?5,
                interval=?6, multiplier=?7, weekend_handling=?8, usual_month_day=?9,
                type=?10, category_id=?11
         WHERE id=?12",
        params![
            r.title,
            r.amount.to_string(),
            r.date.to_string(),
            r.src_id,
            r.dst_id,
            r.interval.as_str(),
            r.multiplier,
            r.weekend_handling.as_str(),
            r.usual_month_day,
            r.transaction_type.as_str(),
            r.category_id,
            r.id,
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("recurrence {}", r.id)).into());
    }
    Ok(())
}

pub fn delete_recurrence(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM recurrences WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("recurrence {}", id)).into());
    }
    Ok(())
}

pub fn list_recurrences(conn: &Connection) -> Result<Vec<RecurringTransaction>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY date, id", SELECT_RECURRENCE))?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(build_recurrence(map_recurrence(r)?)?);
    }
    Ok(out)
}

/// Enabled recurrences due on or before the end of `today`'s month, date
/// ascending.
pub fn due_in_month(conn: &Connection, today: NaiveDate) -> Result<Vec<RecurringTransaction>> {
    let cutoff = month_end(today);
    let mut stmt = conn.prepare(&format!(
        "{} WHERE interval != 'disabled' AND date <= ?1 ORDER BY date, id",
        SELECT_RECURRENCE
    ))?;
    let mut rows = stmt.query(params![cutoff.to_string()])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(build_recurrence(map_recurrence(r)?)?);
    }
    Ok(out)
}

/// Signed sum of the recurrence obligations left in `today`'s month:
/// -amount per withdraw occurrence, +amount per deposit, transfers count
/// zero. Walks each schedule in memory; nothing is persisted.
pub fn outstanding_sum(conn: &Connection, today: NaiveDate) -> Result<Decimal> {
    let cutoff = month_end(today);
    let mut total = Decimal::ZERO;
    for r in due_in_month(conn, today)? {
        let sign = match r.transaction_type {
            TransactionType::Withdraw => Decimal::NEGATIVE_ONE,
            TransactionType::Deposit => Decimal::ONE,
            _ => continue,
        };
        let mut probe = r.clone();
        let mut guard = 0u32;
        while probe.date <= cutoff && guard < MAX_ADVANCE_STEPS {
            total += sign * probe.amount;
            probe.date = advance(&probe);
            guard += 1;
        }
    }
    Ok(total)
}

/// Persist one advance of the next-due date without generating a
/// transaction. Calling skip on a DISABLED recurrence is a no-op.
pub fn skip(conn: &Connection, id: i64) -> Result<NaiveDate> {
    let r = get_recurrence(conn, id)?;
    let next = advance(&r);
    conn.execute(
        "UPDATE recurrences SET date=?1 WHERE id=?2",
        params![next.to_string(), id],
    )?;
    Ok(next)
}

/// Post a transaction from the recurrence template and roll the next-due
/// date, atomically. The posting is tagged with the originating recurrence.
pub fn generate(conn: &mut Connection, id: i64, date: Option<NaiveDate>) -> Result<Transaction> {
    let r = get_recurrence(conn, id)?;
    let header = PostingHeader {
        title: r.title.clone(),
        date: date.unwrap_or(r.date),
        src_id: r.src_id,
        dst_id: r.dst_id,
        amount: r.amount,
        transaction_type: Some(r.transaction_type),
        category_id: r.category_id,
        recurrence_id: Some(r.id),
        notes: None,
    };
    let lines = store::default_splits(&header);
    let resolved = store::validate_posting(conn, &header, &lines)?;
    let next = advance(&r);

    let tx = conn.transaction()?;
    let posted_id = store::write_posting(&tx, &header, resolved, &lines)?;
    tx.execute(
        "UPDATE recurrences SET date=?1 WHERE id=?2",
        params![next.to_string(), id],
    )?;
    tx.commit()?;

    store::get_transaction(conn, posted_id)
}
