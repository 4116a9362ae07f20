// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Personal,
    Foreign,
    System,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Personal => "personal",
            AccountType::Foreign => "foreign",
            AccountType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Result<AccountType> {
        match s {
            "personal" => Ok(AccountType::Personal),
            "foreign" => Ok(AccountType::Foreign),
            "system" => Ok(AccountType::System),
            other => Err(anyhow!("Unknown account type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
    System,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
            TransactionType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Result<TransactionType> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            "transfer" => Ok(TransactionType::Transfer),
            "system" => Ok(TransactionType::System),
            other => Err(anyhow!("Unknown transaction type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub active: bool,
    pub show_on_dashboard: bool,
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

/// Journal header. The signed posting lines live in `splits`; the header
/// carries the non-negative headline amount and the src/dst endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub src_id: i64,
    pub dst_id: i64,
    pub recurrence_id: Option<i64>,
    pub splits: Vec<Split>,
}

/// One posting line. `date` is the split's own value date and may differ
/// from the header date (bank book date vs. transaction date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub id: i64,
    pub transaction_id: i64,
    pub title: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub account_id: i64,
    pub opposing_id: i64,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category_id: i64,
    pub month: String, // YYYY-MM
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Disabled,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Biannually,
    Annually,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Disabled => "disabled",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
            Interval::Quarterly => "quarterly",
            Interval::Biannually => "biannually",
            Interval::Annually => "annually",
        }
    }

    pub fn parse(s: &str) -> Result<Interval> {
        match s {
            "disabled" => Ok(Interval::Disabled),
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            "quarterly" => Ok(Interval::Quarterly),
            "biannually" => Ok(Interval::Biannually),
            "annually" => Ok(Interval::Annually),
            other => Err(anyhow!("Unknown interval '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekendHandling {
    SameDay,
    PreviousWeekday,
    NextWeekday,
    Skip,
}

impl WeekendHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekendHandling::SameDay => "same_day",
            WeekendHandling::PreviousWeekday => "previous_weekday",
            WeekendHandling::NextWeekday => "next_weekday",
            WeekendHandling::Skip => "skip",
        }
    }

    pub fn parse(s: &str) -> Result<WeekendHandling> {
        match s {
            "same_day" => Ok(WeekendHandling::SameDay),
            "previous_weekday" => Ok(WeekendHandling::PreviousWeekday),
            "next_weekday" => Ok(WeekendHandling::NextWeekday),
            "skip" => Ok(WeekendHandling::Skip),
            other => Err(anyhow!("Unknown weekend handling '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub title: String,
    pub amount: Decimal,
    /// Next due date. Does not advance while `interval` is Disabled.
    pub date: NaiveDate,
    pub src_id: i64,
    pub dst_id: i64,
    pub interval: Interval,
    pub multiplier: u32,
    pub weekend_handling: WeekendHandling,
    /// 1-31; 0 means "use the day of the next-due date".
    pub usual_month_day: u32,
    pub transaction_type: TransactionType,
    pub category_id: Option<i64>,
}
