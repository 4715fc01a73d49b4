use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

mod command;
mod dispatch;
mod error;
mod reply;

pub use command::{parse, tokenize, Command};
pub use dispatch::execute;
pub use error::{CommandError, StoreError, Usage};
pub use reply::{render, Reply, HELP_TEXT};

/// Price of a location: one flat amount, or separate weekday/holiday amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostEntry {
    Flat(i64),
    Paired { weekday: i64, holiday: i64 },
}

impl CostEntry {
    pub fn for_day(&self, holiday: bool) -> i64 {
        match *self {
            CostEntry::Flat(cost) => cost,
            CostEntry::Paired { holiday: h, .. } if holiday => h,
            CostEntry::Paired { weekday, .. } => weekday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    /// `MM/DD` as the user typed it, without any weekday annotation.
    pub date: String,
    pub name: String,
    pub location: String,
    pub cost: i64,
}

/// Persistence behind the command dispatcher.
///
/// Each method is one atomic store operation. Implementations convert their
/// native errors into [`StoreError`] at this boundary.
pub trait Ledger {
    fn upsert_cost(&mut self, location: &str, cost: CostEntry) -> Result<(), StoreError>;
    fn delete_cost(&mut self, location: &str) -> Result<usize, StoreError>;
    /// All locations, sorted by name.
    fn list_costs(&self) -> Result<Vec<(String, CostEntry)>, StoreError>;
    fn cost_of(&self, location: &str) -> Result<Option<CostEntry>, StoreError>;

    fn upsert_name(&mut self, name: &str) -> Result<(), StoreError>;
    fn delete_name(&mut self, name: &str) -> Result<usize, StoreError>;
    /// All names, sorted.
    fn list_names(&self) -> Result<Vec<String>, StoreError>;

    fn add_record(&mut self, record: &ExpenseRecord) -> Result<(), StoreError>;
    fn delete_records(&mut self, date: &str, name: &str) -> Result<usize, StoreError>;
    fn sum_cost_by_name(&self, name: &str) -> Result<i64, StoreError>;
    fn sum_cost_by_name_and_month(&self, name: &str, month: u32) -> Result<i64, StoreError>;
    fn sum_cost_by_month_grouped_by_name(
        &self,
        month: u32,
    ) -> Result<BTreeMap<String, i64>, StoreError>;
}

/// Drops a trailing `(...)` annotation the chat UI appends to picked dates.
pub fn strip_weekday_note(date: &str) -> &str {
    date.split('(').next().unwrap_or(date)
}

/// Month of a stored `MM/DD` date, read from the segment before the first `/`.
pub fn month_of(date: &str) -> Option<u32> {
    let (month, _) = date.split_once('/')?;
    month.trim().parse().ok()
}

pub fn resolve_record_date(date: &str, year: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{date}/{year}"), "%m/%d/%Y").ok()
}

pub fn is_holiday(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// A month later than the current one refers to last year, so a December
/// summary asked for in January lands on the right year.
pub fn resolve_stat_year(month: u32, today: NaiveDate) -> i32 {
    if month > today.month() {
        today.year() - 1
    } else {
        today.year()
    }
}
