use crate::command::Command;
use crate::error::{CommandError, StoreError};
use crate::reply::Reply;
use crate::{is_holiday, ExpenseRecord, Ledger};

pub fn execute<L: Ledger + ?Sized>(
    ledger: &mut L,
    command: Command,
) -> Result<Reply, CommandError> {
    match command {
        Command::Help => Ok(Reply::Help),
        Command::DeleteLocation { location } => {
            let deleted = ledger
                .delete_cost(&location)
                .map_err(CommandError::store("刪除地點"))?;
            Ok(Reply::LocationDeleted { location, deleted })
        }
        Command::DeleteName { name } => {
            let deleted = ledger
                .delete_name(&name)
                .map_err(CommandError::store("刪除人名"))?;
            Ok(Reply::NameDeleted { name, deleted })
        }
        Command::DeleteRecords { date, name } => {
            let deleted = ledger
                .delete_records(&date, &name)
                .map_err(CommandError::store("刪除紀錄"))?;
            Ok(Reply::RecordsDeleted {
                date,
                name,
                deleted,
            })
        }
        Command::ListLocations => ledger
            .list_costs()
            .map(Reply::Locations)
            .map_err(CommandError::store("讀取地點清單")),
        Command::ListNames => ledger
            .list_names()
            .map(Reply::Names)
            .map_err(CommandError::store("讀取人名清單")),
        Command::AddLocation { location, cost } => {
            ledger
                .upsert_cost(&location, cost)
                .map_err(CommandError::store("新增地點"))?;
            Ok(Reply::LocationSaved { location, cost })
        }
        Command::AddName { name } => {
            ledger
                .upsert_name(&name)
                .map_err(CommandError::store("新增人名"))?;
            Ok(Reply::NameAdded(name))
        }
        Command::StatName { name } => {
            let total = ledger
                .sum_cost_by_name(&name)
                .map_err(CommandError::store("統計"))?;
            Ok(Reply::NameTotal { name, total })
        }
        Command::StatMonth { year, month } => {
            let totals = ledger
                .sum_cost_by_month_grouped_by_name(month)
                .map_err(CommandError::store("統計"))?;
            let sum = totals
                .values()
                .try_fold(0i64, |acc, total| acc.checked_add(*total))
                .ok_or_else(|| CommandError::Store {
                    op: "統計",
                    source: StoreError("integer overflow".to_string()),
                })?;
            Ok(Reply::MonthTotals {
                year,
                month,
                totals,
                sum,
            })
        }
        Command::StatNameMonth { name, month } => {
            let total = ledger
                .sum_cost_by_name_and_month(&name, month)
                .map_err(CommandError::store("統計"))?;
            Ok(Reply::NameMonthTotal { name, month, total })
        }
        Command::Record {
            date,
            day,
            name,
            location,
            cost,
        } => {
            let cost = match cost {
                Some(cost) => cost,
                None => ledger
                    .cost_of(&location)
                    .map_err(CommandError::store("紀錄"))?
                    .map(|entry| entry.for_day(is_holiday(day)))
                    .unwrap_or(0),
            };
            let record = ExpenseRecord {
                date,
                name,
                location,
                cost,
            };
            ledger
                .add_record(&record)
                .map_err(CommandError::store("紀錄"))?;
            Ok(Reply::Recorded(record))
        }
    }
}
