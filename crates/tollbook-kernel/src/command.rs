use chrono::{Datelike, NaiveDate};

use crate::error::{CommandError, Usage};
use crate::{resolve_record_date, resolve_stat_year, strip_weekday_note, CostEntry};

const HELP: [&str; 2] = ["說明書", "說明"];
const DELETE: &str = "刪除";
const LIST: &str = "清單";
const ADD: &str = "新增";
const ADD_NAME: &str = "新增人名";
const STAT: &str = "統計";

const LOCATION: &str = "地點";
const NAME: &str = "人名";
const RECORD: &str = "紀錄";
const WEEKDAY: &str = "平日";
const HOLIDAY: &str = "假日";
const MONTH_SUFFIX: &str = "月";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    DeleteLocation {
        location: String,
    },
    DeleteName {
        name: String,
    },
    DeleteRecords {
        date: String,
        name: String,
    },
    ListLocations,
    ListNames,
    AddLocation {
        location: String,
        cost: CostEntry,
    },
    AddName {
        name: String,
    },
    StatName {
        name: String,
    },
    StatMonth {
        year: i32,
        month: u32,
    },
    StatNameMonth {
        name: String,
        month: u32,
    },
    Record {
        date: String,
        day: NaiveDate,
        name: String,
        location: String,
        /// Explicit amount; `None` means look the location up.
        cost: Option<i64>,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::DeleteLocation { .. } => "delete_location",
            Command::DeleteName { .. } => "delete_name",
            Command::DeleteRecords { .. } => "delete_records",
            Command::ListLocations => "list_locations",
            Command::ListNames => "list_names",
            Command::AddLocation { .. } => "add_location",
            Command::AddName { .. } => "add_name",
            Command::StatName { .. } => "stat_name",
            Command::StatMonth { .. } => "stat_month",
            Command::StatNameMonth { .. } => "stat_name_month",
            Command::Record { .. } => "record",
        }
    }
}

/// Splits on single spaces after trimming, so doubled spaces yield empty tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.trim().split(' ').collect()
}

/// Classifies one message. Verbs are tried in a fixed order: help, delete,
/// list, add-location, add-name, stat, then a bare record.
pub fn parse(text: &str, today: NaiveDate) -> Result<Command, CommandError> {
    let tokens = tokenize(text);
    match tokens[0] {
        verb if HELP.contains(&verb) => Ok(Command::Help),
        DELETE => parse_delete(&tokens[1..]),
        LIST => parse_list(&tokens[1..]),
        ADD => parse_add(&tokens[1..]),
        ADD_NAME => match tokens[1..] {
            [name] => Ok(Command::AddName {
                name: name.to_string(),
            }),
            _ => Err(CommandError::Usage(Usage::AddName)),
        },
        STAT => parse_stat(&tokens[1..], today),
        _ if tokens.len() >= 3 => parse_record(&tokens, today),
        _ => Err(CommandError::Unrecognized),
    }
}

fn parse_delete(args: &[&str]) -> Result<Command, CommandError> {
    let Some((&kind, rest)) = args.split_first() else {
        return Err(CommandError::Usage(Usage::Delete));
    };
    match kind {
        LOCATION => match rest {
            [location] => Ok(Command::DeleteLocation {
                location: location.to_string(),
            }),
            _ => Err(CommandError::Usage(Usage::DeleteLocation)),
        },
        NAME => match rest {
            [name] => Ok(Command::DeleteName {
                name: name.to_string(),
            }),
            _ => Err(CommandError::Usage(Usage::DeleteName)),
        },
        RECORD => match rest {
            [date, name] => Ok(Command::DeleteRecords {
                date: strip_weekday_note(date).to_string(),
                name: name.to_string(),
            }),
            _ => Err(CommandError::Usage(Usage::DeleteRecord)),
        },
        _ => Err(CommandError::Usage(Usage::Delete)),
    }
}

fn parse_list(args: &[&str]) -> Result<Command, CommandError> {
    match args {
        [LOCATION] => Ok(Command::ListLocations),
        [NAME] => Ok(Command::ListNames),
        _ => Err(CommandError::Usage(Usage::List)),
    }
}

fn parse_add(args: &[&str]) -> Result<Command, CommandError> {
    match *args {
        [location, cost] => {
            let cost = parse_amount(cost).ok_or(CommandError::CostNotNumeric)?;
            Ok(Command::AddLocation {
                location: location.to_string(),
                cost: CostEntry::Flat(cost),
            })
        }
        [location, WEEKDAY, weekday, HOLIDAY, holiday] => {
            let (Some(weekday), Some(holiday)) = (parse_amount(weekday), parse_amount(holiday))
            else {
                return Err(CommandError::PairedCostNotNumeric);
            };
            Ok(Command::AddLocation {
                location: location.to_string(),
                cost: CostEntry::Paired { weekday, holiday },
            })
        }
        _ => Err(CommandError::Usage(Usage::Add)),
    }
}

fn parse_stat(args: &[&str], today: NaiveDate) -> Result<Command, CommandError> {
    match *args {
        [target] if target.ends_with(MONTH_SUFFIX) => {
            let month = parse_month(target)?;
            Ok(Command::StatMonth {
                year: resolve_stat_year(month, today),
                month,
            })
        }
        [name] => Ok(Command::StatName {
            name: name.to_string(),
        }),
        [name, month] => {
            if !month.ends_with(MONTH_SUFFIX) {
                return Err(CommandError::Usage(Usage::StatMonthSuffix));
            }
            Ok(Command::StatNameMonth {
                name: name.to_string(),
                month: parse_month(month)?,
            })
        }
        _ => Err(CommandError::Usage(Usage::Stat)),
    }
}

fn parse_month(token: &str) -> Result<u32, CommandError> {
    let digits = token.strip_suffix(MONTH_SUFFIX).unwrap_or(token);
    let month: u32 = digits
        .trim()
        .parse()
        .map_err(|_| CommandError::MonthNotNumeric)?;
    if !(1..=12).contains(&month) {
        return Err(CommandError::MonthOutOfRange(month));
    }
    Ok(month)
}

fn parse_record(tokens: &[&str], today: NaiveDate) -> Result<Command, CommandError> {
    // Only a 4th token that ends the message is read as an amount.
    let (raw_date, name, location, cost) = match *tokens {
        [date, name, location, cost] => (date, name, location, Some(cost)),
        [date, name, location, ..] => (date, name, location, None),
        _ => return Err(CommandError::Usage(Usage::Record)),
    };

    let date = strip_weekday_note(raw_date);
    let day = resolve_record_date(date, today.year()).ok_or(CommandError::DateFormat)?;
    let cost = match cost {
        Some(token) => Some(parse_amount(token).ok_or(CommandError::CostNotNumeric)?),
        None => None,
    };

    Ok(Command::Record {
        date: date.to_string(),
        day,
        name: name.to_string(),
        location: location.to_string(),
        cost,
    })
}

fn parse_amount(token: &str) -> Option<i64> {
    token.trim().parse().ok()
}
