use std::collections::BTreeMap;

use crate::error::CommandError;
use crate::{CostEntry, ExpenseRecord};

pub const HELP_TEXT: &str = "指令說明：
新增 地點 金額
新增 地點 平日 金額 假日 金額
新增人名 人名
刪除 地點 地點名稱
刪除 人名 人名
刪除 紀錄 月/日(星期) 人名
清單 地點
清單 人名
統計 人名
統計 月份 (例如：統計 12月)
統計 人名 月份 (例如：統計 小明 12月)
月/日(星期) 人名 地點
月/日(星期) 人名 地點 金額";

/// Successful outcome of one command, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Help,
    LocationDeleted {
        location: String,
        deleted: usize,
    },
    NameDeleted {
        name: String,
        deleted: usize,
    },
    RecordsDeleted {
        date: String,
        name: String,
        deleted: usize,
    },
    Locations(Vec<(String, CostEntry)>),
    Names(Vec<String>),
    LocationSaved {
        location: String,
        cost: CostEntry,
    },
    NameAdded(String),
    NameTotal {
        name: String,
        total: i64,
    },
    NameMonthTotal {
        name: String,
        month: u32,
        total: i64,
    },
    MonthTotals {
        year: i32,
        month: u32,
        totals: BTreeMap<String, i64>,
        sum: i64,
    },
    Recorded(ExpenseRecord),
}

pub fn render(outcome: &Result<Reply, CommandError>) -> String {
    match outcome {
        Ok(reply) => render_reply(reply),
        Err(err) => err.to_string(),
    }
}

fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Help => HELP_TEXT.to_string(),
        Reply::LocationDeleted { location, deleted } => {
            if *deleted > 0 {
                format!("已成功刪除地點：{location}")
            } else {
                format!("找不到地點：{location}")
            }
        }
        Reply::NameDeleted { name, deleted } => {
            if *deleted > 0 {
                format!("已成功刪除人名：{name}")
            } else {
                format!("找不到人名：{name}")
            }
        }
        Reply::RecordsDeleted {
            date,
            name,
            deleted,
        } => {
            if *deleted > 0 {
                format!("已成功刪除 {date} {name} 的紀錄，共 {deleted} 筆。")
            } else {
                format!("找不到 {date} {name} 的紀錄。")
            }
        }
        Reply::Locations(locations) => {
            if locations.is_empty() {
                return "目前沒有任何地點紀錄。".to_string();
            }
            let lines: Vec<String> = locations
                .iter()
                .map(|(location, cost)| match cost {
                    CostEntry::Flat(cost) => format!("{location}: {cost}"),
                    CostEntry::Paired { weekday, holiday } => {
                        format!("{location}: 平日-{weekday}, 假日-{holiday}")
                    }
                })
                .collect();
            format!("地點清單：\n{}", lines.join("\n"))
        }
        Reply::Names(names) => {
            if names.is_empty() {
                "目前沒有任何人名紀錄。".to_string()
            } else {
                format!("人名清單：\n{}", names.join("\n"))
            }
        }
        Reply::LocationSaved { location, cost } => match cost {
            CostEntry::Flat(cost) => format!("已新增/更新地點：{location}，金額：{cost}"),
            CostEntry::Paired { weekday, holiday } => {
                format!("已新增/更新地點：{location}，平日：{weekday}，假日：{holiday}")
            }
        },
        Reply::NameAdded(name) => format!("已成功新增人名：{name}"),
        Reply::NameTotal { name, total } => {
            if *total == 0 {
                format!("找不到 {name} 的任何通路費紀錄。")
            } else {
                format!("{name} 的通路費總計為：{total}")
            }
        }
        Reply::NameMonthTotal { name, month, total } => {
            if *total == 0 {
                format!("找不到 {name} 在 {month}月 的任何通路費紀錄。")
            } else {
                format!("{name} 在 {month}月 的通路費總計為：{total}")
            }
        }
        Reply::MonthTotals {
            year,
            month,
            totals,
            sum,
        } => {
            if totals.is_empty() {
                return format!("找不到 {year}年{month}月 的任何通路費紀錄。");
            }
            let mut text = format!("{year}年{month}月 通路費統計：");
            for (name, total) in totals {
                text.push_str(&format!("\n{name}：{total}"));
            }
            text.push_str(&format!("\n合計：{sum}"));
            text
        }
        Reply::Recorded(record) => format!(
            "已成功紀錄：{}, {}, {}, 金額: {}",
            record.date, record.name, record.location, record.cost
        ),
    }
}
