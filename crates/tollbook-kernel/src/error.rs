use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Which command's usage line to show when its arguments don't fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Delete,
    DeleteLocation,
    DeleteName,
    DeleteRecord,
    List,
    Add,
    AddName,
    Stat,
    StatMonthSuffix,
    Record,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Usage::Delete => "刪除指令格式錯誤！請使用「刪除 地點/人名/紀錄 ...」",
            Usage::DeleteLocation => "刪除地點指令格式錯誤！請使用「刪除 地點 地點名稱」",
            Usage::DeleteName => "刪除人名指令格式錯誤！請使用「刪除 人名 人名」",
            Usage::DeleteRecord => "刪除紀錄指令格式錯誤！請使用「刪除 紀錄 月/日(星期) 人名」",
            Usage::List => "清單指令格式錯誤！請使用「清單 地點」或「清單 人名」。",
            Usage::Add => {
                "新增指令格式錯誤！請使用「新增 地點 金額」或「新增 地點 平日 金額 假日 金額」"
            }
            Usage::AddName => "新增人名指令格式錯誤！請使用「新增人名 人名」的格式。",
            Usage::Stat => {
                "統計指令格式錯誤！請使用「統計 人名」、「統計 月份」或「統計 人名 月份」。(例如：統計 小明 12月)"
            }
            Usage::StatMonthSuffix => {
                "統計指令格式錯誤！月份必須是「數字+月」。(例如：統計 小明 12月)。"
            }
            Usage::Record => "格式錯誤！請使用「日期 人名 地點」或「日期 人名 地點 金額」的格式。",
        };
        f.write_str(text)
    }
}

/// Every way a command can fail. The display text is the reply sent back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0}")]
    Usage(Usage),
    #[error("錯誤：金額必須是數字！")]
    CostNotNumeric,
    #[error("錯誤：平日或假日金額必須是數字！")]
    PairedCostNotNumeric,
    #[error("統計指令格式錯誤！月份必須是數字。(例如：統計 小明 12月)。")]
    MonthNotNumeric,
    #[error("統計指令格式錯誤！月份必須介於 1 到 12，收到：{0}")]
    MonthOutOfRange(u32),
    #[error("日期格式錯誤！請使用「月/日」或「月/日(星期)」的格式。")]
    DateFormat,
    #[error("{op}失敗：{source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("無法辨識的指令，請輸入「說明」查看指令格式。")]
    Unrecognized,
}

impl CommandError {
    pub(crate) fn store(op: &'static str) -> impl FnOnce(StoreError) -> CommandError {
        move |source| CommandError::Store { op, source }
    }
}
