use std::collections::{BTreeMap, BTreeSet, HashMap};

use rusqlite::{params, Connection, OptionalExtension};
use tollbook_kernel::{month_of, CostEntry, ExpenseRecord, Ledger, StoreError};

pub enum StoreBackend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl StoreBackend {
    pub fn ledger_mut(&mut self) -> &mut dyn Ledger {
        match self {
            StoreBackend::Memory(store) => store,
            StoreBackend::Sqlite(store) => store,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    costs: HashMap<String, CostEntry>,
    names: BTreeSet<String>,
    records: Vec<ExpenseRecord>,
}

fn overflow() -> StoreError {
    StoreError("integer overflow".to_string())
}

fn checked_sum<'a>(mut records: impl Iterator<Item = &'a ExpenseRecord>) -> Result<i64, StoreError> {
    records
        .try_fold(0i64, |acc, r| acc.checked_add(r.cost))
        .ok_or_else(overflow)
}

impl MemoryStore {
    fn month_records(&self, month: u32) -> impl Iterator<Item = &ExpenseRecord> {
        self.records
            .iter()
            .filter(move |r| month_of(&r.date) == Some(month))
    }
}

impl Ledger for MemoryStore {
    fn upsert_cost(&mut self, location: &str, cost: CostEntry) -> Result<(), StoreError> {
        self.costs.insert(location.to_string(), cost);
        Ok(())
    }

    fn delete_cost(&mut self, location: &str) -> Result<usize, StoreError> {
        Ok(self.costs.remove(location).map_or(0, |_| 1))
    }

    fn list_costs(&self) -> Result<Vec<(String, CostEntry)>, StoreError> {
        let mut costs: Vec<(String, CostEntry)> =
            self.costs.iter().map(|(k, v)| (k.clone(), *v)).collect();
        costs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(costs)
    }

    fn cost_of(&self, location: &str) -> Result<Option<CostEntry>, StoreError> {
        Ok(self.costs.get(location).copied())
    }

    fn upsert_name(&mut self, name: &str) -> Result<(), StoreError> {
        self.names.insert(name.to_string());
        Ok(())
    }

    fn delete_name(&mut self, name: &str) -> Result<usize, StoreError> {
        Ok(usize::from(self.names.remove(name)))
    }

    fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.names.iter().cloned().collect())
    }

    fn add_record(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn delete_records(&mut self, date: &str, name: &str) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records.retain(|r| !(r.date == date && r.name == name));
        Ok(before - self.records.len())
    }

    fn sum_cost_by_name(&self, name: &str) -> Result<i64, StoreError> {
        checked_sum(self.records.iter().filter(|r| r.name == name))
    }

    fn sum_cost_by_name_and_month(&self, name: &str, month: u32) -> Result<i64, StoreError> {
        checked_sum(self.month_records(month).filter(|r| r.name == name))
    }

    fn sum_cost_by_month_grouped_by_name(
        &self,
        month: u32,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut totals = BTreeMap::new();
        for r in self.month_records(month) {
            let total = totals.entry(r.name.clone()).or_insert(0i64);
            *total = total.checked_add(r.cost).ok_or_else(overflow)?;
        }
        Ok(totals)
    }
}

pub struct SqliteStore {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError(e.to_string())
}

/// GLOB patterns matching `M/..` and `MM/..` dates of one month.
fn month_globs(month: u32) -> (String, String) {
    (format!("{month}/*"), format!("{month:02}/*"))
}

fn cost_from_columns(weekday: i64, holiday: Option<i64>) -> CostEntry {
    match holiday {
        Some(holiday) => CostEntry::Paired { weekday, holiday },
        None => CostEntry::Flat(weekday),
    }
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::init(Connection::open(path).map_err(db_err)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS costs (
                location TEXT PRIMARY KEY,
                weekday_cost INTEGER NOT NULL,
                holiday_cost INTEGER
            );
            CREATE TABLE IF NOT EXISTS names (
                name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                cost INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS records_name_date ON records(name, date);
            ",
        )
        .map_err(db_err)?;
        Ok(Self { conn })
    }
}

impl Ledger for SqliteStore {
    fn upsert_cost(&mut self, location: &str, cost: CostEntry) -> Result<(), StoreError> {
        let (weekday, holiday) = match cost {
            CostEntry::Flat(cost) => (cost, None),
            CostEntry::Paired { weekday, holiday } => (weekday, Some(holiday)),
        };
        self.conn
            .execute(
                "
                INSERT INTO costs(location, weekday_cost, holiday_cost)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(location) DO UPDATE SET
                    weekday_cost=excluded.weekday_cost,
                    holiday_cost=excluded.holiday_cost
                ",
                params![location, weekday, holiday],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn delete_cost(&mut self, location: &str) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM costs WHERE location = ?1", params![location])
            .map_err(db_err)
    }

    fn list_costs(&self) -> Result<Vec<(String, CostEntry)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT location, weekday_cost, holiday_cost FROM costs ORDER BY location",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let location: String = row.get(0)?;
                let weekday: i64 = row.get(1)?;
                let holiday: Option<i64> = row.get(2)?;
                Ok((location, cost_from_columns(weekday, holiday)))
            })
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn cost_of(&self, location: &str) -> Result<Option<CostEntry>, StoreError> {
        self.conn
            .query_row(
                "SELECT weekday_cost, holiday_cost FROM costs WHERE location = ?1",
                params![location],
                |row| Ok(cost_from_columns(row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)
    }

    fn upsert_name(&mut self, name: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO names(name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![name],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn delete_name(&mut self, name: &str) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM names WHERE name = ?1", params![name])
            .map_err(db_err)
    }

    fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM names ORDER BY name")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn add_record(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO records(date, name, location, cost) VALUES (?1, ?2, ?3, ?4)",
                params![record.date, record.name, record.location, record.cost],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn delete_records(&mut self, date: &str, name: &str) -> Result<usize, StoreError> {
        self.conn
            .execute(
                "DELETE FROM records WHERE date = ?1 AND name = ?2",
                params![date, name],
            )
            .map_err(db_err)
    }

    fn sum_cost_by_name(&self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(cost), 0) FROM records WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn sum_cost_by_name_and_month(&self, name: &str, month: u32) -> Result<i64, StoreError> {
        let (short, padded) = month_globs(month);
        self.conn
            .query_row(
                "
                SELECT COALESCE(SUM(cost), 0) FROM records
                WHERE name = ?1 AND (date GLOB ?2 OR date GLOB ?3)
                ",
                params![name, short, padded],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn sum_cost_by_month_grouped_by_name(
        &self,
        month: u32,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let (short, padded) = month_globs(month);
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT name, SUM(cost) FROM records
                WHERE date GLOB ?1 OR date GLOB ?2
                GROUP BY name
                ",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![short, padded], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(db_err)?;
        rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(db_err)
    }
}
