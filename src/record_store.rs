use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    error::{Error, Result},
    record::IndexRecord,
};

const RECORDS: TableDefinition<u64, &str> = TableDefinition::new("records");

/// Persistent store of [`IndexRecord`]s.
///
/// This is the metadata side of the system; the search service never
/// writes to it, it only reads records handed to it by the caller.
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure the table exists by opening it in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(RECORDS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new record under the next free id and return it.
    pub fn add(&self, name: &str, url: Option<&str>) -> Result<IndexRecord> {
        let txn = self.db.begin_write()?;
        let record = {
            let mut table = txn.open_table(RECORDS)?;
            let id = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(1);
            let record = IndexRecord {
                id,
                name: name.to_string(),
                url: url.map(str::to_string),
            };
            let encoded = serde_json::to_string(&record)?;
            table.insert(id, encoded.as_str())?;
            record
        };
        txn.commit()?;
        Ok(record)
    }

    pub fn get(&self, id: u64) -> Result<Option<IndexRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;
        match table.get(id)? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(RECORDS)?;
            table.remove(id)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn list(&self) -> Result<Vec<IndexRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, raw) = entry?;
            records.push(decode(raw.value())?);
        }
        Ok(records)
    }
}

fn decode(raw: &str) -> Result<IndexRecord> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("corrupt record entry: {e}")))
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}
