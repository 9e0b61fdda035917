use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use ulid::Ulid;

use crate::sql::{Predicate, Row};
use crate::validator::{RowCounter, StoreError};

/// Rows of one table, as loaded from a JSON snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSnapshot {
    pub table: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// In-memory table store. Rows are flat text maps; the `id` column is the
/// primary key.
pub struct InMemoryStore {
    tables: DashMap<String, Vec<Row>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    // ── Loading ──────────────────────────────────────────────

    /// Insert a row, assigning a fresh id if it has none. Returns the id.
    pub fn insert(&self, table: &str, mut row: Row) -> String {
        let id = row
            .entry("id".to_string())
            .or_insert_with(|| Ulid::new().to_string())
            .clone();
        self.tables.entry(table.to_string()).or_default().push(row);
        id
    }

    pub fn load_snapshot(&self, snapshot: TableSnapshot) -> usize {
        let count = snapshot.rows.len();
        for row in snapshot.rows {
            self.insert(&snapshot.table, row);
        }
        count
    }

    // ── Queries ──────────────────────────────────────────────

    /// Count rows matching `predicate`. A table that was never written to
    /// counts as empty.
    pub fn count_matching(&self, table: &str, predicate: &str, params: &[String]) -> Result<u64, StoreError> {
        let predicate = Predicate::parse(predicate, params)?;
        let Some(rows) = self.tables.get(table) else {
            return Ok(0);
        };
        let mut count = 0u64;
        for row in rows.iter() {
            if predicate.matches(row)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl RowCounter for InMemoryStore {
    async fn count(&self, table: &str, predicate: &str, params: &[String]) -> Result<u64, StoreError> {
        self.count_matching(table, predicate, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn total(store: &InMemoryStore, table: &str) -> u64 {
        store.count_matching(table, "'1' = ?", &["1".to_string()]).unwrap()
    }

    #[test]
    fn insert_assigns_ulid_when_missing() {
        let store = InMemoryStore::new();
        let id = store.insert("t", row(&[("c_room", "A")]));
        assert!(Ulid::from_string(&id).is_ok());
        let n = store.count_matching("t", "id = ? AND c_room = ?", &[id, "A".to_string()]).unwrap();
        assert_eq!(n, 1);

        let given = store.insert("t", row(&[("id", "fixed"), ("c_room", "B")]));
        assert_eq!(given, "fixed");
        assert_eq!(total(&store, "t"), 2);
    }

    #[test]
    fn count_filters_rows() {
        let store = InMemoryStore::new();
        store.insert("t", row(&[("c_room", "A")]));
        store.insert("t", row(&[("c_room", "A")]));
        store.insert("t", row(&[("c_room", "B")]));
        let n = store
            .count_matching("t", "c_room = ?", &["A".to_string()])
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn unknown_table_counts_zero() {
        let store = InMemoryStore::new();
        assert_eq!(store.count_matching("missing", "'1' = ?", &["1".to_string()]).unwrap(), 0);
    }

    #[test]
    fn bad_predicate_is_an_error_even_for_empty_tables() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.count_matching("missing", "c_room = ? AND", &["A".to_string()]),
            Err(StoreError::Sql(_))
        ));
    }

    #[test]
    fn snapshot_loading() {
        let store = InMemoryStore::new();
        let snapshot: TableSnapshot = serde_json::from_str(
            r#"{"table": "app_fd_booking", "rows": [{"id": "1", "c_room": "A"}, {"c_room": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(store.load_snapshot(snapshot), 2);
        assert_eq!(total(&store, "app_fd_booking"), 2);
        let n = store.count_matching("app_fd_booking", "id = ?", &["1".to_string()]).unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn row_counter_delegates() {
        let store = InMemoryStore::new();
        store.insert("t", row(&[("c_room", "A")]));
        let counter: &dyn RowCounter = &store;
        assert_eq!(counter.count("t", "c_room = ?", &["A".to_string()]).await.unwrap(), 1);
    }
}
