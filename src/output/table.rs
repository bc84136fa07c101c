//! SQLite table export of a crawl run
//!
//! This module flattens a run's edge-sets into two tables:
//! - `users`: one row per distinct neighbor, first occurrence wins
//! - `edges`: one row per stored (source, target) relationship, in API order
//!
//! Export rebuilds both tables from scratch, so running it again after a
//! resumed crawl picks up the new records.

use crate::output::OutputResult;
use crate::state::UserRecord;
use crate::storage::RunStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;

/// File name of the exported database inside a run directory
pub const USERS_DB_FILE: &str = "users.db";

/// SQL schema for the exported database
pub const SCHEMA_SQL: &str = r#"
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS edges;

-- Distinct neighbor accounts
CREATE TABLE users (
    id TEXT PRIMARY KEY,
    username TEXT,
    name TEXT,
    created_at TEXT,
    account_age_days INTEGER,
    following_count INTEGER,
    followers_count INTEGER,
    tweet_count INTEGER,
    listed_count INTEGER,
    verified INTEGER,
    protected INTEGER,
    location TEXT,
    urls TEXT NOT NULL DEFAULT '[]'
);

-- Follow relationships as stored in the run
CREATE TABLE edges (
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    direction TEXT NOT NULL,
    position INTEGER NOT NULL
);

CREATE INDEX idx_edges_source ON edges(source);
CREATE INDEX idx_edges_target ON edges(target);
"#;

/// Row counts of a completed export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub users: u64,
    pub edges: u64,
}

/// Creates (or recreates) the export tables
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Exports a run into `users.db` at the given path
///
/// # Arguments
///
/// * `store` - The run to export
/// * `db_path` - Location of the SQLite file (created if missing)
pub fn export_users_db(store: &dyn RunStore, db_path: &Path) -> OutputResult<ExportSummary> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(db_path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
    ",
    )?;

    let summary = export_to_connection(store, &mut conn)?;
    tracing::info!(
        "Exported {} users and {} edges to {}",
        summary.users,
        summary.edges,
        db_path.display()
    );
    Ok(summary)
}

/// Exports a run into an open connection inside a single transaction
pub fn export_to_connection(
    store: &dyn RunStore,
    conn: &mut Connection,
) -> OutputResult<ExportSummary> {
    let tx = conn.transaction()?;
    initialize_schema(&tx)?;

    let today = Utc::now();
    let mut summary = ExportSummary { users: 0, edges: 0 };
    {
        let mut insert_user = tx.prepare(
            "INSERT OR IGNORE INTO users (
                id, username, name, created_at, account_age_days,
                following_count, followers_count, tweet_count, listed_count,
                verified, protected, location, urls
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        let mut insert_edge = tx.prepare(
            "INSERT INTO edges (source, target, direction, position) VALUES (?1, ?2, ?3, ?4)",
        )?;

        for (node, direction) in store.list()? {
            let records = store.read(&node, direction)?;
            for (position, record) in records.iter().enumerate() {
                let created_at = record.str_field("created_at");
                let inserted = insert_user.execute(params![
                    record.id.as_str(),
                    record.str_field("username"),
                    record.str_field("name"),
                    created_at,
                    created_at.and_then(|c| account_age_days(c, today)),
                    record.metric("following_count"),
                    record.metric("followers_count"),
                    record.metric("tweet_count"),
                    record.metric("listed_count"),
                    bool_field(record, "verified"),
                    bool_field(record, "protected"),
                    record.str_field("location"),
                    serde_json::to_string(&expanded_urls(record))?,
                ])?;
                summary.users += inserted as u64;

                insert_edge.execute(params![
                    node.as_str(),
                    record.id.as_str(),
                    direction.as_str(),
                    position as i64,
                ])?;
                summary.edges += 1;
            }
        }
    }
    tx.commit()?;

    Ok(summary)
}

fn bool_field(record: &UserRecord, key: &str) -> Option<bool> {
    record.fields.get(key).and_then(Value::as_bool)
}

/// Whole days between account creation and `now`
fn account_age_days(created_at: &str, now: DateTime<Utc>) -> Option<i64> {
    let created = DateTime::parse_from_rfc3339(created_at).ok()?;
    Some((now.date_naive() - created.with_timezone(&Utc).date_naive()).num_days())
}

/// Distinct expanded URLs from the profile URL and the description, in order
fn expanded_urls(record: &UserRecord) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let Some(entities) = record.fields.get("entities") else {
        return urls;
    };

    for section in ["url", "description"] {
        let entries = entities
            .get(section)
            .and_then(|s| s.get("urls"))
            .and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            if let Some(url) = entry.get("expanded_url").and_then(Value::as_str) {
                if !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EdgeDirection, NodeId};
    use crate::storage::JsonlRunStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn node(id: &str) -> NodeId {
        NodeId::parse(id).unwrap()
    }

    fn user(value: Value) -> UserRecord {
        serde_json::from_value(value).unwrap()
    }

    fn sample_store(dir: &TempDir) -> JsonlRunStore {
        let store = JsonlRunStore::open(dir.path(), "run");
        let alice = user(json!({
            "id": "2",
            "username": "alice",
            "name": "Alice",
            "created_at": "2015-06-01T12:00:00.000Z",
            "verified": true,
            "protected": false,
            "public_metrics": {
                "followers_count": 10,
                "following_count": 20,
                "tweet_count": 30,
                "listed_count": 1
            },
            "entities": {
                "url": {"urls": [{"expanded_url": "https://alice.example"}]},
                "description": {"urls": [
                    {"expanded_url": "https://blog.example"},
                    {"expanded_url": "https://alice.example"}
                ]}
            }
        }));
        let bob = user(json!({"id": "3", "username": "bob"}));

        store
            .write(&node("1"), EdgeDirection::Following, &[alice.clone(), bob])
            .unwrap();
        store
            .write(&node("4"), EdgeDirection::Following, &[alice])
            .unwrap();
        store
            .write(&node("5"), EdgeDirection::Following, &[])
            .unwrap();
        store
    }

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
        // Recreating is allowed
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_export_deduplicates_users() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(&dir);
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = export_to_connection(&store, &mut conn).unwrap();
        assert_eq!(summary, ExportSummary { users: 2, edges: 3 });

        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 2);
    }

    #[test]
    fn test_export_flattens_user_fields() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(&dir);
        let mut conn = Connection::open_in_memory().unwrap();
        export_to_connection(&store, &mut conn).unwrap();

        let (username, followers, verified, urls): (String, i64, bool, String) = conn
            .query_row(
                "SELECT username, followers_count, verified, urls FROM users WHERE id = '2'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(username, "alice");
        assert_eq!(followers, 10);
        assert!(verified);
        assert_eq!(urls, r#"["https://alice.example","https://blog.example"]"#);

        let missing: Option<i64> = conn
            .query_row(
                "SELECT followers_count FROM users WHERE id = '3'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_export_records_edges_in_order() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(&dir);
        let mut conn = Connection::open_in_memory().unwrap();
        export_to_connection(&store, &mut conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT target FROM edges WHERE source = '1' ORDER BY position")
            .unwrap();
        let targets: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(targets, vec!["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_export_file_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(&dir);
        let db_path = store.run_dir().join(USERS_DB_FILE);

        let first = export_users_db(&store, &db_path).unwrap();
        let second = export_users_db(&store, &db_path).unwrap();
        assert_eq!(first, second);
        assert!(db_path.exists());
    }

    #[test]
    fn test_account_age_days() {
        let now = DateTime::parse_from_rfc3339("2024-01-11T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(account_age_days("2024-01-01T23:59:59.000Z", now), Some(10));
        assert_eq!(account_age_days("not a date", now), None);
    }
}
