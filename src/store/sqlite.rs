//! SQLite-backed graph store: nodes keyed by (label, key, value), per-node properties, merged edges.

use anyhow::{Context, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{GraphStore, NodeHandle, Props, StoreStats};
use crate::Result;

/// WAL tuning pragmas. Use after PRAGMA journal_mode = WAL.
const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        PRAGMA foreign_keys = ON;
        "#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE (label, key, value)
);

CREATE TABLE IF NOT EXISTS node_props (
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (node_id, name)
);

CREATE TABLE IF NOT EXISTS edges (
    src INTEGER NOT NULL REFERENCES nodes(id),
    label TEXT NOT NULL,
    dst INTEGER NOT NULL REFERENCES nodes(id),
    props TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (src, label, dst)
);
"#;

const INSERT_NODE_SQL: &str = "INSERT OR IGNORE INTO nodes (label, key, value) VALUES (?1, ?2, ?3)";
const SELECT_NODE_SQL: &str = "SELECT id FROM nodes WHERE label = ?1 AND key = ?2 AND value = ?3";
const UPSERT_PROP_SQL: &str = "INSERT INTO node_props (node_id, name, value) VALUES (?1, ?2, ?3)
     ON CONFLICT(node_id, name) DO UPDATE SET value = excluded.value";

/// Graph store over one SQLite connection. The connection sits behind a mutex, so each
/// operation is atomic with respect to the others.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store file, enabling WAL and applying the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open store {}", path.display()))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .context("enable WAL")?;
        conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database with the same schema (no WAL pragmas needed).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory store")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("enable foreign keys")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("store connection lock poisoned"))
    }

    /// Error unless `node` was issued by this store.
    fn ensure_node(conn: &Connection, node: NodeHandle) -> Result<()> {
        let found = conn
            .query_row("SELECT 1 FROM nodes WHERE id = ?1", [node.0], |_| Ok(()))
            .optional()
            .context("look up node id")?;
        found.ok_or_else(|| anyhow!("unknown node {:?}", node))
    }

    /// Node registered under (`label`, `key`, `value`), if any.
    pub fn find_node(&self, label: &str, key: &str, value: &str) -> Result<Option<NodeHandle>> {
        let conn = self.lock()?;
        let id = conn
            .query_row(SELECT_NODE_SQL, params![label, key, value], |row| row.get::<_, i64>(0))
            .optional()
            .context("look up node")?;
        Ok(id.map(NodeHandle))
    }

    /// Properties of the `label` relationship from `src` to `dst`, if it exists.
    pub fn edge_properties(&self, src: NodeHandle, label: &str, dst: NodeHandle) -> Result<Option<Props>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT props FROM edges WHERE src = ?1 AND label = ?2 AND dst = ?3",
                params![src.0, label, dst.0],
                |row| row.get(0),
            )
            .optional()
            .context("look up edge")?;
        raw.map(|s| serde_json::from_str(&s).context("decode edge props"))
            .transpose()
    }
}

impl GraphStore for SqliteStore {
    fn get_or_create_node(&self, label: &str, key: &str, value: &str) -> Result<(NodeHandle, bool)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin transaction")?;
        let created = tx
            .execute(INSERT_NODE_SQL, params![label, key, value])
            .context("insert node")?
            > 0;
        let id: i64 = tx
            .query_row(SELECT_NODE_SQL, params![label, key, value], |row| row.get(0))
            .context("select node")?;
        if created {
            tx.execute(UPSERT_PROP_SQL, params![id, key, value])
                .context("insert key property")?;
        }
        tx.commit().context("commit transaction")?;
        Ok((NodeHandle(id), created))
    }

    fn relate(&self, src: NodeHandle, label: &str, dst: NodeHandle, props: &Props) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin transaction")?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT props FROM edges WHERE src = ?1 AND label = ?2 AND dst = ?3",
                params![src.0, label, dst.0],
                |row| row.get(0),
            )
            .optional()
            .context("select edge")?;
        let mut merged: Props = match existing {
            Some(s) => serde_json::from_str(&s).context("decode edge props")?,
            None => Props::new(),
        };
        merged.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
        let encoded = serde_json::to_string(&merged).context("encode edge props")?;
        tx.execute(
            "INSERT OR REPLACE INTO edges (src, label, dst, props) VALUES (?1, ?2, ?3, ?4)",
            params![src.0, label, dst.0, encoded],
        )
        .context("insert edge")?;
        tx.commit().context("commit transaction")?;
        Ok(())
    }

    fn get_properties(&self, node: NodeHandle) -> Result<Props> {
        let conn = self.lock()?;
        Self::ensure_node(&conn, node)?;
        let mut stmt = conn
            .prepare_cached("SELECT name, value FROM node_props WHERE node_id = ?1")
            .context("prepare select props")?;
        let rows = stmt.query_map([node.0], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut props = Props::new();
        for row in rows {
            let (name, value): (String, String) = row?;
            props.insert(name, value);
        }
        Ok(props)
    }

    fn set_properties(&self, node: NodeHandle, props: &Props) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin transaction")?;
        Self::ensure_node(&tx, node)?;
        tx.execute("DELETE FROM node_props WHERE node_id = ?1", [node.0])
            .context("clear props")?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_PROP_SQL).context("prepare upsert")?;
            for (name, value) in props {
                stmt.execute(params![node.0, name, value])
                    .context("insert prop")?;
            }
        }
        tx.commit().context("commit transaction")?;
        Ok(())
    }

    fn merge_property(&self, node: NodeHandle, name: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(UPSERT_PROP_SQL, params![node.0, name, value])
            .context("upsert prop")?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let nodes: i64 = conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .context("count nodes")?;
        let edges: i64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .context("count edges")?;
        Ok(StoreStats {
            nodes: nodes.max(0) as u64,
            edges: edges.max(0) as u64,
        })
    }
}
