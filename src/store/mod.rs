//! Graph store abstraction the executor pool writes through.
//!
//! The pipeline only needs idempotent get-or-create for nodes, relationship creation, and node
//! property access. [`SqliteStore`] persists to a SQLite file; [`MemoryStore`] keeps everything in
//! process (tests and `--dry-run`).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

use crate::Result;

/// Node or relationship properties.
pub type Props = BTreeMap<String, String>;

/// Opaque node id issued by a store. Only meaningful to the store that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub i64);

/// Node and relationship totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub nodes: u64,
    pub edges: u64,
}

/// Operations the loader performs against a graph store. Implementations must be safe to call
/// from many executor threads at once.
pub trait GraphStore: Send + Sync {
    /// Return the node whose `key` property equals `value` under `label`, creating it if absent.
    /// The bool is true when this call created the node. Must be idempotent under concurrent calls
    /// for the same key: racing callers all get the same handle and exactly one sees `true`.
    fn get_or_create_node(&self, label: &str, key: &str, value: &str) -> Result<(NodeHandle, bool)>;

    /// Create a `label` relationship from `src` to `dst`, merging `props` into an existing one.
    fn relate(&self, src: NodeHandle, label: &str, dst: NodeHandle, props: &Props) -> Result<()>;

    /// All properties of `node`, including its key property. Errors if `node` is unknown to this store.
    fn get_properties(&self, node: NodeHandle) -> Result<Props>;

    /// Replace all properties of `node` with `props`. Errors if `node` is unknown to this store.
    fn set_properties(&self, node: NodeHandle, props: &Props) -> Result<()>;

    /// Set a single property, keeping the others. The default is a read-modify-write through
    /// [`get_properties`](Self::get_properties)/[`set_properties`](Self::set_properties), which can lose
    /// concurrent updates to the same node; stores override it with an atomic upsert.
    fn merge_property(&self, node: NodeHandle, name: &str, value: &str) -> Result<()> {
        let mut props = self.get_properties(node)?;
        props.insert(name.to_string(), value.to_string());
        self.set_properties(node, &props)
    }

    fn stats(&self) -> Result<StoreStats>;
}
