//! In-process graph store behind a single mutex.

use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{GraphStore, NodeHandle, Props, StoreStats};
use crate::Result;

#[derive(Default)]
struct Graph {
    next_id: i64,
    /// (label, key, value) → node
    index: HashMap<(String, String, String), NodeHandle>,
    props: HashMap<NodeHandle, Props>,
    /// (src, label, dst) → relationship props
    edges: HashMap<(NodeHandle, String, NodeHandle), Props>,
}

/// Graph held in memory. Same semantics as [`SqliteStore`](super::SqliteStore), plus lookups for inspection.
#[derive(Default)]
pub struct MemoryStore {
    graph: Mutex<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Graph>> {
        self.graph
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Node registered under (`label`, `key`, `value`), if any.
    pub fn find_node(&self, label: &str, key: &str, value: &str) -> Option<NodeHandle> {
        let g = self.lock().ok()?;
        g.index
            .get(&(label.to_string(), key.to_string(), value.to_string()))
            .copied()
    }

    /// Properties of `node`, empty if unknown.
    pub fn properties_of(&self, node: NodeHandle) -> Props {
        self.lock()
            .ok()
            .and_then(|g| g.props.get(&node).cloned())
            .unwrap_or_default()
    }

    pub fn has_edge(&self, src: NodeHandle, label: &str, dst: NodeHandle) -> bool {
        self.lock()
            .map(|g| g.edges.contains_key(&(src, label.to_string(), dst)))
            .unwrap_or(false)
    }
}

impl GraphStore for MemoryStore {
    fn get_or_create_node(&self, label: &str, key: &str, value: &str) -> Result<(NodeHandle, bool)> {
        let mut g = self.lock()?;
        let k = (label.to_string(), key.to_string(), value.to_string());
        if let Some(h) = g.index.get(&k) {
            return Ok((*h, false));
        }
        g.next_id += 1;
        let h = NodeHandle(g.next_id);
        g.index.insert(k, h);
        g.props
            .insert(h, Props::from([(key.to_string(), value.to_string())]));
        Ok((h, true))
    }

    fn relate(&self, src: NodeHandle, label: &str, dst: NodeHandle, props: &Props) -> Result<()> {
        let mut g = self.lock()?;
        if !g.props.contains_key(&src) || !g.props.contains_key(&dst) {
            return Err(anyhow!("relate {:?} -[{}]-> {:?}: unknown node", src, label, dst));
        }
        g.edges
            .entry((src, label.to_string(), dst))
            .or_default()
            .extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn get_properties(&self, node: NodeHandle) -> Result<Props> {
        let g = self.lock()?;
        g.props
            .get(&node)
            .cloned()
            .ok_or_else(|| anyhow!("unknown node {:?}", node))
    }

    fn set_properties(&self, node: NodeHandle, props: &Props) -> Result<()> {
        let mut g = self.lock()?;
        let slot = g
            .props
            .get_mut(&node)
            .ok_or_else(|| anyhow!("unknown node {:?}", node))?;
        *slot = props.clone();
        Ok(())
    }

    fn merge_property(&self, node: NodeHandle, name: &str, value: &str) -> Result<()> {
        let mut g = self.lock()?;
        g.props
            .get_mut(&node)
            .ok_or_else(|| anyhow!("unknown node {:?}", node))?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let g = self.lock()?;
        Ok(StoreStats {
            nodes: g.props.len() as u64,
            edges: g.edges.len() as u64,
        })
    }
}
