//! In-memory `GraphStore` for tests.
//!
//! Models what the resolver relies on from Neo4j: read-committed transactions with
//! buffered writes, a write lock on the GraphGist taken by `merge_candidate` and held
//! until the transaction settles, per-relationship-type fault injection, a concurrent
//! delete of a GraphGist, and rollback failures.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use graphgist_common::{
    Direction, GraphGist, GraphGistCandidate, GraphGistFields, ReferenceRelationship,
    CANDIDATE_LABEL, GRAPH_GIST_LABEL, IS_VERSION,
};

use crate::error::{GraphError, Result};
use crate::store::{GraphStore, GraphTxn};

#[derive(Debug, Clone)]
struct MemNode {
    label: String,
    fields: Option<GraphGistFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemRel {
    from: Uuid,
    rel_type: &'static str,
    to: Uuid,
}

#[derive(Debug, Clone, Default)]
struct MemoryGraph {
    nodes: HashMap<Uuid, MemNode>,
    rels: Vec<MemRel>,
}

impl MemoryGraph {
    fn apply(&mut self, write: &Write) {
        match write {
            Write::CreateNode { uuid, node } => {
                self.nodes.insert(*uuid, node.clone());
            }
            Write::CreateRel(rel) => self.rels.push(rel.clone()),
        }
    }

    fn has_label(&self, uuid: Uuid, label: &str) -> bool {
        self.nodes.get(&uuid).is_some_and(|n| n.label == label)
    }

    fn candidates_of(&self, graph_gist: Uuid) -> Vec<Uuid> {
        self.rels
            .iter()
            .filter(|r| r.rel_type == IS_VERSION && r.to == graph_gist)
            .filter(|r| self.has_label(r.from, CANDIDATE_LABEL))
            .map(|r| r.from)
            .collect()
    }

    /// Nodes on the far end of `rel` from `node`, in the relationship's own direction.
    fn targets(&self, node: Uuid, rel: ReferenceRelationship) -> Vec<Uuid> {
        let t = rel.rel_type();
        self.rels
            .iter()
            .filter(|r| r.rel_type == t)
            .filter_map(|r| match rel.direction() {
                Direction::Outgoing if r.from == node => Some(r.to),
                Direction::Incoming if r.to == node => Some(r.from),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
enum Write {
    CreateNode { uuid: Uuid, node: MemNode },
    CreateRel(MemRel),
}

#[derive(Default)]
struct Shared {
    graph: Mutex<MemoryGraph>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    failing: Mutex<HashSet<ReferenceRelationship>>,
    latency: Mutex<Option<Duration>>,
    vanishing: Mutex<HashSet<Uuid>>,
    rollback_fails: AtomicBool,
    open: AtomicUsize,
}

impl Shared {
    fn graph(&self) -> MutexGuard<'_, MemoryGraph> {
        self.graph.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared handle to an in-memory property graph.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every transactional operation, widening race windows.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.shared.latency.lock().unwrap_or_else(|e| e.into_inner()) = Some(latency);
        self
    }

    /// Make `duplicate_relationships` fail for `rel`.
    pub fn fail_on(&self, rel: ReferenceRelationship) {
        self.shared
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(rel);
    }

    /// Delete `graph_gist` from committed state right after the next candidate lookup
    /// for it, as a concurrent writer would.
    pub fn delete_after_lookup(&self, graph_gist: Uuid) {
        self.shared
            .vanishing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(graph_gist);
    }

    /// Make every `rollback` report an error. The session is still released.
    pub fn fail_rollbacks(&self) {
        self.shared.rollback_fails.store(true, Ordering::SeqCst);
    }

    pub fn insert_graph_gist(&self, graph_gist: &GraphGist) {
        self.shared.graph().nodes.insert(
            graph_gist.uuid,
            MemNode {
                label: GRAPH_GIST_LABEL.to_string(),
                fields: Some(graph_gist.fields.clone()),
            },
        );
    }

    /// Create a reference node (if new) and attach it to `graph_gist` via `rel`.
    pub fn attach(&self, graph_gist: Uuid, rel: ReferenceRelationship, target: Uuid) {
        let mut graph = self.shared.graph();
        graph.nodes.entry(target).or_insert_with(|| MemNode {
            label: reference_label(rel).to_string(),
            fields: None,
        });
        let (from, to) = match rel.direction() {
            Direction::Outgoing => (graph_gist, target),
            Direction::Incoming => (target, graph_gist),
        };
        graph.rels.push(MemRel {
            from,
            rel_type: rel.rel_type(),
            to,
        });
    }

    pub fn candidates_of(&self, graph_gist: Uuid) -> Vec<Uuid> {
        self.shared.graph().candidates_of(graph_gist)
    }

    pub fn candidate(&self, uuid: Uuid) -> Option<GraphGistCandidate> {
        let graph = self.shared.graph();
        let node = graph.nodes.get(&uuid).filter(|n| n.label == CANDIDATE_LABEL)?;
        Some(GraphGistCandidate {
            uuid,
            fields: node.fields.clone()?,
        })
    }

    pub fn targets(&self, node: Uuid, rel: ReferenceRelationship) -> Vec<Uuid> {
        self.shared.graph().targets(node, rel)
    }

    pub fn target_set(&self, node: Uuid, rel: ReferenceRelationship) -> BTreeSet<Uuid> {
        self.targets(node, rel).into_iter().collect()
    }

    pub fn node_count(&self) -> usize {
        self.shared.graph().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.shared.graph().rels.len()
    }

    /// Transactions begun and not yet committed or rolled back.
    pub fn open_transactions(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    type Txn = MemoryTxn;

    async fn begin(&self) -> Result<MemoryTxn> {
        self.shared.open.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTxn {
            shared: self.shared.clone(),
            pending: Vec::new(),
            held: HashMap::new(),
        })
    }
}

pub struct MemoryTxn {
    shared: Arc<Shared>,
    pending: Vec<Write>,
    held: HashMap<Uuid, OwnedMutexGuard<()>>,
}

impl MemoryTxn {
    /// Committed state overlaid with this transaction's own writes.
    fn view(&self) -> MemoryGraph {
        let mut graph = self.shared.graph().clone();
        for write in &self.pending {
            graph.apply(write);
        }
        graph
    }

    async fn pause(&self) {
        let latency = *self.shared.latency.lock().unwrap_or_else(|e| e.into_inner());
        match latency {
            Some(d) => tokio::time::sleep(d).await,
            None => tokio::task::yield_now().await,
        }
    }

    async fn lock(&mut self, uuid: Uuid) {
        if self.held.contains_key(&uuid) {
            return;
        }
        let lock = self
            .shared
            .locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(uuid)
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        self.held.insert(uuid, guard);
    }

    fn settle(self) {
        // Lock guards drop with `self`, after any commit has been applied.
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphTxn for MemoryTxn {
    async fn find_graph_gist(&mut self, uuid: Uuid) -> Result<Option<GraphGist>> {
        self.pause().await;
        let view = self.view();
        Ok(view
            .nodes
            .get(&uuid)
            .filter(|n| n.label == GRAPH_GIST_LABEL)
            .and_then(|n| n.fields.clone())
            .map(|fields| GraphGist { uuid, fields }))
    }

    async fn find_candidate_id(&mut self, graph_gist: Uuid) -> Result<Option<Uuid>> {
        self.pause().await;
        let found = self.view().candidates_of(graph_gist).into_iter().next();

        let vanishes = self
            .shared
            .vanishing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&graph_gist);
        if vanishes {
            let mut graph = self.shared.graph();
            graph.nodes.remove(&graph_gist);
            graph.rels.retain(|r| r.from != graph_gist && r.to != graph_gist);
        }
        Ok(found)
    }

    async fn merge_candidate(
        &mut self,
        graph_gist: Uuid,
        candidate: &GraphGistCandidate,
    ) -> Result<Uuid> {
        self.pause().await;
        self.lock(graph_gist).await;

        let view = self.view();
        if !view.has_label(graph_gist, GRAPH_GIST_LABEL) {
            return Err(GraphError::Storage(format!(
                "GraphGist {graph_gist} disappeared before its candidate could be created"
            )));
        }
        if let Some(existing) = view.candidates_of(graph_gist).into_iter().next() {
            return Ok(existing);
        }

        self.pending.push(Write::CreateNode {
            uuid: candidate.uuid,
            node: MemNode {
                label: CANDIDATE_LABEL.to_string(),
                fields: Some(candidate.fields.clone()),
            },
        });
        self.pending.push(Write::CreateRel(MemRel {
            from: candidate.uuid,
            rel_type: IS_VERSION,
            to: graph_gist,
        }));
        Ok(candidate.uuid)
    }

    async fn duplicate_relationships(
        &mut self,
        graph_gist: Uuid,
        candidate: Uuid,
        rel: ReferenceRelationship,
    ) -> Result<u64> {
        self.pause().await;
        let failing = self
            .shared
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&rel);
        if failing {
            return Err(GraphError::Storage(format!("injected failure duplicating {rel}")));
        }

        let view = self.view();
        if !view.has_label(candidate, CANDIDATE_LABEL) {
            return Ok(0);
        }
        let targets = view.targets(graph_gist, rel);
        for target in &targets {
            let (from, to) = match rel.direction() {
                Direction::Outgoing => (candidate, *target),
                Direction::Incoming => (*target, candidate),
            };
            self.pending.push(Write::CreateRel(MemRel {
                from,
                rel_type: rel.rel_type(),
                to,
            }));
        }
        Ok(targets.len() as u64)
    }

    async fn commit(mut self) -> Result<()> {
        {
            let mut graph = self.shared.graph();
            for write in self.pending.drain(..) {
                graph.apply(&write);
            }
        }
        self.settle();
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.pending.clear();
        let fails = self.shared.rollback_fails.load(Ordering::SeqCst);
        self.settle();
        if fails {
            return Err(GraphError::Storage("rollback failed".to_string()));
        }
        Ok(())
    }
}

fn reference_label(rel: ReferenceRelationship) -> &'static str {
    match rel {
        ReferenceRelationship::Wrote => "Author",
        ReferenceRelationship::ForChallenge => "Challenge",
        ReferenceRelationship::ForIndustry => "Industry",
        ReferenceRelationship::ForUseCase => "UseCase",
        ReferenceRelationship::HasImage => "Image",
    }
}
