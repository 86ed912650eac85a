use tracing::{debug, info, warn};
use uuid::Uuid;

use graphgist_common::{CandidateId, GraphGistCandidate, ReferenceRelationship};

use crate::error::{GraphError, Result};
use crate::store::{GraphStore, GraphTxn};
use crate::txn::TransactionRunner;

/// Look up the candidate for a GraphGist, creating it if none exists yet.
///
/// Runs inside the caller's transaction; committing is the caller's job. Creation
/// snapshots the GraphGist's fields under a fresh identifier and re-points every
/// reference relationship (authors, categories, images) at the new candidate.
pub async fn resolve_candidate<T: GraphTxn>(txn: &mut T, graph_gist_uuid: Uuid) -> Result<CandidateId> {
    let graph_gist = txn
        .find_graph_gist(graph_gist_uuid)
        .await?
        .ok_or(GraphError::NotFound(graph_gist_uuid))?;

    if let Some(existing) = txn.find_candidate_id(graph_gist_uuid).await? {
        debug!(graph_gist = %graph_gist_uuid, candidate = %existing, "Reusing candidate");
        return Ok(CandidateId(existing));
    }

    let candidate = GraphGistCandidate::draft_of(&graph_gist);
    let merged = txn.merge_candidate(graph_gist_uuid, &candidate).await?;
    if merged != candidate.uuid {
        // Another transaction committed its candidate between our lookup and the merge.
        return Err(GraphError::Conflict(graph_gist_uuid));
    }

    let mut shared = 0;
    for rel in ReferenceRelationship::ALL {
        shared += txn
            .duplicate_relationships(graph_gist_uuid, candidate.uuid, rel)
            .await?;
    }

    info!(
        graph_gist = %graph_gist_uuid,
        candidate = %candidate.uuid,
        shared_references = shared,
        "Created candidate"
    );
    Ok(CandidateId(candidate.uuid))
}

/// Entry point for callers: resolves a candidate in its own transaction.
pub struct CandidateService<S> {
    runner: TransactionRunner<S>,
}

impl<S: GraphStore> CandidateService<S> {
    pub fn new(store: S) -> Self {
        Self {
            runner: TransactionRunner::new(store),
        }
    }

    /// Idempotent: every call for the same GraphGist yields the same candidate.
    /// A lost creation race is retried once, where the lookup finds the winner's draft.
    pub async fn get_or_create_candidate(&self, graph_gist_uuid: Uuid) -> Result<CandidateId> {
        match self.attempt(graph_gist_uuid).await {
            Err(GraphError::Conflict(_)) => {
                warn!(graph_gist = %graph_gist_uuid, "Candidate creation raced, retrying lookup");
                self.attempt(graph_gist_uuid).await
            }
            other => other,
        }
    }

    async fn attempt(&self, graph_gist_uuid: Uuid) -> Result<CandidateId> {
        self.runner
            .with_transaction(|txn| Box::pin(resolve_candidate(txn, graph_gist_uuid)))
            .await
    }
}
