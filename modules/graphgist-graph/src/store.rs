use async_trait::async_trait;
use uuid::Uuid;

use graphgist_common::{GraphGist, GraphGistCandidate, ReferenceRelationship};

use crate::error::Result;

/// Session factory for the property graph. Each `begin` opens one unit of work.
#[async_trait]
pub trait GraphStore: Send + Sync {
    type Txn: GraphTxn;

    async fn begin(&self) -> Result<Self::Txn>;
}

/// One open transaction. Consuming `commit` or `rollback` releases the session.
#[async_trait]
pub trait GraphTxn: Send + 'static {
    /// Load a GraphGist by identifier.
    async fn find_graph_gist(&mut self, uuid: Uuid) -> Result<Option<GraphGist>>;

    /// Identifier of the candidate linked to `graph_gist` by `IS_VERSION`, if any.
    async fn find_candidate_id(&mut self, graph_gist: Uuid) -> Result<Option<Uuid>>;

    /// Match-or-create the candidate linked to `graph_gist`. A created node receives the
    /// GraphGist's scalar fields (as in `candidate`) and then `candidate.uuid`. Returns the
    /// identifier on the resulting node, which differs from `candidate.uuid` when another
    /// transaction created it first.
    async fn merge_candidate(
        &mut self,
        graph_gist: Uuid,
        candidate: &GraphGistCandidate,
    ) -> Result<Uuid>;

    /// For every node related to `graph_gist` by `rel`, create the same relationship
    /// between that node and `candidate`. Returns the number of relationships created.
    async fn duplicate_relationships(
        &mut self,
        graph_gist: Uuid,
        candidate: Uuid,
        rel: ReferenceRelationship,
    ) -> Result<u64>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
