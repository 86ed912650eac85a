use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::{query, Query, Row};
use tracing::debug;
use uuid::Uuid;

use graphgist_common::{
    Direction, GraphGist, GraphGistCandidate, GraphGistFields, ReferenceRelationship,
    CANDIDATE_LABEL, GRAPH_GIST_LABEL, IS_VERSION,
};

use crate::error::{GraphError, Result};
use crate::store::{GraphStore, GraphTxn};
use crate::GraphClient;

/// `GraphStore` backed by a pooled Neo4j connection.
#[derive(Clone)]
pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    type Txn = Neo4jTxn;

    async fn begin(&self) -> Result<Neo4jTxn> {
        let txn = self.client.graph.start_txn().await?;
        Ok(Neo4jTxn { txn })
    }
}

/// An explicit bolt transaction holding one pooled connection until it is consumed.
pub struct Neo4jTxn {
    txn: neo4rs::Txn,
}

impl Neo4jTxn {
    /// Execute a statement and return its first row, draining the rest of the stream.
    async fn first_row(&mut self, q: Query) -> std::result::Result<Option<Row>, neo4rs::Error> {
        let mut stream = self.txn.execute(q).await?;
        let first = stream.next(self.txn.handle()).await?;
        while stream.next(self.txn.handle()).await?.is_some() {}
        Ok(first)
    }
}

#[async_trait]
impl GraphTxn for Neo4jTxn {
    async fn find_graph_gist(&mut self, uuid: Uuid) -> Result<Option<GraphGist>> {
        let cypher = format!(
            "MATCH (n:{GRAPH_GIST_LABEL} {{uuid: $uuid}}) RETURN {FIELD_PROJECTION}"
        );
        let row = self
            .first_row(query(&cypher).param("uuid", uuid.to_string()))
            .await?;
        Ok(row.map(|row| GraphGist {
            uuid,
            fields: fields_from_row(&row),
        }))
    }

    async fn find_candidate_id(&mut self, graph_gist: Uuid) -> Result<Option<Uuid>> {
        let cypher = format!(
            "MATCH (g:{GRAPH_GIST_LABEL} {{uuid: $uuid}})<-[:{IS_VERSION}]-(c:{CANDIDATE_LABEL})
             RETURN c.uuid AS uuid"
        );
        let row = self
            .first_row(query(&cypher).param("uuid", graph_gist.to_string()))
            .await?;
        row.map(|row| uuid_from_row(&row, "uuid")).transpose()
    }

    async fn merge_candidate(
        &mut self,
        graph_gist: Uuid,
        candidate: &GraphGistCandidate,
    ) -> Result<Uuid> {
        // Writing to g takes its write lock until commit, so concurrent creators
        // queue on the canonical node and the loser's MERGE matches the winner's draft.
        // Fields are copied node-to-node so values keep their stored Neo4j types;
        // uuid is assigned last.
        let copy = COPIED_FIELDS
            .iter()
            .map(|f| format!("c.{f} = g.{f}"))
            .collect::<Vec<_>>()
            .join(", ");
        let cypher = format!(
            "MATCH (g:{GRAPH_GIST_LABEL} {{uuid: $uuid}})
             SET g._candidate_lock = true
             REMOVE g._candidate_lock
             WITH g
             MERGE (c:{CANDIDATE_LABEL})-[:{IS_VERSION}]->(g)
             ON CREATE SET {copy}, c.uuid = $candidate_uuid
             RETURN c.uuid AS uuid"
        );
        let q = query(&cypher)
            .param("uuid", graph_gist.to_string())
            .param("candidate_uuid", candidate.uuid.to_string());

        let row = self
            .first_row(q)
            .await
            .map_err(|e| GraphError::from_write(e, graph_gist))?;

        match row {
            Some(row) => uuid_from_row(&row, "uuid"),
            None => Err(GraphError::Storage(format!(
                "GraphGist {graph_gist} disappeared before its candidate could be created"
            ))),
        }
    }

    async fn duplicate_relationships(
        &mut self,
        graph_gist: Uuid,
        candidate: Uuid,
        rel: ReferenceRelationship,
    ) -> Result<u64> {
        let cypher = duplicate_cypher(rel);
        let q = query(&cypher)
            .param("uuid", graph_gist.to_string())
            .param("candidate_uuid", candidate.to_string());

        let row = self
            .first_row(q)
            .await
            .map_err(|e| GraphError::from_write(e, graph_gist))?;
        let created: i64 = row.and_then(|r| r.get("created").ok()).unwrap_or(0);
        debug!(%graph_gist, %candidate, rel = rel.rel_type(), created, "Duplicated relationships");
        Ok(created as u64)
    }

    async fn commit(self) -> Result<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

/// Build the per-type "match endpoints, create equivalent edges" statement.
/// Relationship types come from a closed enum, never from caller input.
fn duplicate_cypher(rel: ReferenceRelationship) -> String {
    let t = rel.rel_type();
    let (from_gist, from_candidate) = match rel.direction() {
        Direction::Outgoing => (format!("-[:{t}]->"), format!("-[:{t}]->")),
        Direction::Incoming => (format!("<-[:{t}]-"), format!("<-[:{t}]-")),
    };
    format!(
        "MATCH (g:{GRAPH_GIST_LABEL} {{uuid: $uuid}}){from_gist}(p)
         MATCH (c:{CANDIDATE_LABEL} {{uuid: $candidate_uuid}})
         CREATE (c){from_candidate}(p)
         RETURN count(*) AS created"
    )
}

/// Column list shared by every read of GraphGist-shaped nodes bound to `n`.
pub(crate) const FIELD_PROJECTION: &str = "n.uuid AS uuid, n.title AS title, n.slug AS slug, \
     n.asciidoc AS asciidoc, n.summary AS summary, n.status AS status, \
     n.featured AS featured, n.is_guide AS is_guide, \
     toString(n.created_at) AS created_at, toString(n.updated_at) AS updated_at";

pub(crate) fn fields_from_row(row: &Row) -> GraphGistFields {
    GraphGistFields {
        title: row.get("title").unwrap_or_default(),
        slug: row.get("slug").unwrap_or_default(),
        asciidoc: row.get("asciidoc").unwrap_or_default(),
        summary: row.get::<String>("summary").ok(),
        status: row.get::<String>("status").ok(),
        featured: row.get("featured").unwrap_or(false),
        is_guide: row.get("is_guide").unwrap_or(false),
        created_at: row
            .get::<String>("created_at")
            .ok()
            .and_then(|s| parse_datetime(&s)),
        updated_at: row
            .get::<String>("updated_at")
            .ok()
            .and_then(|s| parse_datetime(&s)),
    }
}

pub(crate) fn uuid_from_row(row: &Row, key: &str) -> Result<Uuid> {
    let raw: String = row
        .get(key)
        .map_err(|e| GraphError::Storage(format!("missing {key}: {e}")))?;
    Uuid::parse_str(&raw).map_err(|e| GraphError::Storage(format!("malformed {key} {raw:?}: {e}")))
}

/// Scalar properties carried from a GraphGist onto its candidate. `uuid` is never listed.
pub(crate) const COPIED_FIELDS: [&str; 9] = [
    "title",
    "slug",
    "asciidoc",
    "summary",
    "status",
    "featured",
    "is_guide",
    "created_at",
    "updated_at",
];

/// Accepts RFC 3339 and Neo4j's `toString(datetime)` form, which may carry a `[Zone/Id]` suffix.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.split('[').next().unwrap_or(s);
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
