//! Integration tests for candidate resolution against a real Neo4j.
//!
//! Verifies that:
//! - Repeated calls resolve to the same candidate
//! - Fields are copied, the identifier is not
//! - Authors, categories and images are shared, not cloned
//! - Concurrent callers end up with exactly one candidate
//!
//! Requirements: Docker (for Neo4j via testcontainers)
//!
//! Run with: cargo test -p graphgist-graph --features test-utils --test candidate_test

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use graphgist_common::{ReferenceRelationship, CANDIDATE_LABEL, GRAPH_GIST_LABEL};
use graphgist_graph::{
    query, CandidateService, GraphClient, GraphError, GraphGistReader, Neo4jStore,
};

async fn setup() -> (impl std::any::Any, GraphClient) {
    graphgist_graph::testutil::neo4j_container().await
}

async fn create_graph_gist(client: &GraphClient, title: &str, slug: &str) -> Uuid {
    let id = Uuid::new_v4();
    let q = query(
        "CREATE (:GraphGist {
            uuid: $uuid,
            title: $title,
            slug: $slug,
            asciidoc: '= ' + $title,
            summary: 'A sample graph',
            status: 'live',
            featured: true,
            is_guide: false
        })",
    )
    .param("uuid", id.to_string())
    .param("title", title)
    .param("slug", slug);
    client.inner().run(q).await.expect("Failed to create GraphGist");
    id
}

/// Create a reference node with `label` and attach it to the GraphGist via `rel`.
async fn attach(
    client: &GraphClient,
    graph_gist: Uuid,
    rel: ReferenceRelationship,
    label: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    let t = rel.rel_type();
    let pattern = match rel {
        ReferenceRelationship::Wrote => format!("(r)-[:{t}]->(g)"),
        _ => format!("(g)-[:{t}]->(r)"),
    };
    let cypher = format!(
        "MATCH (g:GraphGist {{uuid: $gist}})
         CREATE (r:{label} {{uuid: $uuid}})
         CREATE {pattern}"
    );
    let q = query(&cypher)
        .param("gist", graph_gist.to_string())
        .param("uuid", id.to_string());
    client.inner().run(q).await.expect("Failed to attach reference");
    id
}

async fn count(client: &GraphClient, cypher: &str) -> i64 {
    let mut stream = client.inner().execute(query(cypher)).await.unwrap();
    let row = stream.next().await.unwrap().expect("No result row");
    row.get("n").unwrap()
}

#[tokio::test]
async fn northwind_candidate_is_created_once_and_shares_references() {
    let (_container, client) = setup().await;
    let gist = create_graph_gist(&client, "Northwind", "northwind").await;
    let author = attach(&client, gist, ReferenceRelationship::Wrote, "Person").await;
    let img1 = attach(&client, gist, ReferenceRelationship::HasImage, "Image").await;
    let img2 = attach(&client, gist, ReferenceRelationship::HasImage, "Image").await;

    let service = CandidateService::new(Neo4jStore::new(client.clone()));
    let reader = GraphGistReader::new(client.clone());

    let d1 = service.get_or_create_candidate(gist).await.unwrap();
    assert_ne!(d1.0, gist);

    let draft = reader.candidate_by_uuid(d1.0).await.unwrap().expect("draft exists");
    let canonical = reader.graph_gist_by_uuid(gist).await.unwrap().unwrap();
    assert_eq!(draft.fields, canonical.fields);
    assert_eq!(draft.fields.title, "Northwind");

    let authors = reader
        .reference_ids(CANDIDATE_LABEL, d1.0, ReferenceRelationship::Wrote)
        .await
        .unwrap();
    assert_eq!(authors, vec![author]);

    let mut images = reader
        .reference_ids(CANDIDATE_LABEL, d1.0, ReferenceRelationship::HasImage)
        .await
        .unwrap();
    images.sort();
    let mut expected = vec![img1, img2];
    expected.sort();
    assert_eq!(images, expected);

    let nodes_before = count(&client, "MATCH (n) RETURN count(n) AS n").await;
    let rels_before = count(&client, "MATCH ()-[r]->() RETURN count(r) AS n").await;

    let again = service.get_or_create_candidate(gist).await.unwrap();
    assert_eq!(again, d1);
    assert_eq!(count(&client, "MATCH (n) RETURN count(n) AS n").await, nodes_before);
    assert_eq!(
        count(&client, "MATCH ()-[r]->() RETURN count(r) AS n").await,
        rels_before
    );
}

#[tokio::test]
async fn stored_values_are_copied_exactly() {
    let (_container, client) = setup().await;
    let gist = Uuid::new_v4();
    let q = query(
        "CREATE (:GraphGist {
            uuid: $uuid,
            title: 'Empty Summary',
            slug: 'empty-summary',
            asciidoc: '',
            summary: '',
            status: '',
            created_at: datetime('2021-03-14T09:26:53Z')
        })",
    )
    .param("uuid", gist.to_string());
    client.inner().run(q).await.expect("Failed to create GraphGist");

    let service = CandidateService::new(Neo4jStore::new(client.clone()));
    let draft = service.get_or_create_candidate(gist).await.unwrap();

    let q = query(
        "MATCH (g:GraphGist {uuid: $uuid})<-[:IS_VERSION]-(c:GraphGistCandidate)
         RETURN c.summary = '' AND c.status = '' AS empty_strings_kept,
                c.created_at = g.created_at AS same_created_at,
                c.featured IS NULL AND c.is_guide IS NULL AS absent_stays_absent,
                c.uuid <> g.uuid AS own_uuid",
    )
    .param("uuid", gist.to_string());
    let mut stream = client.inner().execute(q).await.unwrap();
    let row = stream.next().await.unwrap().expect("candidate exists");
    assert!(row.get::<bool>("empty_strings_kept").unwrap());
    assert!(row.get::<bool>("same_created_at").unwrap());
    assert!(row.get::<bool>("absent_stays_absent").unwrap());
    assert!(row.get::<bool>("own_uuid").unwrap());

    let reader = GraphGistReader::new(client.clone());
    let candidate = reader.candidate_by_uuid(draft.0).await.unwrap().unwrap();
    let canonical = reader.graph_gist_by_uuid(gist).await.unwrap().unwrap();
    assert_eq!(candidate.fields, canonical.fields);
    assert_eq!(candidate.fields.summary.as_deref(), Some(""));
    assert!(candidate.fields.created_at.is_some());
}

#[tokio::test]
async fn every_reference_type_is_duplicated() {
    let (_container, client) = setup().await;
    let gist = create_graph_gist(&client, "Fraud Detection", "fraud-detection").await;
    attach(&client, gist, ReferenceRelationship::ForChallenge, "Challenge").await;
    attach(&client, gist, ReferenceRelationship::ForIndustry, "Industry").await;
    attach(&client, gist, ReferenceRelationship::ForUseCase, "UseCase").await;
    attach(&client, gist, ReferenceRelationship::ForUseCase, "UseCase").await;

    let service = CandidateService::new(Neo4jStore::new(client.clone()));
    let reader = GraphGistReader::new(client.clone());
    let draft = service.get_or_create_candidate(gist).await.unwrap();

    for rel in ReferenceRelationship::ALL {
        let from_gist = reader
            .reference_ids(GRAPH_GIST_LABEL, gist, rel)
            .await
            .unwrap();
        let from_draft = reader
            .reference_ids(CANDIDATE_LABEL, draft.0, rel)
            .await
            .unwrap();
        assert_eq!(from_draft, from_gist, "{rel}");
    }
}

#[tokio::test]
async fn guide_lookup_tries_slug_then_uuid() {
    let (_container, client) = setup().await;
    let gist = create_graph_gist(&client, "Bank Fraud", "bank-fraud").await;
    let reader = GraphGistReader::new(client.clone());

    let by_slug = reader.graph_gist("bank-fraud").await.unwrap().unwrap();
    assert_eq!(by_slug.uuid, gist);

    let by_uuid = reader.graph_gist(&gist.to_string()).await.unwrap().unwrap();
    assert_eq!(by_uuid.fields.slug, "bank-fraud");

    assert!(reader.graph_gist("no-such-guide").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_graph_gist_is_not_found() {
    let (_container, client) = setup().await;
    let service = CandidateService::new(Neo4jStore::new(client.clone()));
    let missing = Uuid::new_v4();

    let err = service.get_or_create_candidate(missing).await.unwrap_err();

    assert!(matches!(err, GraphError::NotFound(id) if id == missing));
    assert_eq!(
        count(&client, "MATCH (c:GraphGistCandidate) RETURN count(c) AS n").await,
        0
    );
}

#[tokio::test]
async fn concurrent_callers_share_one_candidate() {
    let (_container, client) = setup().await;
    let gist = create_graph_gist(&client, "Movies", "movies").await;
    attach(&client, gist, ReferenceRelationship::Wrote, "Person").await;
    attach(&client, gist, ReferenceRelationship::HasImage, "Image").await;

    let service = Arc::new(CandidateService::new(Neo4jStore::new(client.clone())));
    let calls = (0..6).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.get_or_create_candidate(gist).await })
    });
    let ids: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(ids.iter().all(|id| *id == ids[0]));
    let q = query(
        "MATCH (g:GraphGist {uuid: $uuid})<-[:IS_VERSION]-(c:GraphGistCandidate)
         RETURN count(c) AS n",
    )
    .param("uuid", gist.to_string());
    let mut stream = client.inner().execute(q).await.unwrap();
    let row = stream.next().await.unwrap().unwrap();
    let n: i64 = row.get("n").unwrap();
    assert_eq!(n, 1);

    let images = count(
        &client,
        "MATCH (:GraphGistCandidate)-[r:HAS_IMAGE]->() RETURN count(r) AS n",
    )
    .await;
    assert_eq!(images, 1);
}
