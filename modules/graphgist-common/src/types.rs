use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Graph labels ---

pub const GRAPH_GIST_LABEL: &str = "GraphGist";
pub const CANDIDATE_LABEL: &str = "GraphGistCandidate";

/// Draft-of-canonical lineage: `(candidate)-[:IS_VERSION]->(graph_gist)`.
pub const IS_VERSION: &str = "IS_VERSION";

/// Scalar properties shared by a published GraphGist and its candidate.
///
/// The identifier is deliberately not part of this struct: copying fields from a
/// GraphGist onto a candidate can never carry the canonical `uuid` across.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphGistFields {
    pub title: String,
    pub slug: String,
    pub asciidoc: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub featured: bool,
    pub is_guide: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GraphGistFields {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            asciidoc: String::new(),
            summary: None,
            status: None,
            featured: false,
            is_guide: false,
            created_at: None,
            updated_at: None,
        }
    }
}

/// The published, authoritative version of a piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphGist {
    pub uuid: Uuid,
    #[serde(flatten)]
    pub fields: GraphGistFields,
}

/// An editable draft of a GraphGist, linked back to it by `IS_VERSION`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphGistCandidate {
    pub uuid: Uuid,
    #[serde(flatten)]
    pub fields: GraphGistFields,
}

impl GraphGistCandidate {
    /// Snapshot a GraphGist under a freshly generated identifier.
    pub fn draft_of(graph_gist: &GraphGist) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            fields: graph_gist.fields.clone(),
        }
    }
}

/// Identifier handed back by candidate resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which end of a relationship the content node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(content)-[:REL]->(reference)`
    Outgoing,
    /// `(reference)-[:REL]->(content)`
    Incoming,
}

/// Reference relationships a candidate shares with its GraphGist.
///
/// The referenced nodes (authors, categories, images) are never cloned, only re-pointed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceRelationship {
    Wrote,
    ForChallenge,
    ForIndustry,
    ForUseCase,
    HasImage,
}

impl ReferenceRelationship {
    pub const ALL: [ReferenceRelationship; 5] = [
        ReferenceRelationship::Wrote,
        ReferenceRelationship::ForChallenge,
        ReferenceRelationship::ForIndustry,
        ReferenceRelationship::ForUseCase,
        ReferenceRelationship::HasImage,
    ];

    pub fn rel_type(self) -> &'static str {
        match self {
            ReferenceRelationship::Wrote => "WROTE",
            ReferenceRelationship::ForChallenge => "FOR_CHALLENGE",
            ReferenceRelationship::ForIndustry => "FOR_INDUSTRY",
            ReferenceRelationship::ForUseCase => "FOR_USE_CASE",
            ReferenceRelationship::HasImage => "HAS_IMAGE",
        }
    }

    /// Authors point at what they wrote; everything else hangs off the content node.
    pub fn direction(self) -> Direction {
        match self {
            ReferenceRelationship::Wrote => Direction::Incoming,
            _ => Direction::Outgoing,
        }
    }
}

impl fmt::Display for ReferenceRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_type())
    }
}
