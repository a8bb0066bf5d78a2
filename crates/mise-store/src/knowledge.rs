//! Recipe knowledge base consulted by the chef agent.
//!
//! Retrieval is keyword based: a document scores one point per occurrence of
//! each query term in its title or body (case-insensitive). Ties keep
//! insertion order.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::store::parse_dt;
use crate::{RecipeStore, Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeDocument {
    /// Occurrences of the query terms in title and body.
    pub fn score(&self, terms: &[String]) -> usize {
        let haystack = format!("{}\n{}", self.title, self.body).to_lowercase();
        terms
            .iter()
            .map(|term| haystack.matches(term.as_str()).count())
            .sum()
    }
}

pub trait KnowledgeBase: Send + Sync {
    /// Up to `k` documents most relevant to `query`, best first.
    fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeDocument>>;

    fn add_document(
        &self,
        title: &str,
        body: &str,
        source: Option<&str>,
    ) -> Result<KnowledgeDocument>;
}

/// Lowercased query terms, ignoring one-letter words and punctuation.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

impl KnowledgeBase for RecipeStore {
    fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeDocument>> {
        let terms = query_terms(query);
        if terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, body, source, created_at FROM knowledge_documents ORDER BY id",
        )?;
        let iter = stmt.query_map([], |row| {
            Ok(KnowledgeDocument {
                id: row.get(0)?,
                title: row.get(1)?,
                body: row.get(2)?,
                source: row.get(3)?,
                created_at: parse_dt(&row.get::<_, String>(4)?),
            })
        })?;

        let mut scored = Vec::new();
        for doc in iter {
            let doc = doc?;
            let score = doc.score(&terms);
            if score > 0 {
                scored.push((score, doc));
            }
        }
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, doc)| doc).collect())
    }

    fn add_document(
        &self,
        title: &str,
        body: &str,
        source: Option<&str>,
    ) -> Result<KnowledgeDocument> {
        if body.trim().is_empty() {
            return Err(StoreError::Invalid {
                field: "document body",
                reason: "must not be empty".to_string(),
            });
        }
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO knowledge_documents (title, body, source, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, body, source, now.to_rfc3339()],
        )?;
        Ok(KnowledgeDocument {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            body: body.to_string(),
            source: source.map(String::from),
            created_at: now,
        })
    }
}
