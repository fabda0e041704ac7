//! Question answering over the document graph
//!
//! Structural questions ("children of Chapter 9") are answered from the
//! hierarchy directly. Everything else is handed to an external answer
//! generator together with retrieved context.

mod classifier;
mod relationship;
mod subject;

pub use classifier::{PatternClassifier, QueryClassifier, QueryKind};
pub use relationship::{answer_relationship, Relation, StructuralAnswer};
pub use subject::extract_subject;

use crate::retrieval::{ContextItem, RetrievalEngine};
use crate::storage::GraphStore;
use crate::AtlasError;
use async_trait::async_trait;
use tracing::{debug, info};

/// Produces answer text from a query and its retrieved context
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, context: &[ContextItem]) -> Result<String, AtlasError>;
}

/// A routed answer
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,

    /// Retrieved context the text was generated from; empty for structural answers
    pub sources: Vec<ContextItem>,

    /// Which path produced the answer
    pub path: QueryKind,
}

/// Routes each query to the structural or the content path
pub struct QueryRouter<'a, S: ?Sized, G: ?Sized> {
    retrieval: RetrievalEngine<'a, S>,
    generator: &'a G,
    classifier: Box<dyn QueryClassifier>,
}

impl<'a, S, G> QueryRouter<'a, S, G>
where
    S: GraphStore + ?Sized,
    G: AnswerGenerator + ?Sized,
{
    pub fn new(retrieval: RetrievalEngine<'a, S>, generator: &'a G) -> Self {
        Self {
            retrieval,
            generator,
            classifier: Box::new(PatternClassifier),
        }
    }

    /// Replaces the default pattern classifier
    pub fn with_classifier(mut self, classifier: Box<dyn QueryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Answers `query`
    ///
    /// Relationship queries whose subject matches no document title fall
    /// back to the content path.
    pub async fn ask(&self, query: &str) -> Result<Answer, AtlasError> {
        let kind = self.classifier.classify(query);
        debug!("Classified {:?} as {}", query, kind);

        if kind == QueryKind::Relationship {
            match answer_relationship(query, self.retrieval.store())? {
                Some(answer) => {
                    return Ok(Answer {
                        text: answer.to_markdown(),
                        sources: Vec::new(),
                        path: QueryKind::Relationship,
                    })
                }
                None => info!("No document matches the subject of {:?}, using content search", query),
            }
        }

        let sources = self.retrieval.retrieve(query)?;
        let text = self.generator.generate(query, &sources).await?;

        Ok(Answer {
            text,
            sources,
            path: QueryKind::Content,
        })
    }
}

/// Formats context items as numbered, titled blocks for a prompt
pub fn render_context(items: &[ContextItem]) -> String {
    if items.is_empty() {
        return "No relevant documents found.".to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let title = if item.title.is_empty() {
                "Untitled"
            } else {
                &item.title
            };
            format!("[{}] **{}**\n{}\n{}", i + 1, title, item.address, item.excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
