use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// KnowledgeEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// Append-only, insertion-ordered list of question/answer pairs.
///
/// Serializes as `{"questions": [{"question": .., "answer": ..}, ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    questions: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { questions: entries }
    }

    /// Duplicate questions are allowed; lookups resolve to the first one.
    pub fn append(&mut self, entry: KnowledgeEntry) {
        self.questions.push(entry);
    }

    /// Undo the most recent append. Used when a learned entry could not be
    /// persisted.
    pub fn rollback_last(&mut self) -> Option<KnowledgeEntry> {
        self.questions.pop()
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.questions
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|e| e.question.as_str())
    }

    /// Answer of the first entry whose question equals `question` exactly.
    pub fn answer_for(&self, question: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.answer.as_str())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Outcome of resolving a normalized query against the knowledge base.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Found {
        question: &'a str,
        answer: &'a str,
        score: f64,
    },
    NotFound,
}

impl Lookup<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Found { answer, .. } => Some(answer),
            Self::NotFound => None,
        }
    }
}
