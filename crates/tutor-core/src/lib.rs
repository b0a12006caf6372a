pub mod error;
pub mod evaluate;
pub mod knowledge;
pub mod lexicon;
pub mod matcher;
pub mod normalizer;
pub mod store;

pub use error::{TutorError, TutorResult};
pub use evaluate::{evaluate, Evaluation, EvaluationMetrics};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, Lookup};
pub use lexicon::LexiconNormalizer;
pub use matcher::{ratio, Matcher, ScoredMatch, Similarity, DEFAULT_CUTOFF};
pub use normalizer::{SimpleNormalizer, TextNormalizer};
pub use store::KnowledgeStore;
