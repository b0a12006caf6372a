use crate::error::TutorResult;
use crate::knowledge::KnowledgeBase;

/// Durable backing resource for a [`KnowledgeBase`].
pub trait KnowledgeStore {
    /// Read the whole knowledge base. Missing, unreadable or malformed
    /// resources are `TutorError::Storage`.
    fn load(&self) -> TutorResult<KnowledgeBase>;

    /// Overwrite the resource with the full current sequence.
    fn save(&self, kb: &KnowledgeBase) -> TutorResult<()>;
}
