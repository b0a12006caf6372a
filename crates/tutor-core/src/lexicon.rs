//! Dictionary-backed lemmatizer.
//!
//! Input is split on Unicode word boundaries, whitespace segments are
//! dropped, and every remaining token is lowercased and replaced by its
//! lemma when the dictionary knows it. Punctuation survives as its own
//! token, so `"What is your name?"` becomes `"what be your name ?"`.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{TutorError, TutorResult};
use crate::normalizer::TextNormalizer;

const BUILTIN_LEXICON: &str = include_str!("../data/lemmas.tsv");

pub struct LexiconNormalizer {
    lemmas: HashMap<String, String>,
}

impl LexiconNormalizer {
    /// The English dictionary compiled into the crate.
    pub fn builtin() -> TutorResult<Self> {
        Self::parse(BUILTIN_LEXICON, "built-in lexicon")
    }

    /// Load an external `form<TAB>lemma` dictionary.
    pub fn from_path(path: &Path) -> TutorResult<Self> {
        let src = std::fs::read_to_string(path).map_err(|e| {
            TutorError::NormalizationUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&src, &path.display().to_string())
    }

    pub fn parse(src: &str, origin: &str) -> TutorResult<Self> {
        let mut lemmas = HashMap::new();

        for (idx, line) in src.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (form, lemma) = match line.split_once('\t') {
                Some((f, l)) if !f.trim().is_empty() && !l.trim().is_empty() => {
                    (fold_token(f.trim()), l.trim().to_lowercase())
                }
                _ => {
                    return Err(TutorError::NormalizationUnavailable(format!(
                        "{origin}:{}: expected `form<TAB>lemma`",
                        idx + 1
                    )))
                }
            };
            lemmas.insert(form, lemma);
        }

        if lemmas.is_empty() {
            return Err(TutorError::NormalizationUnavailable(format!(
                "{origin}: no entries"
            )));
        }

        // A lemma that is itself an inflected form would make a second
        // normalization pass rewrite the first pass's output.
        for (form, lemma) in &lemmas {
            if let Some(token) = lemma.split_whitespace().find(|t| lemmas.contains_key(*t)) {
                return Err(TutorError::NormalizationUnavailable(format!(
                    "{origin}: lemma `{lemma}` of `{form}` contains the inflected form `{token}`"
                )));
            }
        }

        debug!("loaded {} lemmas from {origin}", lemmas.len());
        Ok(Self { lemmas })
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }
}

fn fold_token(token: &str) -> String {
    token.to_lowercase().replace('\u{2019}', "'")
}

impl TextNormalizer for LexiconNormalizer {
    fn normalize(&self, raw: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        for segment in raw.split_word_bounds() {
            if segment.trim().is_empty() {
                continue;
            }
            let token = fold_token(segment);
            match self.lemmas.get(&token) {
                Some(lemma) => out.push(lemma.clone()),
                None => out.push(token),
            }
        }
        out.join(" ")
    }
}
