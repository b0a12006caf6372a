//! Top-1 fuzzy matching of a normalized query against known questions.
//!
//! The default measure is the Ratcliff/Obershelp ratio `2*M / (|a| + |b|)`,
//! where `M` counts the characters in the matching blocks found by taking
//! the longest common run and recursing on either side of it.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::error::{TutorError, TutorResult};
use crate::knowledge::{KnowledgeBase, Lookup};

pub const DEFAULT_CUTOFF: f64 = 0.55;

/// Query length from which very frequent characters stop anchoring blocks.
const AUTOJUNK_MIN_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Similarity {
    #[default]
    RatcliffObershelp,
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RatcliffObershelp => write!(f, "ratcliff-obershelp"),
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::JaroWinkler => write!(f, "jaro-winkler"),
            Self::SorensenDice => write!(f, "sorensen-dice"),
        }
    }
}

impl std::str::FromStr for Similarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ratcliff-obershelp" | "ratcliff_obershelp" | "ratio" => Ok(Self::RatcliffObershelp),
            "levenshtein" => Ok(Self::Levenshtein),
            "jaro-winkler" | "jaro_winkler" => Ok(Self::JaroWinkler),
            "sorensen-dice" | "sorensen_dice" => Ok(Self::SorensenDice),
            _ => Err(format!("invalid similarity: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Ratcliff/Obershelp
// ---------------------------------------------------------------------------

/// Query side of a Ratcliff/Obershelp comparison, indexed once and reused
/// against every candidate.
struct QueryIndex {
    chars: Vec<char>,
    /// Positions of each character in the query, ascending. Popular
    /// characters of long queries are left out.
    positions: HashMap<char, Vec<usize>>,
    counts: HashMap<char, usize>,
}

impl QueryIndex {
    fn new(query: &str) -> Self {
        let chars: Vec<char> = query.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        let mut counts: HashMap<char, usize> = HashMap::new();
        for (j, &c) in chars.iter().enumerate() {
            positions.entry(c).or_default().push(j);
            *counts.entry(c).or_default() += 1;
        }

        let n = chars.len();
        if n >= AUTOJUNK_MIN_LEN {
            let limit = n / 100 + 1;
            positions.retain(|_, idx| idx.len() <= limit);
        }

        Self {
            chars,
            positions,
            counts,
        }
    }

    /// Upper bound on `ratio`: size of the character multiset intersection.
    fn quick_ratio(&self, a: &[char]) -> f64 {
        let mut avail: HashMap<char, isize> = HashMap::new();
        let mut matches = 0usize;
        for c in a {
            let left = avail
                .entry(*c)
                .or_insert_with(|| self.counts.get(c).copied().unwrap_or(0) as isize);
            if *left > 0 {
                matches += 1;
            }
            *left -= 1;
        }
        scale(matches, a.len() + self.chars.len())
    }

    fn ratio(&self, a: &[char]) -> f64 {
        scale(self.matching_chars(a), a.len() + self.chars.len())
    }

    fn matching_chars(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, a.len(), 0, self.chars.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` within the given bounds;
    /// earliest in `a`, then earliest in `b`, on ties.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let b = &self.chars;
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0usize);

        // run length of the match ending at b[j], for the previous row of a
        let mut prev: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut cur: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.positions.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|p| prev.get(&p))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    cur.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            prev = cur;
        }

        // Popular characters never anchor a block but may still extend one.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi && best_j + best_k < bhi && a[best_i + best_k] == b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}

fn scale(matches: usize, length: usize) -> f64 {
    if length == 0 {
        1.0
    } else {
        2.0 * matches as f64 / length as f64
    }
}

/// Ratcliff/Obershelp similarity of two strings, in `[0, 1]`.
pub fn ratio(candidate: &str, query: &str) -> f64 {
    let a: Vec<char> = candidate.chars().collect();
    QueryIndex::new(query).ratio(&a)
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch<'a> {
    pub candidate: &'a str,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    cutoff: f64,
    similarity: Similarity,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            similarity: Similarity::default(),
        }
    }
}

impl Matcher {
    pub fn new(cutoff: f64, similarity: Similarity) -> TutorResult<Self> {
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(TutorError::Config(format!(
                "match cutoff must be within [0, 1], got {cutoff}"
            )));
        }
        Ok(Self { cutoff, similarity })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// Highest-scoring candidate with `score >= cutoff`. Ties keep the
    /// candidate seen first.
    pub fn best_match<'a, I>(&self, query: &str, candidates: I) -> Option<ScoredMatch<'a>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let index = match self.similarity {
            Similarity::RatcliffObershelp => Some(QueryIndex::new(query)),
            _ => None,
        };
        let mut best: Option<ScoredMatch<'a>> = None;

        for candidate in candidates {
            let score = match &index {
                Some(index) => {
                    let a: Vec<char> = candidate.chars().collect();
                    let bound = index.quick_ratio(&a);
                    if bound < self.cutoff || best.is_some_and(|b| bound <= b.score) {
                        continue;
                    }
                    index.ratio(&a)
                }
                None => self.score(candidate, query),
            };

            if score < self.cutoff {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(ScoredMatch { candidate, score });
            }
        }

        match &best {
            Some(m) => debug!("best match {:?} scored {:.3}", m.candidate, m.score),
            None => debug!("no candidate reached cutoff {}", self.cutoff),
        }
        best
    }

    /// Similarity of a single pair under the configured measure.
    pub fn score(&self, candidate: &str, query: &str) -> f64 {
        match self.similarity {
            Similarity::RatcliffObershelp => ratio(candidate, query),
            Similarity::Levenshtein => strsim::normalized_levenshtein(candidate, query),
            Similarity::JaroWinkler => strsim::jaro_winkler(candidate, query),
            Similarity::SorensenDice => strsim::sorensen_dice(candidate, query),
        }
    }

    /// Match `query` against the knowledge base and resolve the answer of
    /// the first entry carrying the matched question.
    pub fn lookup<'a>(&self, query: &str, kb: &'a KnowledgeBase) -> Lookup<'a> {
        let Some(m) = self.best_match(query, kb.questions()) else {
            return Lookup::NotFound;
        };
        match kb.answer_for(m.candidate) {
            Some(answer) => Lookup::Found {
                question: m.candidate,
                answer,
                score: m.score,
            },
            None => Lookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeEntry;

    #[test]
    fn test_ratio_basics() {
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("abcd", "abcd"), 1.0);
        assert_eq!(ratio("abcd", "bcde"), 0.75);
    }

    #[test]
    fn test_ratio_recurses_on_both_sides() {
        // blocks "ab" and "d" on either side of the mismatch
        assert_eq!(ratio("abxd", "abyd"), 0.75);
        // "qabxcd" vs "abycdf": blocks "ab" + "cd" = 4 of 12
        let r = ratio("qabxcd", "abycdf");
        assert!((r - 8.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        assert_eq!(ratio("été", "été"), 1.0);
        assert!((ratio("café", "cafe") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let matcher = Matcher::default();
        // 11 shared chars out of 40 total: exactly 0.55
        let at = "aaaaaaaaaaabbbbbbbbb";
        let query = "aaaaaaaaaaaccccccccc";
        assert_eq!(ratio(at, query), 0.55);
        let m = matcher.best_match(query, [at]).unwrap();
        assert_eq!(m.candidate, at);

        // 10 shared chars: 0.5, rejected
        let below = "aaaaaaaaaabbbbbbbbbb";
        assert_eq!(ratio(below, query), 0.5);
        assert!(matcher.best_match(query, [below]).is_none());
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let matcher = Matcher::default();
        let m = matcher.best_match("abcd", ["abcx", "abcy"]).unwrap();
        assert_eq!(m.candidate, "abcx");
        let m = matcher.best_match("abcd", ["abcy", "abcx"]).unwrap();
        assert_eq!(m.candidate, "abcy");
    }

    #[test]
    fn test_higher_score_wins_regardless_of_order() {
        let matcher = Matcher::default();
        let m = matcher
            .best_match("what be you name", ["what be you age", "what be you name"])
            .unwrap();
        assert_eq!(m.candidate, "what be you name");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_no_candidates() {
        let matcher = Matcher::default();
        assert!(matcher.best_match("hello", Vec::<&str>::new()).is_none());
    }

    #[test]
    fn test_invalid_cutoff() {
        assert!(Matcher::new(1.5, Similarity::default()).is_err());
        assert!(Matcher::new(-0.1, Similarity::default()).is_err());
        assert!(Matcher::new(0.0, Similarity::JaroWinkler).is_ok());
    }

    #[test]
    fn test_alternative_similarity() {
        let matcher = Matcher::new(0.8, Similarity::Levenshtein).unwrap();
        let m = matcher.best_match("kitten", ["sitting", "kittens"]).unwrap();
        assert_eq!(m.candidate, "kittens");
    }

    #[test]
    fn test_similarity_from_str() {
        assert_eq!(
            "Jaro-Winkler".parse::<Similarity>().unwrap(),
            Similarity::JaroWinkler
        );
        assert!("cosine".parse::<Similarity>().is_err());
        assert_eq!(Similarity::default().to_string(), "ratcliff-obershelp");
    }

    #[test]
    fn test_long_query_popular_chars() {
        // 'a' is popular in a 250-char query and cannot anchor a block, but
        // the exact candidate still matches through the extension pass.
        let query = format!("{}{}", "a".repeat(240), "bcdefghijk");
        let m = Matcher::default().best_match(&query, [query.as_str()]).unwrap();
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_lookup_resolves_first_duplicate() {
        let kb = KnowledgeBase::from_entries(vec![
            KnowledgeEntry::new("hello", "first"),
            KnowledgeEntry::new("hello", "second"),
        ]);
        let found = Matcher::default().lookup("hello", &kb);
        assert_eq!(found.answer(), Some("first"));
        assert_eq!(Matcher::default().lookup("zzzzz", &kb), Lookup::NotFound);
    }
}
