/// Reduces raw text to a canonical, comparable form.
///
/// Implementations must be deterministic, keep token order, join tokens
/// with single spaces and map empty input to empty output.
pub trait TextNormalizer {
    fn normalize(&self, raw: &str) -> String;
}

/// Lowercase plus whitespace folding. No lemmatization.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleNormalizer;

impl TextNormalizer for SimpleNormalizer {
    fn normalize(&self, raw: &str) -> String {
        raw.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<T: TextNormalizer + ?Sized> TextNormalizer for &T {
    fn normalize(&self, raw: &str) -> String {
        (**self).normalize(raw)
    }
}
