//! Text translation with pivot-language routing.
//!
//! The actual translation engine is an external collaborator behind the
//! [`TranslationBackend`] trait; this module owns the routing. A direct
//! translation pair exists from the source language only to the pivot
//! language and whatever other pairs the backend happens to provide; every
//! other target is reached by chaining source -> pivot -> target.

use std::collections::BTreeSet;

use thiserror::Error;

/// Errors from translation routing.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// No direct or pivot route to the requested target language.
    #[error("no translation route to language '{0}'")]
    UnsupportedLanguage(String),

    /// The backend engine failed.
    #[error("translation backend failed: {0}")]
    Backend(String),
}

/// A translation engine providing some set of language pairs.
///
/// One implementation per engine; a single method per translated string.
pub trait TranslationBackend {
    /// Language pairs the engine can translate directly, as
    /// (from_code, to_code).
    fn pairs(&self) -> Vec<(String, String)>;

    /// Translate `text` along one installed pair.
    fn translate_pair(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

/// Routing façade over a [`TranslationBackend`].
///
/// Configured with a source language and a single pivot language. Targets
/// with a direct pair from the source are translated in one hop; all other
/// supported targets go through the pivot.
pub struct Translator {
    backend: Box<dyn TranslationBackend>,
    source: String,
    pivot: String,
    direct: BTreeSet<String>,
    transit: BTreeSet<String>,
}

impl Translator {
    /// Build a translator, indexing the backend's pairs by route.
    pub fn new(
        backend: Box<dyn TranslationBackend>,
        source: impl Into<String>,
        pivot: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let pivot = pivot.into();

        let mut direct = BTreeSet::new();
        let mut transit = BTreeSet::new();
        for (from, to) in backend.pairs() {
            if from == source {
                direct.insert(to);
            } else if from == pivot {
                transit.insert(to);
            }
        }

        tracing::debug!(
            "Translator from '{}': {} direct targets, {} via pivot '{}'",
            source,
            direct.len(),
            transit.len(),
            pivot
        );

        Self {
            backend,
            source,
            pivot,
            direct,
            transit,
        }
    }

    /// All reachable target language codes (direct plus via pivot).
    ///
    /// Pivot-reachable codes are only included when the pivot itself is
    /// directly reachable, otherwise the chain cannot start.
    pub fn available_codes(&self) -> BTreeSet<String> {
        let mut codes = self.direct.clone();
        if self.direct.contains(&self.pivot) {
            codes.extend(self.transit.iter().cloned());
        }
        codes
    }

    /// Translate one string from the source language to `target`.
    pub fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        if self.direct.contains(target) {
            return self.backend.translate_pair(text, &self.source, target);
        }
        if self.transit.contains(target) && self.direct.contains(&self.pivot) {
            let pivoted = self.backend.translate_pair(text, &self.source, &self.pivot)?;
            return self.backend.translate_pair(&pivoted, &self.pivot, target);
        }
        Err(TranslateError::UnsupportedLanguage(target.to_string()))
    }

    /// Translate a batch, preserving input order and length.
    pub fn translate_many(
        &self,
        texts: &[String],
        target: &str,
    ) -> Result<Vec<String>, TranslateError> {
        texts.iter().map(|t| self.translate(t, target)).collect()
    }
}
