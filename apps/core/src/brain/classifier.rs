//! Text Classification using catalog keyword patterns.
//!
//! Fast substring-based category detection. Crisis patterns are checked first
//! and always win; every other category is scored by matched pattern length.
//! Matching is deliberately substring-based (no word boundaries), so "kill"
//! inside "overkill" is a crisis hit.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::catalog::{Category, CategoryCatalog};

/// Inputs shorter than this (after trimming) are treated as neutral.
pub const MIN_INPUT_CHARS: usize = 3;

const DEFAULT_CACHE_SIZE: usize = 256;

/// Result of classifying one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning category
    pub category: Category,
    /// True when crisis language was found
    pub crisis: bool,
    /// Score of the winning category (0 for crisis and neutral results)
    pub score: usize,
    /// Patterns that matched for the winning category
    pub matched_patterns: Vec<String>,
}

impl ClassificationResult {
    fn neutral() -> Self {
        Self {
            category: Category::GeneralSupport,
            crisis: false,
            score: 0,
            matched_patterns: vec![],
        }
    }
}

/// Memo of classification results.
///
/// Keys are `(catalog fingerprint, normalized text)` and nothing else, so one
/// cache can be shared by every session, and by catalogs that differ only in
/// content, without leaking state between them.
pub struct ClassificationCache {
    entries: Mutex<LruCache<(u64, String), ClassificationResult>>,
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl ClassificationCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get(&self, fingerprint: u64, text: &str) -> Option<ClassificationResult> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.get(&(fingerprint, text.to_string())).cloned()
    }

    fn put(&self, fingerprint: u64, text: String, result: ClassificationResult) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.put((fingerprint, text), result);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Keyword classifier over a category catalog
pub struct TextClassifier {
    catalog: Arc<CategoryCatalog>,
    cache: Arc<ClassificationCache>,
}

impl TextClassifier {
    /// Create a classifier with its own cache
    pub fn new(catalog: Arc<CategoryCatalog>) -> Self {
        Self::with_cache(catalog, Arc::new(ClassificationCache::default()))
    }

    /// Create a classifier sharing an existing cache
    pub fn with_cache(catalog: Arc<CategoryCatalog>, cache: Arc<ClassificationCache>) -> Self {
        Self { catalog, cache }
    }

    /// Classify a message into a category and a crisis flag
    pub fn analyze(&self, text: &str) -> ClassificationResult {
        let normalized = text.trim().to_lowercase();

        if normalized.chars().count() < MIN_INPUT_CHARS {
            return ClassificationResult::neutral();
        }

        let fingerprint = self.catalog.fingerprint();
        if let Some(hit) = self.cache.get(fingerprint, &normalized) {
            return hit;
        }

        let result = self.classify_normalized(&normalized);
        debug!(
            category = %result.category,
            crisis = result.crisis,
            score = result.score,
            "Classified message"
        );
        self.cache.put(fingerprint, normalized, result.clone());
        result
    }

    fn classify_normalized(&self, text: &str) -> ClassificationResult {
        // Crisis pass: any hit is final.
        for def in self.catalog.definitions().filter(|d| d.is_crisis) {
            let matched: Vec<String> = def
                .patterns
                .iter()
                .filter(|p| text.contains(p.as_str()))
                .cloned()
                .collect();
            if !matched.is_empty() {
                return ClassificationResult {
                    category: def.id,
                    crisis: true,
                    score: 0,
                    matched_patterns: matched,
                };
            }
        }

        let mut best = ClassificationResult::neutral();

        for def in self.catalog.definitions().filter(|d| !d.is_crisis) {
            let mut score = 0;
            let mut matched = Vec::new();

            for pattern in &def.patterns {
                let occurrences = text.matches(pattern.as_str()).count();
                if occurrences > 0 {
                    score += pattern.chars().count() * occurrences;
                    matched.push(pattern.clone());
                }
            }

            // Strictly greater: earlier declarations keep ties.
            if score > best.score {
                best = ClassificationResult {
                    category: def.id,
                    crisis: false,
                    score,
                    matched_patterns: matched,
                };
            }
        }

        best
    }
}
