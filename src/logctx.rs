//! Logging Context
//!
//! An immutable, explicitly-passed context value for log enrichment. Each
//! extension (`with_category`, `with_tag`) returns a new value and leaves the
//! original untouched, so contexts can be shared freely across tasks without
//! synchronisation. This replaces ambient global logging state on purpose.

use std::sync::Arc;
use uuid::Uuid;

/// Enrichment carried alongside log statements: a per-process session id, a
/// component category and free-form tags.
#[derive(Debug, Clone)]
pub struct LogContext {
    session_id: Arc<str>,
    category: Arc<str>,
    tags: Arc<[String]>,
}

impl LogContext {
    /// Create a fresh context with a random session id.
    pub fn new(category: &str) -> Self {
        Self {
            session_id: Arc::from(Uuid::new_v4().to_string().as_str()),
            category: Arc::from(category),
            tags: Arc::from(Vec::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Comma-joined tags for use as a single structured log field.
    pub fn tags_field(&self) -> String {
        self.tags.join(",")
    }

    /// Copy with a different category; the session id and tags carry over.
    pub fn with_category(&self, category: &str) -> Self {
        Self {
            session_id: Arc::clone(&self.session_id),
            category: Arc::from(category),
            tags: Arc::clone(&self.tags),
        }
    }

    /// Copy with one more tag appended. Duplicate tags are kept once.
    pub fn with_tag(&self, tag: &str) -> Self {
        if self.tags.iter().any(|existing| existing == tag) {
            return self.clone();
        }
        let mut tags: Vec<String> = self.tags.to_vec();
        tags.push(tag.to_string());
        Self {
            session_id: Arc::clone(&self.session_id),
            category: Arc::clone(&self.category),
            tags: Arc::from(tags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== construction tests ====================

    #[test]
    fn test_new_context_has_category_and_no_tags() {
        let ctx = LogContext::new("ingester");
        assert_eq!(ctx.category(), "ingester");
        assert!(ctx.tags().is_empty());
        assert!(!ctx.session_id().is_empty());
    }

    #[test]
    fn test_session_ids_are_unique_per_context() {
        let first = LogContext::new("a");
        let second = LogContext::new("a");
        assert_ne!(first.session_id(), second.session_id());
    }

    // ==================== copy-on-write tests ====================

    #[test]
    fn test_with_category_preserves_session_id() {
        let base = LogContext::new("ingester");
        let derived = base.with_category("listener");

        assert_eq!(derived.session_id(), base.session_id());
        assert_eq!(derived.category(), "listener");
        assert_eq!(base.category(), "ingester");
    }

    #[test]
    fn test_with_tag_does_not_mutate_original() {
        let base = LogContext::new("ingester");
        let tagged = base.with_tag("swap");

        assert!(base.tags().is_empty());
        assert_eq!(tagged.tags(), ["swap".to_string()]);
    }

    #[test]
    fn test_with_tag_deduplicates() {
        let ctx = LogContext::new("ingester").with_tag("swap").with_tag("swap");
        assert_eq!(ctx.tags().len(), 1);
    }

    #[test]
    fn test_tags_field_joins_with_commas() {
        let ctx = LogContext::new("ingester").with_tag("swap").with_tag("v2");
        assert_eq!(ctx.tags_field(), "swap,v2");
    }

    #[test]
    fn test_contexts_share_across_threads() {
        let ctx = LogContext::new("ingester").with_tag("swap");
        let cloned = ctx.clone();
        let handle = std::thread::spawn(move || cloned.session_id().to_string());
        assert_eq!(handle.join().unwrap(), ctx.session_id());
    }
}
