//! Per-write options.

use std::time::Duration;

/// Options for `set` and `memoize`.
///
/// `ttl: None` falls back to the manager's default TTL (3600 s unless configured).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_tags() {
        let options = SetOptions::new()
            .ttl_secs(1800)
            .tag("user:42")
            .tags(["dataType:profile", "venue:7"]);

        assert_eq!(options.ttl, Some(Duration::from_secs(1800)));
        assert_eq!(options.tags, vec!["user:42", "dataType:profile", "venue:7"]);
    }

    #[test]
    fn test_default_has_no_ttl_or_tags() {
        let options = SetOptions::default();
        assert!(options.ttl.is_none());
        assert!(options.tags.is_empty());
    }
}
