//! Emit-once notices over the `log` facade.

use std::collections::HashSet;

/// Remembers which notices were already logged so they are emitted once.
#[derive(Debug, Default)]
pub struct NoticeLog {
    emitted: HashSet<&'static str>,
}

impl NoticeLog {
    /// Create an empty notice log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at info level unless `key` was already emitted.
    /// Returns whether the message was logged.
    pub fn info_once(&mut self, key: &'static str, message: &str) -> bool {
        let first = self.emitted.insert(key);
        if first {
            log::info!("{message}");
        }
        first
    }

    /// Log `message` at warn level unless `key` was already emitted.
    /// Returns whether the message was logged.
    pub fn warn_once(&mut self, key: &'static str, message: &str) -> bool {
        let first = self.emitted.insert(key);
        if first {
            log::warn!("{message}");
        }
        first
    }

    /// Whether `key` was emitted.
    #[must_use]
    pub fn was_emitted(&self, key: &str) -> bool {
        self.emitted.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_are_emitted_once_per_key() {
        let mut notices = NoticeLog::new();
        assert!(notices.warn_once("mismatch", "first"));
        assert!(!notices.warn_once("mismatch", "second"));
        assert!(notices.info_once("rescaled", "other key"));
        assert!(!notices.info_once("rescaled", "again"));
        assert!(notices.was_emitted("mismatch"));
        assert!(!notices.was_emitted("unknown"));
    }
}
