//! Name and modification-time filters applied during traversal

use std::ffi::OsStr;
use std::time::SystemTime;

use glob::Pattern;

use super::config::ScanConfig;
use crate::error::ConfigError;

/// Compiled form of the filters in a [`ScanConfig`].
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    patterns: Vec<Pattern>,
    newer_than: Option<SystemTime>,
    older_than: Option<SystemTime>,
}

impl EntryFilter {
    /// Compile the ignore patterns, rejecting malformed globs up front.
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .ignore_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ConfigError::InvalidIgnorePattern {
                    pattern: p.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            newer_than: config.newer_than,
            older_than: config.older_than,
        })
    }

    /// Check if an entry name matches one of the ignore patterns.
    pub fn is_ignored_name(&self, name: &OsStr) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_string_lossy();
        self.patterns.iter().any(|p| p.as_str() == name || p.matches(&name))
    }

    /// Check a modification time against the newer/older window.
    pub fn passes_time_window(&self, modified: SystemTime) -> bool {
        if let Some(newer) = self.newer_than {
            if modified < newer {
                return false;
            }
        }
        if let Some(older) = self.older_than {
            if modified > older {
                return false;
            }
        }
        true
    }

    /// Whether any time window is configured at all.
    pub fn has_time_window(&self) -> bool {
        self.newer_than.is_some() || self.older_than.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn filter_with_patterns(patterns: &[&str]) -> EntryFilter {
        let config = ScanConfig {
            ignore_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        EntryFilter::new(&config).unwrap()
    }

    #[test]
    fn test_ignore_patterns() {
        let filter = filter_with_patterns(&["*.log", "target", "cache?", "[ab].tmp"]);

        assert!(filter.is_ignored_name(OsStr::new("debug.log")));
        assert!(filter.is_ignored_name(OsStr::new("target")));
        assert!(filter.is_ignored_name(OsStr::new("cache1")));
        assert!(filter.is_ignored_name(OsStr::new("a.tmp")));

        assert!(!filter.is_ignored_name(OsStr::new("main.rs")));
        assert!(!filter.is_ignored_name(OsStr::new("cache12")));
        assert!(!filter.is_ignored_name(OsStr::new("c.tmp")));
        assert!(!filter.is_ignored_name(OsStr::new("log")));
    }

    #[test]
    fn test_no_patterns_ignores_nothing() {
        let filter = EntryFilter::default();
        assert!(!filter.is_ignored_name(OsStr::new(".git")));
        assert!(!filter.is_ignored_name(OsStr::new("anything")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = ScanConfig {
            ignore_patterns: vec!["[unclosed".to_string()],
            ..Default::default()
        };
        match EntryFilter::new(&config) {
            Err(ConfigError::InvalidIgnorePattern { pattern, .. }) => {
                assert_eq!(pattern, "[unclosed")
            }
            other => panic!("expected InvalidIgnorePattern, got {:?}", other),
        }
    }

    #[test]
    fn test_time_window() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let config = ScanConfig {
            newer_than: Some(base - Duration::from_secs(100)),
            older_than: Some(base + Duration::from_secs(100)),
            ..Default::default()
        };
        let filter = EntryFilter::new(&config).unwrap();

        assert!(filter.has_time_window());
        assert!(filter.passes_time_window(base));
        assert!(!filter.passes_time_window(base - Duration::from_secs(101)));
        assert!(!filter.passes_time_window(base + Duration::from_secs(101)));
    }

    #[test]
    fn test_no_time_window_passes_everything() {
        let filter = EntryFilter::default();
        assert!(!filter.has_time_window());
        assert!(filter.passes_time_window(SystemTime::UNIX_EPOCH));
        assert!(filter.passes_time_window(SystemTime::now()));
    }
}
