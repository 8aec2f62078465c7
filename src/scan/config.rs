//! Configuration for the traverser

use std::time::SystemTime;

/// Traversal filters. The default visits every entry below the root.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Do not descend more than this many levels below the root
    pub max_depth: Option<usize>,
    /// Glob patterns matched against entry names; matching directories are pruned
    pub ignore_patterns: Vec<String>,
    /// Honour .gitignore/.ignore files and skip hidden entries
    pub respect_ignore_files: bool,
    /// Only emit files modified after this time
    pub newer_than: Option<SystemTime>,
    /// Only emit files modified before this time
    pub older_than: Option<SystemTime>,
}
