//! Platform file identifiers

use std::fs::Metadata;

/// Return the entry's on-disk identifier, or `None` when the platform has none.
///
/// On Unix this is the inode number. Inode 0 is reserved and treated as absent.
#[cfg(unix)]
pub fn file_identifier(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;

    Some(metadata.ino()).filter(|&ino| ino != 0)
}

#[cfg(not(unix))]
pub fn file_identifier(_metadata: &Metadata) -> Option<u64> {
    None
}
