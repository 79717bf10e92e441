use std::collections::HashMap;

use super::CatalogEntry;

/// Aggregate numbers over a catalog listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Number of tracked paths.
    pub files: usize,
    /// Number of distinct fingerprints.
    pub unique_blobs: usize,
    /// Sum of sizes over all paths.
    pub total_size: u64,
    /// Sum of sizes over distinct fingerprints, i.e. bytes on disk.
    pub stored_size: u64,
}

impl CatalogStats {
    /// Compute from a listing.
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut blobs: HashMap<&str, u64> = HashMap::new();
        let mut total_size = 0u64;
        for entry in entries {
            total_size = total_size.saturating_add(entry.file_size);
            blobs.entry(entry.hash.as_str()).or_insert(entry.file_size);
        }
        Self {
            files: entries.len(),
            unique_blobs: blobs.len(),
            total_size,
            stored_size: blobs.values().fold(0u64, |acc, s| acc.saturating_add(*s)),
        }
    }

    /// Bytes not stored thanks to deduplication.
    pub fn saved_size(&self) -> u64 {
        self.total_size.saturating_sub(self.stored_size)
    }

    /// Savings as a percentage of the logical size.
    pub fn saved_percent(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            self.saved_size() as f64 / self.total_size as f64 * 100.0
        }
    }
}

/// Human-readable byte count: `512 B`, `1.50 KB`, `1.00 MB`, `1.00 GB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}
