//! Catalog checksums recorded in the visibility cache.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ErrorContext, UptimeError, UptimeResult};

/// Calculate the SHA-256 checksum of raw catalog bytes.
///
/// # Returns
/// Hexadecimal string representation of the hash.
pub fn calculate_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Checksum of the file at `path`.
pub fn checksum_file(path: &Path) -> UptimeResult<String> {
    let content = std::fs::read(path).map_err(|e| UptimeError::CatalogRead {
        message: e.to_string(),
        context: ErrorContext::for_path(path),
    })?;
    Ok(calculate_checksum(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_checksum_consistency() {
        let content = b"proposal_id,source\nMX-01,Crab\n";
        assert_eq!(calculate_checksum(content), calculate_checksum(content));
        assert_eq!(calculate_checksum(content).len(), 64);
    }

    #[test]
    fn test_different_content_different_checksum() {
        assert_ne!(
            calculate_checksum(b"MX-01,Crab"),
            calculate_checksum(b"MX-02,Crab")
        );
    }

    #[test]
    fn test_checksum_file_matches_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a,b\n1,2\n").unwrap();
        assert_eq!(
            checksum_file(file.path()).unwrap(),
            calculate_checksum(b"a,b\n1,2\n")
        );
        assert!(checksum_file(Path::new("/nonexistent/catalog.csv")).is_err());
    }
}
