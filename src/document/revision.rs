use std::fmt::{Debug, Display, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Information about a `Document`'s revision history.
#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// The current revision id of the document. This value is sequentially
    /// incremented on each document update.
    pub id: u64,

    /// The SHA256 digest of the bytes contained within the `Document`.
    pub sha256: [u8; 32],
}

impl Revision {
    /// Creates the first revision for a document with the SHA256 digest of the
    /// passed bytes.
    #[must_use]
    pub fn new(contents: &[u8]) -> Self {
        Self::with_id(0, contents)
    }

    /// Creates a revision with `id` for a document with the SHA256 digest of
    /// the passed bytes.
    #[must_use]
    pub fn with_id(id: u64, contents: &[u8]) -> Self {
        Self {
            id,
            sha256: digest(contents),
        }
    }

    /// Creates the next revision in sequence with an updated digest. If the
    /// digest doesn't change, `None` is returned.
    #[must_use]
    pub fn next_revision(&self, new_contents: &[u8]) -> Option<Self> {
        let sha256 = digest(new_contents);
        if sha256 == self.sha256 {
            None
        } else {
            Some(Self {
                id: self.id + 1,
                sha256,
            })
        }
    }
}

impl Debug for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Revision(")?;
        Display::fmt(self, f)?;
        f.write_char(')')
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.id, f)?;
        f.write_char('-')?;
        for byte in &self.sha256[0..4] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

fn digest(contents: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::default();
    hasher.update(contents);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_only_advances_on_changed_contents() {
        let first = Revision::new(b"one");
        assert_eq!(first.id, 0);
        assert!(first.next_revision(b"one").is_none());

        let second = first.next_revision(b"two").unwrap();
        assert_eq!(second.id, 1);
        assert_ne!(first.sha256, second.sha256);
    }
}
