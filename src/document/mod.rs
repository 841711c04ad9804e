use arc_bytes::serde::{Bytes, CowBytes};
use serde::{Deserialize, Serialize};

use crate::schema::SerializedCollection;
use crate::Error;

mod header;
mod revision;

pub use self::header::{Emit, Header};
pub use self::revision::Revision;

/// Contains a serialized document in the database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BorrowedDocument<'a> {
    /// The header of the document, which contains the id and `Revision`.
    pub header: Header,

    /// The serialized bytes of the stored item.
    #[serde(borrow)]
    pub contents: CowBytes<'a>,
}

/// Contains a serialized document in the database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnedDocument {
    /// The header of the document, which contains the id and `Revision`.
    pub header: Header,

    /// The serialized bytes of the stored item.
    pub contents: Bytes,
}

impl<'a> BorrowedDocument<'a> {
    /// Returns a new instance with the id and content bytes.
    #[must_use]
    pub fn new<Contents: Into<CowBytes<'a>>>(id: u64, contents: Contents) -> Self {
        let contents = contents.into();
        let revision = Revision::new(&contents);
        Self {
            header: Header { id, revision },
            contents,
        }
    }

    /// Retrieves `contents` through deserialization into the type `C`.
    pub fn contents<C>(&self) -> Result<C, Error>
    where
        C: SerializedCollection,
    {
        <C as SerializedCollection>::deserialize(&self.contents)
    }

    /// Converts this document to an owned document.
    #[must_use]
    pub fn into_owned(self) -> OwnedDocument {
        OwnedDocument {
            header: self.header,
            contents: Bytes::from(self.contents.to_vec()),
        }
    }
}

impl OwnedDocument {
    /// Retrieves `contents` through deserialization into the type `C`.
    pub fn contents<C>(&self) -> Result<C, Error>
    where
        C: SerializedCollection,
    {
        <C as SerializedCollection>::deserialize(&self.contents)
    }

    /// Returns a borrowed view of this document.
    #[must_use]
    pub fn to_borrowed(&self) -> BorrowedDocument<'_> {
        BorrowedDocument {
            header: self.header.clone(),
            contents: CowBytes::from(&self.contents[..]),
        }
    }
}

impl<'a> AsRef<Header> for BorrowedDocument<'a> {
    fn as_ref(&self) -> &Header {
        &self.header
    }
}

impl<'a> AsRef<[u8]> for BorrowedDocument<'a> {
    fn as_ref(&self) -> &[u8] {
        &self.contents
    }
}

impl AsRef<Header> for OwnedDocument {
    fn as_ref(&self) -> &Header {
        &self.header
    }
}

impl AsRef<[u8]> for OwnedDocument {
    fn as_ref(&self) -> &[u8] {
        &self.contents
    }
}
