use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::document::{BorrowedDocument, Header, OwnedDocument};
use crate::schema::{CollectionName, Schematic};
use crate::Error;

/// A namespaced collection of `Document`s and the views that index them.
pub trait Collection: Debug + Send + Sync + 'static {
    /// The unique name of this collection.
    fn collection_name() -> CollectionName;

    /// Defines all `View`s in this collection into `schema`.
    fn define_views(schema: &mut Schematic) -> Result<(), Error>;

    /// Returns the serializer to use when accessing and storing the
    /// document's contents.
    #[must_use]
    fn serializer() -> CollectionSerializer {
        CollectionSerializer::default()
    }
}

/// Serialization format for storing a collection.
#[derive(Debug, Default, Clone, Copy)]
pub enum CollectionSerializer {
    /// Serialize using the [`Pot`](https://github.com/khonsulabs/pot) format.
    /// The default serializer.
    #[default]
    Pot,
    /// Serialize using Json. Useful for collections whose documents are
    /// produced or consumed outside of this crate.
    Json,
}

impl CollectionSerializer {
    /// Serializes `contents`.
    pub fn serialize<T: Serialize>(self, contents: &T) -> Result<Vec<u8>, Error> {
        match self {
            Self::Pot => pot::to_vec(contents).map_err(Error::from),
            Self::Json => serde_json::to_vec(contents).map_err(Error::from),
        }
    }

    /// Deserializes `data` into `T`.
    pub fn deserialize<T: DeserializeOwned>(self, data: &[u8]) -> Result<T, Error> {
        match self {
            Self::Pot => pot::from_slice(data).map_err(Error::from),
            Self::Json => serde_json::from_slice(data).map_err(Error::from),
        }
    }
}

/// A [`Collection`] whose contents serialize through its
/// [`CollectionSerializer`].
pub trait SerializedCollection: Collection + Serialize + DeserializeOwned + Sized {
    /// Serializes `contents` using this collection's serializer.
    fn serialize(contents: &Self) -> Result<Vec<u8>, Error> {
        Self::serializer().serialize(contents)
    }

    /// Deserializes `data` using this collection's serializer.
    fn deserialize(data: &[u8]) -> Result<Self, Error> {
        Self::serializer().deserialize(data)
    }

    /// Inserts this value into the collection, returning the stored document.
    fn push_into(self, database: &Database) -> Result<CollectionDocument<Self>, InsertError<Self>> {
        let header = match database.push(&self) {
            Ok(header) => header,
            Err(error) => {
                return Err(InsertError {
                    contents: self,
                    error,
                })
            }
        };
        Ok(CollectionDocument {
            header,
            contents: self,
        })
    }

    /// Gets a [`CollectionDocument`] with `id` from `database`.
    fn get(id: u64, database: &Database) -> Result<Option<CollectionDocument<Self>>, Error> {
        database.get::<Self>(id)
    }

    /// Lists all documents in this collection, in ascending id order.
    fn list(database: &Database) -> Result<Vec<CollectionDocument<Self>>, Error> {
        database.list::<Self>()
    }
}

impl<T> SerializedCollection for T where T: Collection + Serialize + DeserializeOwned {}

/// An error from inserting a [`CollectionDocument`].
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct InsertError<T> {
    /// The original value being inserted.
    pub contents: T,
    /// The error that occurred while inserting.
    pub error: Error,
}

/// A document with deserialized contents.
#[derive(Clone, Debug)]
pub struct CollectionDocument<C: SerializedCollection> {
    /// The header of the document, which contains the id and `Revision`.
    pub header: Header,

    /// The document's contents.
    pub contents: C,
}

impl<C> CollectionDocument<C>
where
    C: SerializedCollection,
{
    /// Stores the new value of `contents` in the document.
    pub fn update(&mut self, database: &Database) -> Result<(), Error> {
        database.update::<C>(self)
    }

    /// Removes the document from the collection.
    pub fn delete(&self, database: &Database) -> Result<(), Error> {
        database.delete::<C>(&self.header)
    }
}

impl<C> TryFrom<&OwnedDocument> for CollectionDocument<C>
where
    C: SerializedCollection,
{
    type Error = Error;

    fn try_from(value: &OwnedDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            contents: value.contents::<C>()?,
            header: value.header.clone(),
        })
    }
}

impl<'a, C> TryFrom<&BorrowedDocument<'a>> for CollectionDocument<C>
where
    C: SerializedCollection,
{
    type Error = Error;

    fn try_from(value: &BorrowedDocument<'a>) -> Result<Self, Self::Error> {
        Ok(Self {
            contents: value.contents::<C>()?,
            header: value.header.clone(),
        })
    }
}
