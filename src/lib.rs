//! An embedded, in-memory document store with map/reduce views.
//!
//! Documents are stored in named [`Collection`](schema::Collection)s. A
//! [`View`](schema::View) indexes a collection by running a deterministic map
//! function over each document and collecting the emitted key/value pairs
//! into a sorted, queryable index. The crate ships the [`hsph`]
//! field-reporting schema, which indexes facility site-log submissions by
//! their site id.

#![forbid(unsafe_code)]
#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::missing_errors_doc,
    clippy::option_if_let_else,
    clippy::module_name_repetitions
)]

/// The database and its view query interface.
pub mod database;
/// Types for interacting with `Document`s.
pub mod document;
/// The field-reporting schema.
pub mod hsph;
/// Conversion of view keys to and from ordered byte sequences.
pub mod key;
/// Types for defining database schema.
pub mod schema;
mod views;

pub use database::Database;
use document::Header;
use schema::{CollectionName, ViewName};

/// An error that can be used within the crate's error types.
pub trait AnyError: std::error::Error + Send + Sync + 'static {}

impl<T> AnyError for T where T: std::error::Error + Send + Sync + 'static {}

/// Errors that can occur from interacting with the database.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An attempt to use a `Collection` that wasn't defined in the database's
    /// schema.
    #[error("attempted to access a collection not registered with this schema")]
    CollectionNotFound,

    /// The collection was defined in the schema more than once.
    #[error("attempted to define a collection multiple times")]
    CollectionAlreadyDefined,

    /// An attempt to use a `View` that wasn't defined in the database's
    /// schema.
    #[error("attempted to access a view not registered with this schema")]
    ViewNotFound,

    /// The view's name already belongs to another view in the schema.
    #[error("view '{0}' was already registered")]
    ViewAlreadyRegistered(ViewName),

    /// The requested document id was not found in the collection.
    #[error("document {1} was not found in collection '{0}'")]
    DocumentNotFound(CollectionName, u64),

    /// The stored document's revision did not match the update's revision.
    #[error("a conflict was detected updating document {} in collection '{0}'", .1.id)]
    DocumentConflict(CollectionName, Box<Header>),

    /// A document emitted a key in a unique view that another document has
    /// already emitted.
    #[error("document {} conflicts with document {} on view '{view}'", .conflicting_document.id, .existing_document.id)]
    UniqueKeyViolation {
        /// The view the unique key violation occurred in.
        view: ViewName,
        /// The document that caused the violation.
        conflicting_document: Box<Header>,
        /// The document that already emitted the key.
        existing_document: Box<Header>,
    },

    /// A reduce operation was requested on a view that does not implement
    /// `reduce()`.
    #[error("reduce is not implemented by this view")]
    ReduceUnimplemented,

    /// An error occurred while serializing or deserializing a view key.
    #[error("error serializing view key: {0}")]
    KeySerialization(Box<dyn AnyError>),

    /// An error occurred while serializing or deserializing document or view
    /// contents.
    #[error("error serializing: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns a [`Self::KeySerialization`] instance after boxing the error.
    pub fn key_serialization<E: AnyError>(error: E) -> Self {
        Self::KeySerialization(Box::new(error))
    }
}

impl From<pot::Error> for Error {
    fn from(err: pot::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
