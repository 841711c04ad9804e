mod collection;
mod names;
mod schematic;
/// Types for defining map/reduce-powered `View`s.
pub mod view;

use std::fmt::Debug;

pub use self::collection::{
    Collection, CollectionDocument, CollectionSerializer, InsertError, SerializedCollection,
};
pub use self::names::{CollectionName, Domain, Name, SchemaName, ViewName};
pub use self::schematic::Schematic;
pub use self::view::map::{Map, MappedDocument, MappedValue, ViewMappedValue};
pub use self::view::{
    CollectionViewSchema, ReduceResult, SerializedView, View, ViewMapResult,
};
use crate::Error;

/// Defines a group of collections that are stored into a single database.
pub trait Schema: Send + Sync + Debug + 'static {
    /// Returns the unique [`SchemaName`] for this schema.
    fn schema_name() -> SchemaName;

    /// Defines the `Collection`s into `schema`.
    fn define_collections(schema: &mut Schematic) -> Result<(), Error>;

    /// Retrieves the [`Schematic`] for this schema.
    fn schematic() -> Result<Schematic, Error> {
        Schematic::from_schema::<Self>()
    }
}

/// A single collection can be used as a schema of its own.
impl<T> Schema for T
where
    T: Collection + 'static,
{
    fn schema_name() -> SchemaName {
        let CollectionName { domain, name } = Self::collection_name();
        SchemaName { domain, name }
    }

    fn define_collections(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_collection::<Self>()
    }
}
