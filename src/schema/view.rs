use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::BorrowedDocument;
use crate::key::Key;
use crate::schema::collection::{CollectionDocument, SerializedCollection};
use crate::schema::view::map::{Mappings, ViewMappedValue};
use crate::schema::{Collection, CollectionName, Name, ViewName};
use crate::Error;

/// Types for defining a `Map` within a `View`.
pub mod map;

/// A type alias for the result of `CollectionViewSchema::map()`.
pub type ViewMapResult<V> = Result<Mappings<<V as View>::Key, <V as View>::Value>, Error>;

/// A type alias for the result of `CollectionViewSchema::reduce()`.
pub type ReduceResult<V> = Result<<V as View>::Value, Error>;

/// A lazy index of mapped data from a [`Collection`].
///
/// A view provides an efficient way to query data within a collection. The
/// database indexes the associated [`View::Collection`] by calling
/// [`CollectionViewSchema::map()`] every time a document is created, updated,
/// or deleted. The resulting [`Mappings`] form a sorted index that can be
/// efficiently queried using the [`View::Key`] type.
///
/// A view behaves similarly to `BTreeMap<View::Key, Vec<(Header,
/// View::Value)>>`.
pub trait View: Send + Sync + Debug + 'static {
    /// The collection this view belongs to.
    type Collection: Collection;
    /// The key for this view.
    type Key: for<'k> Key<'k> + PartialEq + 'static;
    /// An associated type that can be stored with each entry in the view.
    type Value: Send + Sync;

    /// The name of the view. Must be unique per collection.
    fn name(&self) -> Name;

    /// The namespaced name of the view.
    fn view_name(&self) -> ViewName {
        ViewName {
            collection: Self::Collection::collection_name(),
            name: self.name(),
        }
    }
}

/// The map/reduce implementation for a [`View`].
///
/// `map()` is the filter-and-extract transform: it is invoked once per
/// document, and returning no mappings omits the document from the index.
pub trait CollectionViewSchema: Send + Sync + Debug + 'static
where
    <Self::View as View>::Collection: SerializedCollection,
{
    /// The view this schema is defined for.
    type View: SerializedView;

    /// If true, no two documents may emit the same key. Unique views are
    /// updated within the document write so the check can be made atomically,
    /// and a conflicting write fails with
    /// [`Error::UniqueKeyViolation`](crate::Error::UniqueKeyViolation).
    fn unique(&self) -> bool {
        false
    }

    /// The map function for this view. This function is responsible for
    /// emitting entries for any documents that should be contained in this
    /// view. If no mappings are returned, the view will not include the
    /// document.
    fn map(
        &self,
        document: CollectionDocument<<Self::View as View>::Collection>,
    ) -> ViewMapResult<Self::View>;

    /// Returns a value produced by reducing a list of `mappings` into a
    /// single value. If `rereduce` is true, the values contained in the
    /// mappings have already been reduced at least one time. If
    /// [`Error::ReduceUnimplemented`](crate::Error::ReduceUnimplemented) is
    /// returned, queries that ask for a reduce operation will return an
    /// error.
    #[allow(unused_variables)]
    fn reduce(
        &self,
        mappings: &[ViewMappedValue<Self::View>],
        rereduce: bool,
    ) -> ReduceResult<Self::View> {
        Err(Error::ReduceUnimplemented)
    }
}

/// A [`View`] with additional logic to handle serializing view values.
pub trait SerializedView: View {
    /// Deserialize `data` as `Self::Value`.
    fn deserialize(data: &[u8]) -> Result<Self::Value, Error>;

    /// Serialize `item`.
    fn serialize(item: &Self::Value) -> Result<Vec<u8>, Error>;
}

/// A default serialization strategy for views, storing values in the same
/// format collections default to.
pub trait DefaultViewSerialization: View {}

impl<T> SerializedView for T
where
    T: DefaultViewSerialization,
    T::Value: Serialize + DeserializeOwned,
{
    fn deserialize(data: &[u8]) -> Result<Self::Value, Error> {
        pot::from_slice(data).map_err(Error::from)
    }

    fn serialize(item: &Self::Value) -> Result<Vec<u8>, Error> {
        pot::to_vec(item).map_err(Error::from)
    }
}

/// Wraps a [`View`] with serialization to erase the associated types.
pub trait Serialized: Send + Sync + Debug {
    /// Wraps [`Collection::collection_name()`] for the view's collection.
    fn collection(&self) -> CollectionName;
    /// Wraps [`CollectionViewSchema::unique`].
    fn unique(&self) -> bool;
    /// Wraps [`View::view_name`].
    fn view_name(&self) -> ViewName;
    /// Wraps [`CollectionViewSchema::map`].
    fn map(&self, document: &BorrowedDocument<'_>) -> Result<Vec<map::Serialized>, Error>;
    /// Wraps [`CollectionViewSchema::reduce`].
    fn reduce(&self, mappings: &[(&[u8], &[u8])], rereduce: bool) -> Result<Vec<u8>, Error>;
}

/// Defines a unique view named `$view_name` for `$collection` with the
/// mapping provided.
#[macro_export(local_inner_macros)]
macro_rules! define_basic_unique_mapped_view {
    ($view_name:ident, $collection:ty, $name:literal, $key:ty, $mapping:expr $(,)?) => {
        define_mapped_view!($view_name, $collection, $name, $key, (), true, $mapping);
    };
    ($view_name:ident, $collection:ty, $name:literal, $key:ty, $value:ty, $mapping:expr $(,)?) => {
        define_mapped_view!($view_name, $collection, $name, $key, $value, true, $mapping);
    };
}

/// Defines a non-unique view named `$view_name` for `$collection` with the
/// mapping provided.
#[macro_export(local_inner_macros)]
macro_rules! define_basic_mapped_view {
    ($view_name:ident, $collection:ty, $name:literal, $key:ty, $mapping:expr $(,)?) => {
        define_mapped_view!($view_name, $collection, $name, $key, (), false, $mapping);
    };
    ($view_name:ident, $collection:ty, $name:literal, $key:ty, $value:ty, $mapping:expr $(,)?) => {
        define_mapped_view!($view_name, $collection, $name, $key, $value, false, $mapping);
    };
}

/// Defines a view using the mapping provided.
#[macro_export]
macro_rules! define_mapped_view {
    ($view_name:ident, $collection:ty, $name:literal, $key:ty, $value:ty, $unique:literal, $mapping:expr) => {
        #[doc = concat!("The `", $name, "` view.")]
        #[derive(Debug, Clone)]
        pub struct $view_name;

        impl $crate::schema::View for $view_name {
            type Collection = $collection;
            type Key = $key;
            type Value = $value;

            fn name(&self) -> $crate::schema::Name {
                $crate::schema::Name::new($name)
            }
        }

        impl $crate::schema::CollectionViewSchema for $view_name {
            type View = Self;

            fn unique(&self) -> bool {
                $unique
            }

            fn map(
                &self,
                document: $crate::schema::CollectionDocument<$collection>,
            ) -> $crate::schema::ViewMapResult<Self> {
                $mapping(document)
            }
        }

        impl $crate::schema::view::DefaultViewSerialization for $view_name {}
    };
}
