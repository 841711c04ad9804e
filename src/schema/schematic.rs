use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use crate::document::BorrowedDocument;
use crate::key::Key;
use crate::schema::collection::{Collection, CollectionDocument, SerializedCollection};
use crate::schema::view::map::{self, MappedValue};
use crate::schema::view::{CollectionViewSchema, Serialized, SerializedView, View};
use crate::schema::{CollectionName, Schema, SchemaName, ViewName};
use crate::Error;

/// A collection of defined collections and views.
#[derive(Debug)]
pub struct Schematic {
    /// The name of the schema this was built from.
    pub name: SchemaName,
    contained_collections: HashSet<CollectionName>,
    collections_by_type_id: HashMap<TypeId, CollectionName>,
    views: HashMap<TypeId, Box<dyn Serialized>>,
    views_by_name: HashMap<ViewName, TypeId>,
    views_by_collection: HashMap<CollectionName, Vec<TypeId>>,
    unique_views_by_collection: HashMap<CollectionName, Vec<TypeId>>,
}

impl Schematic {
    /// Returns an initialized version from `S`.
    pub fn from_schema<S: Schema + ?Sized>() -> Result<Self, Error> {
        let mut schematic = Self {
            name: S::schema_name(),
            contained_collections: HashSet::new(),
            collections_by_type_id: HashMap::new(),
            views: HashMap::new(),
            views_by_name: HashMap::new(),
            views_by_collection: HashMap::new(),
            unique_views_by_collection: HashMap::new(),
        };
        S::define_collections(&mut schematic)?;
        Ok(schematic)
    }

    /// Adds the collection `C` and its views.
    pub fn define_collection<C: Collection + 'static>(&mut self) -> Result<(), Error> {
        let name = C::collection_name();
        if self.contained_collections.contains(&name) {
            Err(Error::CollectionAlreadyDefined)
        } else {
            self.collections_by_type_id
                .insert(TypeId::of::<C>(), name.clone());
            self.contained_collections.insert(name);
            C::define_views(self)
        }
    }

    /// Adds the view `V`.
    pub fn define_view<V>(&mut self, view: V) -> Result<(), Error>
    where
        V: CollectionViewSchema<View = V> + SerializedView + 'static,
        V::Collection: SerializedCollection,
    {
        let name = view.view_name();
        if self.views_by_name.contains_key(&name) {
            return Err(Error::ViewAlreadyRegistered(name));
        }

        let collection = name.collection.clone();
        let unique = view.unique();
        let instance = ViewInstance { view };
        self.views.insert(TypeId::of::<V>(), Box::new(instance));
        self.views_by_name.insert(name, TypeId::of::<V>());

        if unique {
            self.unique_views_by_collection
                .entry(collection.clone())
                .or_default()
                .push(TypeId::of::<V>());
        }
        self.views_by_collection
            .entry(collection)
            .or_default()
            .push(TypeId::of::<V>());

        Ok(())
    }

    /// Returns `true` if this schema contains the collection `C`.
    #[must_use]
    pub fn contains_collection<C: Collection + 'static>(&self) -> bool {
        self.collections_by_type_id.contains_key(&TypeId::of::<C>())
    }

    /// Returns the names of all defined collections.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionName> {
        self.contained_collections.iter()
    }

    /// Looks up the view `V`.
    pub fn view<V: View + 'static>(&self) -> Result<&dyn Serialized, Error> {
        self.views
            .get(&TypeId::of::<V>())
            .map(Box::as_ref)
            .ok_or(Error::ViewNotFound)
    }

    /// Looks up a view by its name.
    #[must_use]
    pub fn view_by_name(&self, name: &ViewName) -> Option<&dyn Serialized> {
        self.views_by_name
            .get(name)
            .and_then(|type_id| self.views.get(type_id))
            .map(Box::as_ref)
    }

    /// Returns all views defined in this schema.
    pub fn views(&self) -> impl Iterator<Item = &dyn Serialized> {
        self.views.values().map(Box::as_ref)
    }

    /// Returns all views defined for the collection `collection`.
    pub fn views_in_collection(
        &self,
        collection: &CollectionName,
    ) -> impl Iterator<Item = &dyn Serialized> {
        self.views_by_collection
            .get(collection)
            .into_iter()
            .flatten()
            .filter_map(|type_id| self.views.get(type_id).map(Box::as_ref))
    }

    /// Returns the unique views defined for the collection `collection`.
    pub fn unique_views_in_collection(
        &self,
        collection: &CollectionName,
    ) -> impl Iterator<Item = &dyn Serialized> {
        self.unique_views_by_collection
            .get(collection)
            .into_iter()
            .flatten()
            .filter_map(|type_id| self.views.get(type_id).map(Box::as_ref))
    }
}

#[derive(Debug)]
struct ViewInstance<V> {
    view: V,
}

impl<V> Serialized for ViewInstance<V>
where
    V: CollectionViewSchema<View = V> + SerializedView,
    V::Collection: SerializedCollection,
{
    fn collection(&self) -> CollectionName {
        <V::Collection as Collection>::collection_name()
    }

    fn unique(&self) -> bool {
        self.view.unique()
    }

    fn view_name(&self) -> ViewName {
        self.view.view_name()
    }

    fn map(&self, document: &BorrowedDocument<'_>) -> Result<Vec<map::Serialized>, Error> {
        // A document that doesn't deserialize as this collection's contents
        // can't match the view's predicates. It is omitted from the index
        // rather than failing the whole mapping batch.
        let document = match CollectionDocument::<V::Collection>::try_from(document) {
            Ok(document) => document,
            Err(Error::Serialization(err)) => {
                log::warn!(
                    "skipping document {} in view '{}': {err}",
                    document.header.id,
                    self.view_name()
                );
                return Ok(Vec::new());
            }
            Err(other) => return Err(other),
        };

        let map = self.view.map(document)?;

        map.into_iter().map(|map| map.serialized::<V>()).collect()
    }

    fn reduce(&self, mappings: &[(&[u8], &[u8])], rereduce: bool) -> Result<Vec<u8>, Error> {
        // An unimplemented reduce must surface before the stored bytes are
        // interpreted, since reduce-less views store no reduced values.
        if let Err(Error::ReduceUnimplemented) = self.view.reduce(&[], rereduce) {
            return Err(Error::ReduceUnimplemented);
        }

        let mappings = mappings
            .iter()
            .map(|(key, value)| {
                let key = <V::Key as Key<'_>>::from_big_endian_bytes(key)
                    .map_err(Error::key_serialization)?;
                let value = V::deserialize(value)?;
                Ok(MappedValue::new(key, value))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let reduced_value = self.view.reduce(&mappings, rereduce)?;

        V::serialize(&reduced_value)
    }
}
