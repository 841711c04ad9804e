use std::collections::{BTreeMap, HashMap};
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use arc_bytes::serde::Bytes;
use parking_lot::RwLock;

use crate::document::{Header, OwnedDocument, Revision};
use crate::key::Key;
use crate::schema::view::map::{self, MappedDocument};
use crate::schema::{
    Collection, CollectionDocument, CollectionName, Map, Schema, Schematic, SerializedCollection,
    SerializedView, ViewName,
};
use crate::views::{mapper, ViewEntry, ViewState};
use crate::Error;

/// An in-memory document store that maintains materialized views over its
/// collections.
///
/// Cloning is inexpensive; all clones share the same storage.
#[derive(Clone, Debug)]
pub struct Database {
    data: Arc<Data>,
}

#[derive(Debug)]
struct Data {
    schematic: Schematic,
    state: RwLock<DatabaseState>,
}

#[derive(Debug, Default)]
struct DatabaseState {
    collections: HashMap<CollectionName, CollectionState>,
    views: HashMap<ViewName, ViewState>,
}

#[derive(Debug, Default)]
struct CollectionState {
    documents: BTreeMap<u64, OwnedDocument>,
    last_id: u64,
}

impl Database {
    /// Creates an empty database for the schema `S`.
    pub fn new<S: Schema>() -> Result<Self, Error> {
        let schematic = S::schematic()?;
        let mut state = DatabaseState::default();
        for collection in schematic.collections() {
            state
                .collections
                .insert(collection.clone(), CollectionState::default());
        }
        for view in schematic.views() {
            state.views.insert(view.view_name(), ViewState::default());
        }
        Ok(Self {
            data: Arc::new(Data {
                schematic,
                state: RwLock::new(state),
            }),
        })
    }

    /// Returns the schema this database was opened with.
    #[must_use]
    pub fn schematic(&self) -> &Schematic {
        &self.data.schematic
    }

    /// Serializes `contents` and stores it as a new document, returning the
    /// new document's header.
    pub fn push<C: SerializedCollection>(&self, contents: &C) -> Result<Header, Error> {
        let collection = C::collection_name();
        let contents = <C as SerializedCollection>::serialize(contents)?;

        let mut state = self.data.state.write();
        let DatabaseState { collections, views } = &mut *state;
        let collection_state = collections
            .get_mut(&collection)
            .ok_or(Error::CollectionNotFound)?;

        let id = collection_state.last_id + 1;
        let document = OwnedDocument {
            header: Header {
                id,
                revision: Revision::new(&contents),
            },
            contents: Bytes::from(contents),
        };

        self.check_unique_views(views, &collection, &document)?;

        collection_state.last_id = id;
        collection_state.documents.insert(id, document);
        Self::invalidate_views(
            &self.data.schematic,
            views,
            &collection,
            id,
            &collection_state.documents,
        )?;

        Ok(collection_state.documents[&id].header.clone())
    }

    /// Retrieves the document with `id` from the collection `C`.
    pub fn get<C: SerializedCollection>(
        &self,
        id: u64,
    ) -> Result<Option<CollectionDocument<C>>, Error> {
        let state = self.data.state.read();
        let collection_state = state
            .collections
            .get(&C::collection_name())
            .ok_or(Error::CollectionNotFound)?;
        collection_state
            .documents
            .get(&id)
            .map(CollectionDocument::try_from)
            .transpose()
    }

    /// Lists all documents in the collection `C`, in ascending id order.
    pub fn list<C: SerializedCollection>(&self) -> Result<Vec<CollectionDocument<C>>, Error> {
        let state = self.data.state.read();
        let collection_state = state
            .collections
            .get(&C::collection_name())
            .ok_or(Error::CollectionNotFound)?;
        collection_state
            .documents
            .values()
            .map(CollectionDocument::try_from)
            .collect()
    }

    /// Stores the updated contents of `document`. The stored revision must
    /// match `document`'s revision, or
    /// [`Error::DocumentConflict`](crate::Error::DocumentConflict) is
    /// returned.
    pub fn update<C: SerializedCollection>(
        &self,
        document: &mut CollectionDocument<C>,
    ) -> Result<(), Error> {
        let collection = C::collection_name();
        let contents = <C as SerializedCollection>::serialize(&document.contents)?;

        let mut state = self.data.state.write();
        let DatabaseState { collections, views } = &mut *state;
        let collection_state = collections
            .get_mut(&collection)
            .ok_or(Error::CollectionNotFound)?;

        let stored_revision = {
            let existing = collection_state
                .documents
                .get(&document.header.id)
                .ok_or_else(|| Error::DocumentNotFound(collection.clone(), document.header.id))?;
            if existing.header.revision != document.header.revision {
                return Err(Error::DocumentConflict(
                    collection.clone(),
                    Box::new(existing.header.clone()),
                ));
            }
            existing.header.revision
        };

        let Some(revision) = stored_revision.next_revision(&contents) else {
            // Contents are byte-identical; nothing to store or re-index.
            return Ok(());
        };
        let header = Header {
            id: document.header.id,
            revision,
        };
        let updated = OwnedDocument {
            header: header.clone(),
            contents: Bytes::from(contents),
        };

        self.check_unique_views(views, &collection, &updated)?;

        collection_state.documents.insert(header.id, updated);
        Self::invalidate_views(
            &self.data.schematic,
            views,
            &collection,
            header.id,
            &collection_state.documents,
        )?;

        document.header = header;
        Ok(())
    }

    /// Removes the document described by `header` from the collection `C`.
    pub fn delete<C: Collection>(&self, header: &Header) -> Result<(), Error> {
        let collection = C::collection_name();

        let mut state = self.data.state.write();
        let DatabaseState { collections, views } = &mut *state;
        let collection_state = collections
            .get_mut(&collection)
            .ok_or(Error::CollectionNotFound)?;

        {
            let existing = collection_state
                .documents
                .get(&header.id)
                .ok_or_else(|| Error::DocumentNotFound(collection.clone(), header.id))?;
            if existing.header.revision != header.revision {
                return Err(Error::DocumentConflict(
                    collection.clone(),
                    Box::new(existing.header.clone()),
                ));
            }
        }

        collection_state.documents.remove(&header.id);
        Self::invalidate_views(
            &self.data.schematic,
            views,
            &collection,
            header.id,
            &collection_state.documents,
        )?;

        Ok(())
    }

    /// Accesses the view `V`, returning a builder that can be used to query
    /// or reduce it.
    #[must_use]
    pub fn view<V: SerializedView>(&self) -> View<'_, V> {
        View {
            database: self,
            key: None,
            sort: Sort::Ascending,
            limit: None,
        }
    }

    /// Validates the document against every unique view in its collection
    /// before any state is mutated.
    fn check_unique_views(
        &self,
        views: &HashMap<ViewName, ViewState>,
        collection: &CollectionName,
        document: &OwnedDocument,
    ) -> Result<(), Error> {
        for view in self.data.schematic.unique_views_in_collection(collection) {
            let mappings = view.map(&document.to_borrowed())?;
            let view_state = views.get(&view.view_name()).ok_or(Error::ViewNotFound)?;
            mapper::check_unique_keys(view_state, view, document.header.id, &mappings)?;
        }
        Ok(())
    }

    /// Marks `document_id` as needing re-mapping in every lazy view of
    /// `collection`, and re-maps it immediately in unique views so their
    /// atomic key checks stay sound.
    fn invalidate_views(
        schematic: &Schematic,
        views: &mut HashMap<ViewName, ViewState>,
        collection: &CollectionName,
        document_id: u64,
        documents: &BTreeMap<u64, OwnedDocument>,
    ) -> Result<(), Error> {
        for view in schematic.views_in_collection(collection) {
            let view_state = views
                .get_mut(&view.view_name())
                .ok_or(Error::ViewNotFound)?;
            if view.unique() {
                mapper::map_document(view_state, view, document_id, documents.get(&document_id))?;
            } else {
                view_state.invalidated.insert(document_id);
            }
        }
        Ok(())
    }

    fn view_entries(
        &self,
        view_name: &ViewName,
        key: Option<SerializedQueryKey>,
        sort: Sort,
        limit: Option<u32>,
    ) -> Result<Vec<ViewEntry>, Error> {
        let view = self
            .data
            .schematic
            .view_by_name(view_name)
            .ok_or(Error::ViewNotFound)?;

        let mut state = self.data.state.write();
        let DatabaseState { collections, views } = &mut *state;
        let collection_state = collections
            .get(&view.collection())
            .ok_or(Error::CollectionNotFound)?;
        let view_state = views.get_mut(view_name).ok_or(Error::ViewNotFound)?;

        mapper::map_invalidated(view_state, &collection_state.documents, view)?;

        let mut entries = match key {
            Some(SerializedQueryKey::Matches(key)) => {
                view_state.entries.get(&key).cloned().into_iter().collect()
            }
            Some(SerializedQueryKey::Multiple(mut list)) => {
                list.sort();
                list.iter()
                    .filter_map(|key| view_state.entries.get(key).cloned())
                    .collect()
            }
            Some(SerializedQueryKey::Range(bounds)) => {
                if range_is_empty(&bounds) {
                    Vec::new()
                } else {
                    view_state
                        .entries
                        .range(bounds)
                        .map(|(_, entry)| entry.clone())
                        .collect()
                }
            }
            None => view_state.entries.values().cloned().collect::<Vec<_>>(),
        };

        if matches!(sort, Sort::Descending) {
            entries.reverse();
        }
        if let Some(limit) = limit {
            entries.truncate(limit as usize);
        }

        Ok(entries)
    }
}

/// The ordering of a view query's results.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
    /// Sort the keys in ascending order.
    Ascending,
    /// Sort the keys in descending order.
    Descending,
}

/// Filters a view query by key.
#[derive(Clone, Debug)]
pub enum QueryKey<K> {
    /// Matches entries with the key provided.
    Matches(K),
    /// Matches entries with any of the keys provided.
    Multiple(Vec<K>),
    /// Matches entries whose keys are within the range provided.
    Range((Bound<K>, Bound<K>)),
}

enum SerializedQueryKey {
    Matches(Bytes),
    Multiple(Vec<Bytes>),
    Range((Bound<Bytes>, Bound<Bytes>)),
}

impl<K: for<'k> Key<'k>> QueryKey<K> {
    fn serialized(&self) -> Result<SerializedQueryKey, Error> {
        match self {
            Self::Matches(key) => Ok(SerializedQueryKey::Matches(encode_key(key)?)),
            Self::Multiple(keys) => Ok(SerializedQueryKey::Multiple(
                keys.iter().map(encode_key).collect::<Result<_, _>>()?,
            )),
            Self::Range((start, end)) => Ok(SerializedQueryKey::Range((
                encode_bound(start)?,
                encode_bound(end)?,
            ))),
        }
    }
}

fn encode_key<K: for<'k> Key<'k>>(key: &K) -> Result<Bytes, Error> {
    Ok(Bytes::from(
        key.as_big_endian_bytes()
            .map_err(Error::key_serialization)?
            .to_vec(),
    ))
}

fn encode_bound<K: for<'k> Key<'k>>(bound: &Bound<K>) -> Result<Bound<Bytes>, Error> {
    Ok(match bound {
        Bound::Included(key) => Bound::Included(encode_key(key)?),
        Bound::Excluded(key) => Bound::Excluded(encode_key(key)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

/// `BTreeMap::range` panics on inverted ranges; treat them as empty instead.
fn range_is_empty(bounds: &(Bound<Bytes>, Bound<Bytes>)) -> bool {
    match bounds {
        (
            Bound::Included(start) | Bound::Excluded(start),
            Bound::Included(end) | Bound::Excluded(end),
        ) => {
            start > end
                || (start == end
                    && matches!(bounds, (Bound::Excluded(_), _) | (_, Bound::Excluded(_))))
        }
        _ => false,
    }
}

/// A builder for a view query or view reduce.
#[must_use]
pub struct View<'a, V: SerializedView> {
    database: &'a Database,
    key: Option<QueryKey<V::Key>>,
    sort: Sort,
    limit: Option<u32>,
}

impl<'a, V: SerializedView> View<'a, V> {
    /// Filters for entries in the view with `key`.
    pub fn with_key(mut self, key: V::Key) -> Self {
        self.key = Some(QueryKey::Matches(key));
        self
    }

    /// Filters for entries in the view with any of the `keys` provided.
    pub fn with_keys<IntoIter: IntoIterator<Item = V::Key>>(mut self, keys: IntoIter) -> Self {
        self.key = Some(QueryKey::Multiple(keys.into_iter().collect()));
        self
    }

    /// Filters for entries in the view with keys within `range`.
    pub fn with_key_range<R: RangeBounds<V::Key>>(mut self, range: R) -> Self {
        self.key = Some(QueryKey::Range((
            range.start_bound().cloned(),
            range.end_bound().cloned(),
        )));
        self
    }

    /// Returns the results in ascending key order. This is the default.
    pub fn ascending(mut self) -> Self {
        self.sort = Sort::Ascending;
        self
    }

    /// Returns the results in descending key order.
    pub fn descending(mut self) -> Self {
        self.sort = Sort::Descending;
        self
    }

    /// Limits the results to a maximum of `limit` distinct keys.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Executes the query, returning one [`Map`] per emitted mapping. Any
    /// out-of-date documents are mapped before the results are collected.
    pub fn query(self) -> Result<Vec<Map<V::Key, V::Value>>, Error> {
        let entries = self.entries()?;

        let mut results = Vec::new();
        for entry in entries {
            for mapping in entry.mappings {
                results.push(
                    map::Serialized {
                        source: mapping.source,
                        key: entry.key.clone(),
                        value: mapping.value,
                    }
                    .deserialized::<V>()?,
                );
            }
        }

        Ok(results)
    }

    /// Executes the query, pairing each mapping with the document that
    /// emitted it.
    pub fn query_with_docs(self) -> Result<Vec<MappedDocument<V>>, Error>
    where
        V::Collection: SerializedCollection,
    {
        let database = self.database;
        let collection = <V::Collection as Collection>::collection_name();
        self.query()?
            .into_iter()
            .map(|mapping| {
                let document = database
                    .get::<V::Collection>(mapping.source.id)?
                    .ok_or_else(|| Error::DocumentNotFound(collection.clone(), mapping.source.id))?;
                Ok(MappedDocument {
                    document,
                    key: mapping.key,
                    value: mapping.value,
                })
            })
            .collect()
    }

    /// Reduces the matched entries down to a single value.
    pub fn reduce(self) -> Result<V::Value, Error> {
        let database = self.database;
        let view_name = database.data.schematic.view::<V>()?.view_name();
        let entries = self.entries()?;

        let mappings = entries
            .iter()
            .map(|entry| (&entry.key[..], &entry.reduced_value[..]))
            .collect::<Vec<_>>();
        let reduced = database
            .data
            .schematic
            .view_by_name(&view_name)
            .ok_or(Error::ViewNotFound)?
            .reduce(&mappings, true)?;

        V::deserialize(&reduced)
    }

    fn entries(&self) -> Result<Vec<ViewEntry>, Error> {
        let view_name = self.database.data.schematic.view::<V>()?.view_name();
        let key = self.key.as_ref().map(QueryKey::serialized).transpose()?;
        self.database
            .view_entries(&view_name, key, self.sort, self.limit)
    }
}
