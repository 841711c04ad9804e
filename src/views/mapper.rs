use std::collections::{BTreeMap, HashSet};

use arc_bytes::serde::Bytes;

use crate::document::{Header, OwnedDocument};
use crate::schema::view::map;
use crate::schema::view::Serialized;
use crate::views::{EntryMapping, ViewEntry, ViewState};
use crate::Error;

/// Maps every invalidated document for `view`, bringing the index up to date.
pub(crate) fn map_invalidated(
    state: &mut ViewState,
    documents: &BTreeMap<u64, OwnedDocument>,
    view: &dyn Serialized,
) -> Result<(), Error> {
    if state.invalidated.is_empty() {
        return Ok(());
    }

    let invalidated = std::mem::take(&mut state.invalidated);
    log::trace!(
        "mapping {} invalidated documents for view '{}'",
        invalidated.len(),
        view.view_name()
    );
    for document_id in invalidated {
        map_document(state, view, document_id, documents.get(&document_id))?;
    }

    Ok(())
}

/// Maps a single document, replacing whatever the document previously emitted
/// into the index. Passing `None` for `document` removes the document's
/// mappings.
pub(crate) fn map_document(
    state: &mut ViewState,
    view: &dyn Serialized,
    document_id: u64,
    document: Option<&OwnedDocument>,
) -> Result<(), Error> {
    let map_result = if let Some(document) = document {
        view.map(&document.to_borrowed())?
    } else {
        Vec::new()
    };

    let keys = map_result
        .iter()
        .map(|map| map.key.clone())
        .collect::<HashSet<_>>();
    let existing_keys = if keys.is_empty() {
        state.document_map.remove(&document_id)
    } else {
        state.document_map.insert(document_id, keys.clone())
    };
    if let Some(existing_keys) = existing_keys {
        for key in existing_keys.difference(&keys) {
            remove_mapping(state, view, key, document_id)?;
        }
    }

    for map::Serialized { source, key, value } in map_result {
        save_mapping(state, view, &key, source, value)?;
    }

    Ok(())
}

/// Ensures the mappings `document_id` would produce don't collide with
/// another document's keys in a unique view. Called before a write is
/// committed so a violation leaves the database untouched.
pub(crate) fn check_unique_keys(
    state: &ViewState,
    view: &dyn Serialized,
    document_id: u64,
    mappings: &[map::Serialized],
) -> Result<(), Error> {
    for mapping in mappings {
        if let Some(entry) = state.entries.get(&mapping.key) {
            if let Some(existing) = entry
                .mappings
                .iter()
                .find(|existing| existing.source.id != document_id)
            {
                return Err(Error::UniqueKeyViolation {
                    view: view.view_name(),
                    conflicting_document: Box::new(mapping.source.clone()),
                    existing_document: Box::new(existing.source.clone()),
                });
            }
        }
    }

    Ok(())
}

fn save_mapping(
    state: &mut ViewState,
    view: &dyn Serialized,
    key: &Bytes,
    source: Header,
    value: Bytes,
) -> Result<(), Error> {
    // Before altering any data, verify that the key is unique if this is a
    // unique view.
    if view.unique() {
        if let Some(entry) = state.entries.get(key) {
            if entry.mappings[0].source.id != source.id {
                return Err(Error::UniqueKeyViolation {
                    view: view.view_name(),
                    conflicting_document: Box::new(source),
                    existing_document: Box::new(entry.mappings[0].source.clone()),
                });
            }
        }
    }

    let entry = state
        .entries
        .entry(key.clone())
        .or_insert_with(|| ViewEntry {
            key: key.clone(),
            mappings: Vec::new(),
            reduced_value: Bytes::from(Vec::new()),
        });

    if let Some(mapping) = entry
        .mappings
        .iter_mut()
        .find(|mapping| mapping.source.id == source.id)
    {
        mapping.source = source;
        mapping.value = value;
    } else {
        entry.mappings.push(EntryMapping { source, value });
    }

    recompute_reduced(entry, view)
}

fn remove_mapping(
    state: &mut ViewState,
    view: &dyn Serialized,
    key: &Bytes,
    document_id: u64,
) -> Result<(), Error> {
    let now_empty = if let Some(entry) = state.entries.get_mut(key) {
        entry
            .mappings
            .retain(|mapping| mapping.source.id != document_id);

        if entry.mappings.is_empty() {
            true
        } else {
            recompute_reduced(entry, view)?;
            false
        }
    } else {
        false
    };

    if now_empty {
        state.entries.remove(key);
    }

    Ok(())
}

fn recompute_reduced(entry: &mut ViewEntry, view: &dyn Serialized) -> Result<(), Error> {
    let mappings = entry
        .mappings
        .iter()
        .map(|mapping| (&entry.key[..], &mapping.value[..]))
        .collect::<Vec<_>>();
    match view.reduce(&mappings, false) {
        Ok(reduced) => {
            entry.reduced_value = Bytes::from(reduced);
            Ok(())
        }
        Err(Error::ReduceUnimplemented) => Ok(()),
        Err(other) => Err(other),
    }
}
