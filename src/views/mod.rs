use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use arc_bytes::serde::Bytes;

use crate::document::Header;

pub(crate) mod mapper;

/// All mappings for a single encoded key in a view's index.
#[derive(Debug, Clone)]
pub(crate) struct ViewEntry {
    pub key: Bytes,
    pub mappings: Vec<EntryMapping>,
    pub reduced_value: Bytes,
}

#[derive(Debug, Clone)]
pub(crate) struct EntryMapping {
    pub source: Header,
    pub value: Bytes,
}

/// The materialized state of a single view.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    /// Entries ordered by encoded key.
    pub entries: BTreeMap<Bytes, ViewEntry>,
    /// Document id -> the keys the document currently emits. Used to remove
    /// stale mappings when a document is re-mapped.
    pub document_map: HashMap<u64, HashSet<Bytes>>,
    /// Documents whose mappings are out of date.
    pub invalidated: BTreeSet<u64>,
}
