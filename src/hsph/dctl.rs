use serde::{Deserialize, Serialize};

use super::HSPH_DOMAIN;
use crate::database::Database;
use crate::document::Emit;
use crate::schema::{Collection, CollectionDocument, CollectionName, Schematic};
use crate::{define_basic_unique_mapped_view, Error};

/// A data-collection team lead fixture item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dctl {
    /// The team lead's fixture id.
    pub id: String,
    /// The team lead's display name.
    pub name: String,
}

impl Collection for Dctl {
    fn collection_name() -> CollectionName {
        CollectionName::new(HSPH_DOMAIN, "dctls")
    }

    fn define_views(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_view(ByDctlId)
    }
}

define_basic_unique_mapped_view!(
    ByDctlId,
    Dctl,
    "by-dctl-id",
    String,
    |document: CollectionDocument<Dctl>| document.header.emit_key(document.contents.id.clone())
);

/// Returns each team lead's `(name, id)` pair, ordered by id.
pub fn dctl_list(database: &Database) -> Result<Vec<(String, String)>, Error> {
    Ok(database
        .view::<ByDctlId>()
        .query_with_docs()?
        .into_iter()
        .map(|entry| (entry.document.contents.name, entry.key))
        .collect())
}
