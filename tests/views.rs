//! Engine-level tests driven by a test-only collection.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sitestore::document::Emit;
use sitestore::schema::view::map::Mappings;
use sitestore::schema::view::DefaultViewSerialization;
use sitestore::schema::{
    Collection, CollectionDocument, CollectionName, CollectionViewSchema, Name, ReduceResult,
    Schematic, SerializedCollection, View, ViewMapResult, ViewMappedValue,
};
use sitestore::{define_basic_mapped_view, Database, Error};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    tags: Vec<String>,
    quantity: u32,
}

impl Collection for Shipment {
    fn collection_name() -> CollectionName {
        CollectionName::new("logistics", "shipments")
    }

    fn define_views(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_view(ShipmentsByTag)?;
        schema.define_view(ShipmentsByQuantity)
    }
}

/// Emits one mapping per tag, valued with the shipment's quantity.
#[derive(Debug, Clone)]
struct ShipmentsByTag;

impl View for ShipmentsByTag {
    type Collection = Shipment;
    type Key = String;
    type Value = u32;

    fn name(&self) -> Name {
        Name::new("by-tag")
    }
}

impl CollectionViewSchema for ShipmentsByTag {
    type View = Self;

    fn map(&self, document: CollectionDocument<Shipment>) -> ViewMapResult<Self> {
        let mut mappings = Mappings::none();
        for tag in &document.contents.tags {
            mappings = mappings.and(
                document
                    .header
                    .emit_key_and_value(tag.clone(), document.contents.quantity)?,
            );
        }
        Ok(mappings)
    }

    fn reduce(&self, mappings: &[ViewMappedValue<Self>], _rereduce: bool) -> ReduceResult<Self> {
        Ok(mappings.iter().map(|mapping| mapping.value).sum())
    }
}

impl DefaultViewSerialization for ShipmentsByTag {}

define_basic_mapped_view!(
    ShipmentsByQuantity,
    Shipment,
    "by-quantity",
    u32,
    |document: CollectionDocument<Shipment>| {
        let quantity = document.contents.quantity;
        document.header.emit_key(quantity)
    }
);

fn shipment(tags: &[&str], quantity: u32) -> Shipment {
    Shipment {
        tags: tags.iter().map(ToString::to_string).collect(),
        quantity,
    }
}

#[test]
fn multi_emit_views_index_every_key() -> Result<()> {
    let db = Database::new::<Shipment>()?;

    shipment(&["cold-chain", "fragile"], 10).push_into(&db)?;
    shipment(&["cold-chain"], 3).push_into(&db)?;
    shipment(&[], 99).push_into(&db)?;

    let cold_chain = db
        .view::<ShipmentsByTag>()
        .with_key(String::from("cold-chain"))
        .query()?;
    assert_eq!(cold_chain.len(), 2);

    let total: u32 = db
        .view::<ShipmentsByTag>()
        .with_key(String::from("cold-chain"))
        .reduce()?;
    assert_eq!(total, 13);

    // The untagged shipment appears in no entries.
    let all = db.view::<ShipmentsByTag>().query()?;
    assert_eq!(all.len(), 3);

    Ok(())
}

#[test]
fn updates_remove_stale_keys() -> Result<()> {
    let db = Database::new::<Shipment>()?;

    let mut doc = shipment(&["cold-chain", "fragile"], 10).push_into(&db)?;
    doc.contents.tags = vec![String::from("fragile")];
    doc.update(&db)?;

    assert!(db
        .view::<ShipmentsByTag>()
        .with_key(String::from("cold-chain"))
        .query()?
        .is_empty());
    assert_eq!(
        db.view::<ShipmentsByTag>()
            .with_key(String::from("fragile"))
            .query()?
            .len(),
        1
    );

    // Dropping every tag removes the document from the view entirely.
    doc.contents.tags.clear();
    doc.update(&db)?;
    assert!(db.view::<ShipmentsByTag>().query()?.is_empty());

    Ok(())
}

#[test]
fn range_queries_use_key_order() -> Result<()> {
    let db = Database::new::<Shipment>()?;

    for quantity in [5_u32, 20, 270, 1, 42] {
        shipment(&["bulk"], quantity).push_into(&db)?;
    }

    let in_range = db
        .view::<ShipmentsByQuantity>()
        .with_key_range(5_u32..=42)
        .query()?;
    assert_eq!(
        in_range.iter().map(|map| map.key).collect::<Vec<_>>(),
        vec![5, 20, 42]
    );

    let top_two = db
        .view::<ShipmentsByQuantity>()
        .descending()
        .limit(2)
        .query()?;
    assert_eq!(
        top_two.iter().map(|map| map.key).collect::<Vec<_>>(),
        vec![270, 42]
    );

    let none = db
        .view::<ShipmentsByQuantity>()
        .with_key_range(100_u32..50)
        .query()?;
    assert!(none.is_empty());

    Ok(())
}

#[test]
fn queries_see_writes_made_after_earlier_queries() -> Result<()> {
    let db = Database::new::<Shipment>()?;

    shipment(&["bulk"], 1).push_into(&db)?;
    assert_eq!(db.view::<ShipmentsByTag>().query()?.len(), 1);

    shipment(&["bulk"], 2).push_into(&db)?;
    let doc = shipment(&["bulk"], 3).push_into(&db)?;
    doc.delete(&db)?;

    assert_eq!(db.view::<ShipmentsByTag>().query()?.len(), 2);
    let total: u32 = db
        .view::<ShipmentsByTag>()
        .with_key(String::from("bulk"))
        .reduce()?;
    assert_eq!(total, 3);

    Ok(())
}

#[test]
fn query_with_docs_returns_the_source_documents() -> Result<()> {
    let db = Database::new::<Shipment>()?;

    shipment(&["fragile"], 7).push_into(&db)?;

    let entries = db
        .view::<ShipmentsByTag>()
        .with_key(String::from("fragile"))
        .query_with_docs()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].document.contents.quantity, 7);
    assert_eq!(entries[0].value, 7);

    Ok(())
}

#[test]
fn collections_track_ids_and_revisions() -> Result<()> {
    let db = Database::new::<Shipment>()?;
    assert!(db.schematic().contains_collection::<Shipment>());

    let first = shipment(&["bulk"], 1).push_into(&db)?;
    let second = shipment(&["bulk"], 2).push_into(&db)?;
    assert_eq!(first.header.id, 1);
    assert_eq!(second.header.id, 2);

    // An update that doesn't change the contents doesn't advance the
    // revision.
    let mut unchanged = Shipment::get(first.header.id, &db)?.unwrap();
    let revision = unchanged.header.revision;
    unchanged.update(&db)?;
    assert_eq!(unchanged.header.revision, revision);

    let listed = Shipment::list(&db)?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].contents.quantity, 2);

    Ok(())
}
