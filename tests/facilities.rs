//! End-to-end tests for the HSPH field-reporting schema.

use anyhow::Result;
use serde_json::json;
use sitestore::document::BorrowedDocument;
use sitestore::hsph::{
    classified_site_ids, dctl_list, region_site_count, Classification, Dctl, FacilitiesBySite,
    FacilityDirectory, FormSubmission, Hsph, Site, DCO_SITE_LOG_XMLNS,
};
use sitestore::schema::view::Serialized;
use sitestore::schema::{InsertError, SerializedCollection};
use sitestore::{Database, Error};

fn site_log(site_fields: serde_json::Value) -> FormSubmission {
    let mut document = json!({
        "doc_type": "XFormInstance",
        "domain": "hsph",
        "form": {
            "@xmlns": DCO_SITE_LOG_XMLNS,
            "meta": {"username": "dco-7"},
        },
    });
    document["form"]
        .as_object_mut()
        .unwrap()
        .extend(site_fields.as_object().unwrap().clone());
    serde_json::from_value(document).unwrap()
}

fn site(region: (&str, &str), district: (&str, &str), number: &str, name: &str, ihf_chf: &str) -> Site {
    serde_json::from_value(json!({
        "region_id": region.0,
        "region_name": region.1,
        "district_id": district.0,
        "district_name": district.1,
        "site_number": number,
        "site_name": name,
        "site_id": format!("{}-{}-{}", region.0, district.0, number),
        "ihf_chf": ihf_chf,
    }))
    .unwrap()
}

#[test]
fn facilities_view_indexes_site_log_reports() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    site_log(json!({"site_id": "2-15-3"})).push_into(&db)?;
    site_log(json!({"site_id": "2-15-4"})).push_into(&db)?;
    // A second report for the same site.
    site_log(json!({"site_id": "2-15-3"})).push_into(&db)?;

    // None of these are site log reports for the study.
    let mut other_domain = site_log(json!({"site_id": "9-9-9"}));
    other_domain.domain = String::from("tndrc");
    other_domain.push_into(&db)?;

    let mut other_form = site_log(json!({"site_id": "9-9-9"}));
    other_form.form.xmlns = String::from("http://openrosa.org/formdesigner/registration");
    other_form.push_into(&db)?;

    let mut case_doc = site_log(json!({"site_id": "9-9-9"}));
    case_doc.doc_type = String::from("CommCareCase");
    case_doc.push_into(&db)?;

    // A report that doesn't name a site emits nothing.
    site_log(json!({})).push_into(&db)?;

    let mappings = db.view::<FacilitiesBySite>().query()?;
    let mut sites = mappings.iter().map(|map| map.key.as_str()).collect::<Vec<_>>();
    assert_eq!(sites, vec!["2-15-3", "2-15-3", "2-15-4"]);
    sites.dedup();
    assert_eq!(sites, vec!["2-15-3", "2-15-4"]);

    let for_one_site = db
        .view::<FacilitiesBySite>()
        .with_key(String::from("2-15-3"))
        .query()?;
    assert_eq!(for_one_site.len(), 2);

    Ok(())
}

#[test]
fn facilities_view_follows_document_updates() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    let mut report = site_log(json!({"site_id": "2-15-3"})).push_into(&db)?;
    assert_eq!(
        db.view::<FacilitiesBySite>().query()?[0].key,
        "2-15-3"
    );

    // Correcting the report moves it to the new site's key.
    report
        .contents
        .form
        .fields
        .insert(String::from("site_id"), json!("2-16-1"));
    report.update(&db)?;

    let mappings = db.view::<FacilitiesBySite>().query()?;
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].key, "2-16-1");

    report.delete(&db)?;
    assert!(db.view::<FacilitiesBySite>().query()?.is_empty());

    Ok(())
}

#[test]
fn facilities_view_composes_site_ids_from_components() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    site_log(json!({
        "region_id": "2",
        "district_id": "15",
        "site_number": "3",
    }))
    .push_into(&db)?;

    let mappings = db.view::<FacilitiesBySite>().query()?;
    assert_eq!(mappings[0].key, "2-15-3");

    Ok(())
}

#[test]
fn facilities_view_has_no_reduce() -> Result<()> {
    let db = Database::new::<Hsph>()?;
    site_log(json!({"site_id": "2-15-3"})).push_into(&db)?;

    match db.view::<FacilitiesBySite>().reduce() {
        Err(Error::ReduceUnimplemented) => Ok(()),
        other => panic!("expected ReduceUnimplemented, got {other:?}"),
    }
}

#[test]
fn documents_that_do_not_deserialize_are_omitted() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    let view = db.schematic().view::<FacilitiesBySite>()?;
    let document = BorrowedDocument::new(1, &b"{\"form\": 7}"[..]);
    assert!(view.map(&document)?.is_empty());

    Ok(())
}

#[test]
fn stale_updates_are_conflicts() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    let report = site_log(json!({"site_id": "2-15-3"})).push_into(&db)?;
    let mut current = FormSubmission::get(report.header.id, &db)?.unwrap();
    let mut stale = FormSubmission::get(report.header.id, &db)?.unwrap();

    current
        .contents
        .form
        .fields
        .insert(String::from("site_id"), json!("2-16-1"));
    current.update(&db)?;

    stale
        .contents
        .form
        .fields
        .insert(String::from("site_id"), json!("2-17-1"));
    match stale.update(&db) {
        Err(Error::DocumentConflict(collection, _)) => {
            assert_eq!(collection.to_string(), "hsph.forms");
        }
        other => panic!("expected DocumentConflict, got {other:?}"),
    }

    Ok(())
}

#[test]
fn site_fixtures_assemble_into_a_directory() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    site(("2", "North"), ("15", "Hillside"), "3", "Hillside CHC", "chf").push_into(&db)?;
    site(("2", "North"), ("15", "Hillside"), "4", "District Hospital", "ihf").push_into(&db)?;
    site(("2", "North"), ("16", "Lakeview"), "1", "Lakeview PHC", "chf").push_into(&db)?;
    site(("3", "South"), ("21", "Meadows"), "1", "Meadows GH", "ifh").push_into(&db)?;
    // Unclassified sites still appear in the directory.
    site(("3", "South"), ("21", "Meadows"), "2", "Meadows Annex", "").push_into(&db)?;

    let directory = FacilityDirectory::build(&db)?;
    assert_eq!(directory.regions.len(), 2);
    let north = &directory.regions["2"];
    assert_eq!(north.name, "North");
    assert_eq!(north.districts["15"].sites.len(), 2);
    assert_eq!(north.districts["15"].sites["3"].name, "Hillside CHC");
    assert!(directory.contains("3", "21", "2"));
    assert!(!directory.contains("3", "22", "1"));

    assert_eq!(region_site_count(&db, "2")?, 3);
    assert_eq!(region_site_count(&db, "3")?, 2);
    assert_eq!(region_site_count(&db, "4")?, 0);

    Ok(())
}

#[test]
fn classification_groups_site_ids() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    site(("2", "North"), ("15", "Hillside"), "3", "Hillside CHC", "chf").push_into(&db)?;
    site(("2", "North"), ("15", "Hillside"), "4", "District Hospital", "ihf").push_into(&db)?;
    // The legacy typo still counts as an in-hospital facility.
    site(("3", "South"), ("21", "Meadows"), "1", "Meadows GH", "ifh").push_into(&db)?;
    // A site without a classification is skipped.
    site(("3", "South"), ("21", "Meadows"), "2", "Meadows Annex", "").push_into(&db)?;

    let classified = classified_site_ids(&db)?;
    assert_eq!(
        classified[&Classification::Ihf],
        vec![String::from("2-15-4"), String::from("3-21-1")]
    );
    assert_eq!(classified[&Classification::Chf], vec![String::from("2-15-3")]);

    Ok(())
}

#[test]
fn selected_site_ids_respects_the_selection() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    site(("2", "North"), ("15", "Hillside"), "3", "Hillside CHC", "chf").push_into(&db)?;
    site(("2", "North"), ("16", "Lakeview"), "1", "Lakeview PHC", "chf").push_into(&db)?;
    site(("3", "South"), ("21", "Meadows"), "1", "Meadows GH", "ihf").push_into(&db)?;

    // Select only district 15 in region 2.
    let mut selection = FacilityDirectory::build(&db)?;
    selection
        .regions
        .get_mut("2")
        .unwrap()
        .districts
        .remove("16");
    selection.regions.remove("3");

    let selected = sitestore::hsph::selected_site_ids(&db, &selection)?;
    assert_eq!(selected[&Classification::Chf], vec![String::from("2-15-3")]);
    assert!(!selected.contains_key(&Classification::Ihf));

    Ok(())
}

#[test]
fn dctl_ids_are_unique() -> Result<()> {
    let db = Database::new::<Hsph>()?;

    Dctl {
        id: String::from("dctl-1"),
        name: String::from("A. Rao"),
    }
    .push_into(&db)?;
    Dctl {
        id: String::from("dctl-2"),
        name: String::from("S. Iyer"),
    }
    .push_into(&db)?;

    let duplicate = Dctl {
        id: String::from("dctl-1"),
        name: String::from("Someone Else"),
    }
    .push_into(&db);
    match duplicate {
        Err(InsertError {
            error: Error::UniqueKeyViolation { view, .. },
            contents,
        }) => {
            assert_eq!(view.to_string(), "hsph.dctls.by-dctl-id");
            assert_eq!(contents.name, "Someone Else");
        }
        other => panic!("expected UniqueKeyViolation, got {other:?}"),
    }

    // The failed insert left the collection untouched.
    assert_eq!(
        dctl_list(&db)?,
        vec![
            (String::from("A. Rao"), String::from("dctl-1")),
            (String::from("S. Iyer"), String::from("dctl-2")),
        ]
    );

    Ok(())
}
