use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DCO_SITE_LOG_XMLNS, HSPH_DOMAIN, XFORM_DOC_TYPE};
use crate::document::Emit;
use crate::schema::view::map::Mappings;
use crate::schema::view::DefaultViewSerialization;
use crate::schema::{
    Collection, CollectionDocument, CollectionName, CollectionSerializer, CollectionViewSchema,
    Name, Schematic, View, ViewMapResult,
};
use crate::Error;

/// A form submission, as produced by a mobile data-collection client.
///
/// Submissions are stored as JSON so that documents synced from the field
/// can be indexed without an intermediate conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    /// The document type. Submitted form instances are `XFormInstance`.
    #[serde(default)]
    pub doc_type: String,

    /// The project domain the submission belongs to.
    #[serde(default)]
    pub domain: String,

    /// The submitted form body.
    pub form: FormData,
}

/// The body of a submitted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormData {
    /// The namespace of the form definition this submission was filled
    /// against.
    #[serde(default, rename = "@xmlns")]
    pub xmlns: String,

    /// The submitted answers.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl FormData {
    /// Returns the answer `name` as text. Numeric answers are rendered in
    /// decimal, the way they round-trip through form exports. Empty answers
    /// count as absent.
    #[must_use]
    pub fn text_field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

impl FormSubmission {
    /// Returns true if this document is a form submitted to the HSPH project
    /// domain.
    #[must_use]
    pub fn is_hsph_form(&self) -> bool {
        self.doc_type == XFORM_DOC_TYPE && self.domain == HSPH_DOMAIN
    }

    /// Returns true if this submission was filled against the DCO site log
    /// form.
    #[must_use]
    pub fn is_dco_site_log_report(&self) -> bool {
        self.form.xmlns == DCO_SITE_LOG_XMLNS
    }

    /// Extracts the site this submission reports on, if it names one.
    #[must_use]
    pub fn site_info(&self) -> Option<SiteInfo> {
        let region = self.form.text_field("region_id");
        let district = self.form.text_field("district_id");
        let site_number = self.form.text_field("site_number");
        let site_id = self.form.text_field("site_id").or_else(|| {
            // Early site log versions only carried the site's components.
            match (&region, &district, &site_number) {
                (Some(region), Some(district), Some(site_number)) => {
                    Some(format!("{region}-{district}-{site_number}"))
                }
                _ => None,
            }
        })?;

        Some(SiteInfo {
            region,
            district,
            site_number,
            site_id,
        })
    }
}

/// The site identity carried by a site log submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    /// The region the site belongs to.
    pub region: Option<String>,
    /// The district the site belongs to.
    pub district: Option<String>,
    /// The site's number within its district.
    pub site_number: Option<String>,
    /// The site's unique id.
    pub site_id: String,
}

impl Collection for FormSubmission {
    fn collection_name() -> CollectionName {
        CollectionName::new(HSPH_DOMAIN, "forms")
    }

    fn define_views(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_view(FacilitiesBySite)
    }

    fn serializer() -> CollectionSerializer {
        CollectionSerializer::Json
    }
}

/// Indexes DCO site log submissions by the facility site they report on.
///
/// A submission that is not an HSPH form, was filled against a different
/// form, or doesn't name a site is omitted from the index.
#[derive(Debug, Clone)]
pub struct FacilitiesBySite;

impl View for FacilitiesBySite {
    type Collection = FormSubmission;
    type Key = String;
    type Value = ();

    fn name(&self) -> Name {
        Name::new("facilities")
    }
}

impl CollectionViewSchema for FacilitiesBySite {
    type View = Self;

    fn map(&self, document: CollectionDocument<FormSubmission>) -> ViewMapResult<Self> {
        let submission = &document.contents;
        if submission.is_hsph_form() && submission.is_dco_site_log_report() {
            if let Some(site) = submission.site_info() {
                return document.header.emit_key(site.site_id);
            }
        }

        Ok(Mappings::none())
    }
}

impl DefaultViewSerialization for FacilitiesBySite {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn site_log(fields: Value) -> FormSubmission {
        serde_json::from_value(json!({
            "doc_type": "XFormInstance",
            "domain": "hsph",
            "form": {
                "@xmlns": DCO_SITE_LOG_XMLNS,
                "meta": {"username": "dco-7"},
            },
        }))
        .map(|mut submission: FormSubmission| {
            if let Value::Object(fields) = fields {
                submission.form.fields.extend(fields);
            }
            submission
        })
        .unwrap()
    }

    #[test]
    fn recognizes_site_log_reports() {
        let submission = site_log(json!({"site_id": "2-15-3"}));
        assert!(submission.is_hsph_form());
        assert!(submission.is_dco_site_log_report());

        let mut other_domain = submission.clone();
        other_domain.domain = String::from("tndrc");
        assert!(!other_domain.is_hsph_form());

        let mut other_form = submission.clone();
        other_form.form.xmlns = String::from("http://openrosa.org/formdesigner/other");
        assert!(!other_form.is_dco_site_log_report());

        let mut case_doc = submission;
        case_doc.doc_type = String::from("CommCareCase");
        assert!(!case_doc.is_hsph_form());
    }

    #[test]
    fn site_info_prefers_the_explicit_id() {
        let submission = site_log(json!({
            "site_id": "2-15-3",
            "region_id": "2",
            "district_id": "15",
            "site_number": "3",
        }));
        let site = submission.site_info().unwrap();
        assert_eq!(site.site_id, "2-15-3");
        assert_eq!(site.region.as_deref(), Some("2"));
    }

    #[test]
    fn site_info_composes_the_id_from_components() {
        let submission = site_log(json!({
            "region_id": "2",
            "district_id": "15",
            "site_number": 3,
        }));
        assert_eq!(submission.site_info().unwrap().site_id, "2-15-3");
    }

    #[test]
    fn site_info_requires_an_identifiable_site() {
        let submission = site_log(json!({"region_id": "2", "site_number": "3"}));
        assert!(submission.site_info().is_none());

        let empty = site_log(json!({"site_id": ""}));
        assert!(empty.site_info().is_none());
    }
}
