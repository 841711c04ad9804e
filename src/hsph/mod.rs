//! The HSPH field-reporting schema.
//!
//! The study collects facility data through mobile form submissions. Site
//! log reports filed by data collection officers are indexed by the
//! [`FacilitiesBySite`] view, and the site and team-lead fixtures back the
//! reporting filters.

use crate::schema::{Schema, SchemaName, Schematic};
use crate::Error;

mod dctl;
mod forms;
mod sites;

pub use self::dctl::{dctl_list, ByDctlId, Dctl};
pub use self::forms::{FacilitiesBySite, FormData, FormSubmission, SiteInfo};
pub use self::sites::{
    classified_site_ids, region_site_count, selected_site_ids, Classification, DistrictEntry,
    FacilityDirectory, FacilityStatus, RegionEntry, Site, SiteEntry, SitesByClassification,
    SitesByRegion, UnrecognizedValue,
};

/// The project domain all collections in this schema belong to.
pub const HSPH_DOMAIN: &str = "hsph";

/// The document type of a submitted form instance.
pub const XFORM_DOC_TYPE: &str = "XFormInstance";

/// The namespace of the DCO site log form.
pub const DCO_SITE_LOG_XMLNS: &str =
    "http://openrosa.org/formdesigner/A6023974-B5D7-4B18-97CE-8158BF45C9F4";

/// The field-reporting schema: submitted forms plus the site and team-lead
/// fixtures.
#[derive(Debug)]
pub struct Hsph;

impl Schema for Hsph {
    fn schema_name() -> SchemaName {
        SchemaName::new(HSPH_DOMAIN, "field-reports")
    }

    fn define_collections(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_collection::<FormSubmission>()?;
        schema.define_collection::<Site>()?;
        schema.define_collection::<Dctl>()
    }
}
