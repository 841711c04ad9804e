use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::HSPH_DOMAIN;
use crate::database::Database;
use crate::document::Emit;
use crate::schema::view::map::Mappings;
use crate::schema::view::DefaultViewSerialization;
use crate::schema::{
    Collection, CollectionDocument, CollectionName, CollectionViewSchema, Name, ReduceResult,
    Schematic, View, ViewMapResult, ViewMappedValue,
};
use crate::{define_basic_mapped_view, Error};

/// A facility site fixture item.
///
/// Fixture rows are loaded from spreadsheets maintained by the study staff,
/// so the classification and status fields tolerate the irregular values
/// that appear in that data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    /// The id of the region containing this site.
    pub region_id: String,
    /// The region's display name.
    pub region_name: String,
    /// The id of the district containing this site.
    pub district_id: String,
    /// The district's display name.
    pub district_name: String,
    /// The site's number within its district.
    pub site_number: String,
    /// The site's display name.
    pub site_name: String,
    /// The site's unique id.
    pub site_id: String,
    /// Whether the site is an in-hospital or community facility. `None` when
    /// the fixture row carries no recognizable classification.
    #[serde(default, rename = "ihf_chf", deserialize_with = "lenient")]
    pub classification: Option<Classification>,
    /// Where the facility is in the study's onboarding sequence.
    #[serde(default, deserialize_with = "lenient")]
    pub facility_status: Option<FacilityStatus>,
}

/// Parses optional fixture fields, treating unrecognized values as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.parse().ok()))
}

/// A value that doesn't name a known variant.
#[derive(thiserror::Error, Debug)]
#[error("unrecognized value: {0}")]
pub struct UnrecognizedValue(String);

/// The classification of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// An in-hospital facility.
    Ihf,
    /// A community health facility.
    Chf,
}

impl Classification {
    /// Returns the slug stored in fixture data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ihf => "ihf",
            Self::Chf => "chf",
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ihf" | "ifh" => Ok(Self::Ihf), // "ifh" appears in legacy fixture rows
            "chf" => Ok(Self::Chf),
            _ => Err(UnrecognizedValue(value.to_string())),
        }
    }
}

impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where a facility is in the study's onboarding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacilityStatus {
    /// The facility has agreed to participate.
    OnBoard,
    /// Stillbirth registers have been deployed to the facility.
    SbrDeployed,
    /// The facility is collecting baseline data.
    Baseline,
    /// The facility is submitting trial data.
    TrialData,
}

impl FacilityStatus {
    /// Returns the status code stored in fixture data.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::OnBoard => "-1",
            Self::SbrDeployed => "0",
            Self::Baseline => "1",
            Self::TrialData => "2",
        }
    }
}

impl Display for FacilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OnBoard => "On Board",
            Self::SbrDeployed => "S.B.R. Deployed",
            Self::Baseline => "Baseline",
            Self::TrialData => "Trial Data",
        })
    }
}

impl FromStr for FacilityStatus {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "-1" => Ok(Self::OnBoard),
            "0" => Ok(Self::SbrDeployed),
            "1" => Ok(Self::Baseline),
            "2" => Ok(Self::TrialData),
            _ => Err(UnrecognizedValue(value.to_string())),
        }
    }
}

impl Serialize for FacilityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl Collection for Site {
    fn collection_name() -> CollectionName {
        CollectionName::new(HSPH_DOMAIN, "sites")
    }

    fn define_views(schema: &mut Schematic) -> Result<(), Error> {
        schema.define_view(SitesByRegion)?;
        schema.define_view(SitesByClassification)
    }
}

/// Indexes sites by the region that contains them. The reduced value is the
/// number of sites in the region.
#[derive(Debug, Clone)]
pub struct SitesByRegion;

impl View for SitesByRegion {
    type Collection = Site;
    type Key = String;
    type Value = u32;

    fn name(&self) -> Name {
        Name::new("by-region")
    }
}

impl CollectionViewSchema for SitesByRegion {
    type View = Self;

    fn map(&self, document: CollectionDocument<Site>) -> ViewMapResult<Self> {
        let region_id = document.contents.region_id.clone();
        document.header.emit_key_and_value(region_id, 1)
    }

    fn reduce(
        &self,
        mappings: &[ViewMappedValue<Self>],
        _rereduce: bool,
    ) -> ReduceResult<Self> {
        Ok(mappings.iter().map(|mapping| mapping.value).sum())
    }
}

impl DefaultViewSerialization for SitesByRegion {}

define_basic_mapped_view!(
    SitesByClassification,
    Site,
    "by-classification",
    String,
    String,
    |document: CollectionDocument<Site>| {
        let site = &document.contents;
        match site.classification {
            Some(classification) => document
                .header
                .emit_key_and_value(classification.to_string(), site.site_id.clone()),
            None => Ok(Mappings::none()),
        }
    }
);

/// The region → district → site hierarchy assembled from the site fixtures.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FacilityDirectory {
    /// Regions keyed by region id.
    pub regions: BTreeMap<String, RegionEntry>,
}

/// A region and the districts it contains.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegionEntry {
    /// The region's display name.
    pub name: String,
    /// Districts keyed by district id.
    pub districts: BTreeMap<String, DistrictEntry>,
}

/// A district and the sites it contains.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DistrictEntry {
    /// The district's display name.
    pub name: String,
    /// Sites keyed by site number.
    pub sites: BTreeMap<String, SiteEntry>,
}

/// A single site in the directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SiteEntry {
    /// The site's display name.
    pub name: String,
    /// The site's unique id.
    pub site_id: String,
}

impl FacilityDirectory {
    /// Assembles the directory from every site fixture in `database`.
    pub fn build(database: &Database) -> Result<Self, Error> {
        let mut directory = Self::default();
        for entry in database.view::<SitesByRegion>().query_with_docs()? {
            let site = entry.document.contents;
            let region = directory.regions.entry(site.region_id).or_default();
            if region.name.is_empty() {
                region.name = site.region_name;
            }
            let district = region.districts.entry(site.district_id).or_default();
            if district.name.is_empty() {
                district.name = site.district_name;
            }
            district.sites.entry(site.site_number).or_insert(SiteEntry {
                name: site.site_name,
                site_id: site.site_id,
            });
        }

        Ok(directory)
    }

    /// Returns true if the directory contains a site at the location given.
    #[must_use]
    pub fn contains(&self, region_id: &str, district_id: &str, site_number: &str) -> bool {
        self.regions
            .get(region_id)
            .and_then(|region| region.districts.get(district_id))
            .map_or(false, |district| district.sites.contains_key(site_number))
    }
}

/// Groups every classified site's id by its facility classification. Sites
/// without a recognized classification are skipped.
pub fn classified_site_ids(
    database: &Database,
) -> Result<BTreeMap<Classification, Vec<String>>, Error> {
    let grouped = database
        .view::<SitesByClassification>()
        .query()?
        .into_iter()
        .filter_map(|mapping| Some((mapping.key.parse::<Classification>().ok()?, mapping.value)))
        .into_group_map();
    Ok(grouped.into_iter().collect())
}

/// Like [`classified_site_ids`], restricted to sites present in `selection`.
pub fn selected_site_ids(
    database: &Database,
    selection: &FacilityDirectory,
) -> Result<BTreeMap<Classification, Vec<String>>, Error> {
    let grouped = database
        .view::<SitesByClassification>()
        .query_with_docs()?
        .into_iter()
        .filter(|entry| {
            let site = &entry.document.contents;
            selection.contains(&site.region_id, &site.district_id, &site.site_number)
        })
        .filter_map(|entry| Some((entry.key.parse::<Classification>().ok()?, entry.value)))
        .into_group_map();
    Ok(grouped.into_iter().collect())
}

/// Counts the sites recorded for `region_id`.
pub fn region_site_count(database: &Database, region_id: &str) -> Result<u32, Error> {
    database
        .view::<SitesByRegion>()
        .with_key(region_id.to_owned())
        .reduce()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classification_parses_fixture_values() {
        assert_eq!("ihf".parse::<Classification>().unwrap(), Classification::Ihf);
        assert_eq!("IHF".parse::<Classification>().unwrap(), Classification::Ihf);
        assert_eq!("chf".parse::<Classification>().unwrap(), Classification::Chf);
        // The typo that appears in some fixture rows.
        assert_eq!("ifh".parse::<Classification>().unwrap(), Classification::Ihf);
        "community".parse::<Classification>().unwrap_err();
    }

    #[test]
    fn facility_status_round_trips_its_code() {
        for status in [
            FacilityStatus::OnBoard,
            FacilityStatus::SbrDeployed,
            FacilityStatus::Baseline,
            FacilityStatus::TrialData,
        ] {
            assert_eq!(status.code().parse::<FacilityStatus>().unwrap(), status);
        }
        assert_eq!(FacilityStatus::SbrDeployed.to_string(), "S.B.R. Deployed");
    }

    #[test]
    fn fixture_rows_deserialize_leniently() {
        let site: Site = serde_json::from_value(json!({
            "region_id": "2",
            "region_name": "North",
            "district_id": "15",
            "district_name": "Hillside",
            "site_number": "3",
            "site_name": "Hillside CHC",
            "site_id": "2-15-3",
            "ihf_chf": "IFH",
            "facility_status": "0",
        }))
        .unwrap();
        assert_eq!(site.classification, Some(Classification::Ihf));
        assert_eq!(site.facility_status, Some(FacilityStatus::SbrDeployed));

        let unclassified: Site = serde_json::from_value(json!({
            "region_id": "2",
            "region_name": "North",
            "district_id": "15",
            "district_name": "Hillside",
            "site_number": "4",
            "site_name": "Annex",
            "site_id": "2-15-4",
            "ihf_chf": "",
        }))
        .unwrap();
        assert_eq!(unclassified.classification, None);
        assert_eq!(unclassified.facility_status, None);
    }
}
