use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::{CollectionMutator, RecordSet};
use crate::constants::resources::{COUNTRY_RESOURCE, LANGUAGE_CODE_KEY};
use crate::entities::{
    Currency, Language, Referrer, Region, SubRegion, debug_record, memoized,
    resolve_identifiers, resolve_one,
};
use crate::errors::AtlasError;
use crate::record::{FieldValues, Record, RecordAccessor};
use crate::schema::FieldDecl;
use crate::source::ListLoader;
use crate::value::Value;

const COUNTRY_FIELDS: &[FieldDecl] = &[
    // name
    mapped!("officialName", "string", source = "name_official", identifier = true, required = true),
    mapped!("shortName", "string", source = "name_short", identifier = true, required = true),
    mapped!("altNames", "array", source = "name_alt", identifier = true, required = true),
    // status
    mapped!("isExist", "bool", source = "status_isExist", identifier = false, required = true),
    mapped!("isSovereignState", "bool", source = "status_isSovereignState", identifier = false, required = false),
    mapped!("dependentType", "string", source = "status_dependentType", identifier = false, required = false),
    mapped!("dependOn", "array", source = "status_dependOn", identifier = false, required = false),
    // iso3166
    mapped!("alpha2Code", "string", source = "iso3166_codes_alpha2", identifier = true, required = true),
    mapped!("alpha3Code", "string", source = "iso3166_codes_alpha3", identifier = true, required = true),
    mapped!("numericCode", "string", source = "iso3166_codes_numeric", identifier = true, required = true),
    mapped!("assignmentYear", "string", source = "iso3166_assignedAt", identifier = false, required = true),
    mapped!("unAssignmentYear", "string", source = "iso3166_unAssignedAt", identifier = false, required = false),
    mapped!("transformType", "string", source = "iso3166_transformType", identifier = false, required = false),
    mapped!("transformTo", "array", source = "iso3166_transformTo", identifier = false, required = false),
    // location
    mapped!("regionCode", "string", source = "location_regionCode", identifier = false, required = true),
    mapped!("subRegionCode", "string", source = "location_subRegionCode", identifier = false, required = true),
    mapped!("isLandLocked", "bool", source = "location_isLandLocked", identifier = false, required = true),
    mapped!("borders", "array", source = "location_borders", identifier = false, required = true),
    // usage
    mapped!("languages", "array", source = "languages", identifier = false, required = true),
    mapped!("currencies", "array", source = "currencies", identifier = false, required = true),
    // extra
    mapped!("area", "float", source = "extra_area", identifier = false, required = false),
    mapped!("population", "int", source = "extra_population", identifier = false, required = true),
    mapped!("callingCodes", "array", source = "extra_callingCodes", identifier = false, required = false),
];

/// Country or dependent territory as listed in ISO 3166, current or withdrawn.
#[derive(Clone)]
pub struct Country {
    values: FieldValues,
    depend_on: OnceLock<RecordSet<Country>>,
    transform_to: OnceLock<RecordSet<Country>>,
    borders: OnceLock<RecordSet<Country>>,
    region: OnceLock<Option<Arc<Region>>>,
    sub_region: OnceLock<Option<Arc<SubRegion>>>,
    languages: OnceLock<RecordSet<Language>>,
    currencies: OnceLock<RecordSet<Currency>>,
}

impl Record for Country {
    const KIND: &'static str = "Country";

    fn declarations() -> &'static [FieldDecl] {
        COUNTRY_FIELDS
    }

    fn from_values(values: FieldValues) -> Self {
        Self {
            values,
            depend_on: OnceLock::new(),
            transform_to: OnceLock::new(),
            borders: OnceLock::new(),
            region: OnceLock::new(),
            sub_region: OnceLock::new(),
            languages: OnceLock::new(),
            currencies: OnceLock::new(),
        }
    }

    fn field_values(&self) -> &FieldValues {
        &self.values
    }

    fn field_values_mut(&mut self) -> &mut FieldValues {
        &mut self.values
    }
}

impl DatasetRecord for Country {
    type Loader = ListLoader<Country>;

    fn loader() -> Self::Loader {
        ListLoader::new(COUNTRY_RESOURCE)
    }
}

impl fmt::Debug for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_record(self, f)
    }
}

impl Country {
    /// Official (full) name.
    pub fn official_name(&self) -> Option<&str> {
        self.values.str("officialName")
    }

    /// Short name.
    pub fn short_name(&self) -> Option<&str> {
        self.values.str("shortName")
    }

    /// Alternative names.
    pub fn alt_names(&self) -> Vec<&str> {
        self.values.strings("altNames")
    }

    /// Whether the country currently exists.
    pub fn is_exist(&self) -> Option<bool> {
        self.values.bool("isExist")
    }

    /// Whether the country is independent.
    pub fn is_sovereign_state(&self) -> Option<bool> {
        self.values.bool("isSovereignState")
    }

    /// Kind of dependency on another country.
    pub fn dependent_type(&self) -> Option<&str> {
        self.values.str("dependentType")
    }

    /// Alpha-3 codes of the countries this one depends on.
    pub fn depend_on(&self) -> Vec<&str> {
        self.values.strings("dependOn")
    }

    /// ISO 3166 alpha-2 code.
    pub fn alpha2_code(&self) -> Option<&str> {
        self.values.str("alpha2Code")
    }

    /// ISO 3166 alpha-3 code.
    pub fn alpha3_code(&self) -> Option<&str> {
        self.values.str("alpha3Code")
    }

    /// ISO 3166 numeric code, zero padded.
    pub fn numeric_code(&self) -> Option<&str> {
        self.values.str("numericCode")
    }

    /// Year the code was assigned.
    pub fn assignment_year(&self) -> Option<&str> {
        self.values.str("assignmentYear")
    }

    /// Year the code was withdrawn.
    pub fn un_assignment_year(&self) -> Option<&str> {
        self.values.str("unAssignmentYear")
    }

    /// Why the country was withdrawn (split, merge, ...).
    pub fn transform_type(&self) -> Option<&str> {
        self.values.str("transformType")
    }

    /// Alpha-3 codes of the countries it was transformed into.
    pub fn transform_to(&self) -> Vec<&str> {
        self.values.strings("transformTo")
    }

    /// UN M49 region code.
    pub fn region_code(&self) -> Option<&str> {
        self.values.str("regionCode")
    }

    /// UN M49 sub-region code.
    pub fn sub_region_code(&self) -> Option<&str> {
        self.values.str("subRegionCode")
    }

    /// Whether the country has no sea access.
    pub fn is_land_locked(&self) -> Option<bool> {
        self.values.bool("isLandLocked")
    }

    /// Alpha-3 codes of neighbouring countries.
    pub fn borders(&self) -> Vec<&str> {
        self.values.strings("borders")
    }

    /// Raw language usage entries (`languageCode`, `usagePercentage`, ...).
    pub fn languages(&self) -> &[Value] {
        self.values.array("languages")
    }

    /// ISO 4217 alpha codes of currencies in use.
    pub fn currencies(&self) -> Vec<&str> {
        self.values.strings("currencies")
    }

    /// Area in square kilometres.
    pub fn area(&self) -> Option<f64> {
        self.values.double("area")
    }

    /// Population.
    pub fn population(&self) -> Option<i64> {
        self.values.integer("population")
    }

    /// International calling codes.
    pub fn calling_codes(&self) -> Vec<&str> {
        self.values.strings("callingCodes")
    }

    fn referrer(&self, field: &'static str) -> Referrer<'_> {
        Referrer::new(Self::KIND, self.alpha3_code(), field)
    }

    /// Countries this one depends on.
    pub fn depend_on_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.depend_on, || {
            resolve_identifiers(atlas, &self.depend_on(), &self.referrer("dependOn"))
        })
    }

    /// Countries this one was transformed into.
    pub fn transform_to_collection(
        &self,
        atlas: &Atlas,
    ) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.transform_to, || {
            resolve_identifiers(atlas, &self.transform_to(), &self.referrer("transformTo"))
        })
    }

    /// Neighbouring countries.
    pub fn borders_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.borders, || {
            resolve_identifiers(atlas, &self.borders(), &self.referrer("borders"))
        })
    }

    /// Region the country belongs to.
    pub fn region_entity(&self, atlas: &Atlas) -> Result<Option<&Arc<Region>>, AtlasError> {
        let region = memoized(&self.region, || {
            resolve_one(atlas, self.region_code(), &self.referrer("regionCode"))
        })?;
        Ok(region.as_ref())
    }

    /// Sub-region the country belongs to.
    pub fn sub_region_entity(&self, atlas: &Atlas) -> Result<Option<&Arc<SubRegion>>, AtlasError> {
        let sub_region = memoized(&self.sub_region, || {
            resolve_one(atlas, self.sub_region_code(), &self.referrer("subRegionCode"))
        })?;
        Ok(sub_region.as_ref())
    }

    /// Languages used in the country, annotated with their usage here.
    ///
    /// Each language is a copy of the dataset record with `usagePercentage`,
    /// `isOfficial`, `isRegional` and `isPopular` filled from this country's
    /// usage entry.
    pub fn languages_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Language>, AtlasError> {
        memoized(&self.languages, || {
            let map = atlas.entity_map::<Language>()?;
            let usages = self.languages();
            if usages.is_empty() {
                return Ok(RecordSet::empty(map));
            }
            let all = atlas.languages(&[])?;
            let accessor = RecordAccessor::<Language>::new(Arc::clone(&map));
            let mut annotated = CollectionMutator::new(map);
            for usage in usages {
                let Some(entry) = usage.as_map() else {
                    warn!(
                        "[geoatlas:refs] {} has a non-object usage entry: {}",
                        self.referrer("languages"),
                        usage
                    );
                    continue;
                };
                let code = entry.get(LANGUAGE_CODE_KEY).and_then(Value::as_str);
                let Some(language) = code.and_then(|code| all.find(code)) else {
                    warn!(
                        "[geoatlas:refs] {} references unknown {} '{}'",
                        self.referrer("languages"),
                        Language::KIND,
                        code.unwrap_or("?")
                    );
                    continue;
                };
                let mut copy = Language::from_values(language.field_values().clone());
                for (key, value) in entry {
                    if key != LANGUAGE_CODE_KEY {
                        accessor.set_value(&mut copy, key, value.clone())?;
                    }
                }
                annotated.append(copy);
            }
            Ok(annotated.finish())
        })
    }

    /// Currencies in use.
    pub fn currencies_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Currency>, AtlasError> {
        memoized(&self.currencies, || {
            resolve_identifiers(atlas, &self.currencies(), &self.referrer("currencies"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_marks_names_and_codes_as_identifiers() {
        let atlas = Atlas::new();
        let map = atlas.entity_map::<Country>().unwrap();
        let identifiers: Vec<_> = map.identifiers().map(|meta| meta.name).collect();
        assert_eq!(
            identifiers,
            vec![
                "officialName",
                "shortName",
                "altNames",
                "alpha2Code",
                "alpha3Code",
                "numericCode"
            ]
        );
        assert_eq!(map.len(), COUNTRY_FIELDS.len());
    }

    #[test]
    fn typed_accessors_read_mapped_fields() {
        let atlas = Atlas::new();
        let denmark = atlas.country("DNK").unwrap().unwrap();
        assert_eq!(denmark.short_name(), Some("Denmark"));
        assert_eq!(denmark.numeric_code(), Some("208"));
        assert_eq!(denmark.area(), Some(43094.0));
        assert_eq!(denmark.population(), Some(5_593_790));
        assert_eq!(denmark.borders(), vec!["DEU"]);
        assert_eq!(denmark.currencies(), vec!["DKK"]);
        assert_eq!(denmark.is_land_locked(), Some(false));
    }

    #[test]
    fn debug_lists_mapped_values_only() {
        let atlas = Atlas::new();
        let denmark = atlas.country("DNK").unwrap().unwrap();
        denmark.borders_collection(&atlas).unwrap();
        let rendered = format!("{denmark:?}");
        assert!(rendered.starts_with("Country {"), "{rendered}");
        assert!(rendered.contains("alpha3Code"), "{rendered}");
    }
}
