use std::fmt;
use std::sync::OnceLock;

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::{CollectionMutator, RecordSet};
use crate::constants::resources::{LANGUAGE_CODE_KEY, LANGUAGE_RESOURCE};
use crate::entities::{Country, debug_record, memoized};
use crate::errors::AtlasError;
use crate::record::{FieldValues, Record};
use crate::schema::FieldDecl;
use crate::source::ListLoader;
use crate::value::Value;

const LANGUAGE_FIELDS: &[FieldDecl] = &[
    mapped!("officialName", "string", source = "name_official", identifier = true, required = true),
    mapped!("shortName", "string", source = "name_short", identifier = true, required = true),
    mapped!("altNames", "array", source = "name_alt", identifier = true, required = true),
    mapped!("alpha2Code", "string", source = "isoCodes_alpha2", identifier = true, required = true),
    mapped!("alpha3BCode", "string", source = "isoCodes_alpha3B", identifier = true, required = true),
    mapped!("alpha3TCode", "string", source = "isoCodes_alpha3T", identifier = true, required = false),
    mapped!("isIndividualLanguage", "bool", source = "scope_isIndividualLanguage", identifier = false, required = true),
    mapped!("isMacroLanguage", "bool", source = "scope_isMacroLanguage", identifier = false, required = true),
    mapped!("isSpecialCode", "bool", source = "scope_isSpecialCode", identifier = false, required = true),
    mapped!("isLiving", "bool", source = "type_isLiving", identifier = false, required = true),
    mapped!("isConstructed", "bool", source = "type_isConstructed", identifier = false, required = true),
    mapped!("isAncient", "bool", source = "type_isAncient", identifier = false, required = true),
    mapped!("isExtinct", "bool", source = "type_isExtinct", identifier = false, required = true),
    mapped!("isHistorical", "bool", source = "type_isHistorical", identifier = false, required = true),
    // Per-country usage, filled only on languages reached through a country.
    mapped!("usagePercentage", "float", source = "", identifier = false, required = false),
    mapped!("isOfficial", "bool", source = "", identifier = false, required = false),
    mapped!("isRegional", "bool", source = "", identifier = false, required = false),
    mapped!("isPopular", "bool", source = "", identifier = false, required = false),
];

/// Language as listed in ISO 639.
#[derive(Clone)]
pub struct Language {
    values: FieldValues,
    countries: OnceLock<RecordSet<Country>>,
}

impl Record for Language {
    const KIND: &'static str = "Language";

    fn declarations() -> &'static [FieldDecl] {
        LANGUAGE_FIELDS
    }

    fn from_values(values: FieldValues) -> Self {
        Self {
            values,
            countries: OnceLock::new(),
        }
    }

    fn field_values(&self) -> &FieldValues {
        &self.values
    }

    fn field_values_mut(&mut self) -> &mut FieldValues {
        &mut self.values
    }
}

impl DatasetRecord for Language {
    type Loader = ListLoader<Language>;

    fn loader() -> Self::Loader {
        ListLoader::new(LANGUAGE_RESOURCE)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_record(self, f)
    }
}

impl Language {
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

    /// ISO 639-1 code.
    pub fn alpha2_code(&self) -> Option<&str> {
        self.values.str("alpha2Code")
    }

    /// ISO 639-2/B code.
    pub fn alpha3_b_code(&self) -> Option<&str> {
        self.values.str("alpha3BCode")
    }

    /// ISO 639-2/T code; countries refer to languages by this code.
    pub fn alpha3_t_code(&self) -> Option<&str> {
        self.values.str("alpha3TCode")
    }

    /// Scope `individual`.
    pub fn is_individual_language(&self) -> Option<bool> {
        self.values.bool("isIndividualLanguage")
    }

    /// Scope `macrolanguage`.
    pub fn is_macro_language(&self) -> Option<bool> {
        self.values.bool("isMacroLanguage")
    }

    /// Scope `special`.
    pub fn is_special_code(&self) -> Option<bool> {
        self.values.bool("isSpecialCode")
    }

    /// Type `living`.
    pub fn is_living(&self) -> Option<bool> {
        self.values.bool("isLiving")
    }

    /// Type `constructed`.
    pub fn is_constructed(&self) -> Option<bool> {
        self.values.bool("isConstructed")
    }

    /// Type `ancient`.
    pub fn is_ancient(&self) -> Option<bool> {
        self.values.bool("isAncient")
    }

    /// Type `extinct`.
    pub fn is_extinct(&self) -> Option<bool> {
        self.values.bool("isExtinct")
    }

    /// Type `historical`.
    pub fn is_historical(&self) -> Option<bool> {
        self.values.bool("isHistorical")
    }

    /// Share of the country's population using the language, in percent.
    pub fn usage_percentage(&self) -> Option<f64> {
        self.values.double("usagePercentage")
    }

    /// Official status in the country.
    pub fn is_official(&self) -> Option<bool> {
        self.values.bool("isOfficial")
    }

    /// Regional status in the country.
    pub fn is_regional(&self) -> Option<bool> {
        self.values.bool("isRegional")
    }

    /// De facto official in the country.
    pub fn is_popular(&self) -> Option<bool> {
        self.values.bool("isPopular")
    }

    /// Countries whose usage entries name this language.
    pub fn countries_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.countries, || {
            let map = atlas.entity_map::<Country>()?;
            let Some(code) = self.alpha3_t_code() else {
                return Ok(RecordSet::empty(map));
            };
            let mut speakers = CollectionMutator::new(map);
            speakers.append_all(
                atlas
                    .countries(&[])?
                    .iter()
                    .filter(|country| {
                        country.languages().iter().any(|usage| {
                            usage
                                .as_map()
                                .and_then(|entry| entry.get(LANGUAGE_CODE_KEY))
                                .and_then(Value::as_str)
                                == Some(code)
                        })
                    })
                    .cloned(),
            );
            Ok(speakers.finish())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_fields_stay_empty_on_dataset_records() {
        let atlas = Atlas::new();
        let danish = atlas.language("dan").unwrap().unwrap();
        assert_eq!(danish.short_name(), Some("Danish"));
        assert_eq!(danish.usage_percentage(), None);
        assert_eq!(danish.is_official(), None);
    }

    #[test]
    fn missing_optional_codes_read_as_none() {
        let atlas = Atlas::new();
        let jutish = atlas.language("jut").unwrap().unwrap();
        assert_eq!(jutish.alpha2_code(), None);
        assert_eq!(jutish.alpha3_t_code(), Some("jut"));
    }
}
