use std::fmt;
use std::sync::OnceLock;

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::RecordSet;
use crate::constants::resources::CURRENCY_RESOURCE;
use crate::entities::{Country, debug_record, memoized};
use crate::errors::AtlasError;
use crate::filter::{Filter, Operator};
use crate::record::{FieldValues, Record};
use crate::schema::FieldDecl;
use crate::source::ListLoader;

const CURRENCY_FIELDS: &[FieldDecl] = &[
    mapped!("officialName", "string", source = "name_official", identifier = true, required = true),
    mapped!("shortName", "string", source = "name_short", identifier = true, required = true),
    mapped!("altNames", "array", source = "name_alt", identifier = true, required = true),
    mapped!("alphaCode", "string", source = "isoCodes_alpha", identifier = true, required = true),
    mapped!("numericCode", "string", source = "isoCodes_numeric", identifier = true, required = true),
    mapped!("symbol", "string", source = "symbol", identifier = false, required = true),
    mapped!("magnitude", "int", source = "magnitude", identifier = false, required = false),
];

/// Currency as listed in ISO 4217.
#[derive(Clone)]
pub struct Currency {
    values: FieldValues,
    countries: OnceLock<RecordSet<Country>>,
}

impl Record for Currency {
    const KIND: &'static str = "Currency";

    fn declarations() -> &'static [FieldDecl] {
        CURRENCY_FIELDS
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

impl DatasetRecord for Currency {
    type Loader = ListLoader<Currency>;

    fn loader() -> Self::Loader {
        ListLoader::new(CURRENCY_RESOURCE)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_record(self, f)
    }
}

impl Currency {
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

    /// ISO 4217 alpha code.
    pub fn alpha_code(&self) -> Option<&str> {
        self.values.str("alphaCode")
    }

    /// ISO 4217 numeric code.
    pub fn numeric_code(&self) -> Option<&str> {
        self.values.str("numericCode")
    }

    /// Currency sign.
    pub fn symbol(&self) -> Option<&str> {
        self.values.str("symbol")
    }

    /// Number of minor-unit digits.
    pub fn magnitude(&self) -> Option<i64> {
        self.values.integer("magnitude")
    }

    /// Countries using this currency.
    pub fn countries_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.countries, || match self.alpha_code() {
            Some(code) => atlas.countries(&[Filter::new("currencies", code, Operator::Has)]),
            None => Ok(RecordSet::empty(atlas.entity_map::<Country>()?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_magnitude_reads_as_none() {
        let atlas = Atlas::new();
        let crown = atlas.currency("DKK").unwrap().unwrap();
        assert_eq!(crown.magnitude(), Some(2));
        assert_eq!(crown.numeric_code(), Some("208"));
        let koruna = atlas.currency("CSK").unwrap().unwrap();
        assert_eq!(koruna.magnitude(), None);
    }
}
