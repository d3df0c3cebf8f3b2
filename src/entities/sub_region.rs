use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::RecordSet;
use crate::entities::{Country, Referrer, Region, debug_record, memoized, resolve_one};
use crate::errors::AtlasError;
use crate::filter::Filter;
use crate::record::{FieldValues, Record};
use crate::schema::FieldDecl;
use crate::source::SubRegionLoader;

const SUB_REGION_FIELDS: &[FieldDecl] = &[
    mapped!("code", "string", source = "code", identifier = true, required = true),
    mapped!("name", "string", source = "name", identifier = true, required = true),
    mapped!("regionCode", "string", source = "regionCode", identifier = false, required = true),
];

/// UN M49 sub-region.
#[derive(Clone)]
pub struct SubRegion {
    values: FieldValues,
    region: OnceLock<Option<Arc<Region>>>,
    countries: OnceLock<RecordSet<Country>>,
}

impl Record for SubRegion {
    const KIND: &'static str = "SubRegion";

    fn declarations() -> &'static [FieldDecl] {
        SUB_REGION_FIELDS
    }

    fn from_values(values: FieldValues) -> Self {
        Self {
            values,
            region: OnceLock::new(),
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

impl DatasetRecord for SubRegion {
    type Loader = SubRegionLoader;

    fn loader() -> Self::Loader {
        SubRegionLoader
    }
}

impl fmt::Debug for SubRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_record(self, f)
    }
}

impl SubRegion {
    /// Three-digit sub-region code.
    pub fn code(&self) -> Option<&str> {
        self.values.str("code")
    }

    /// Sub-region name.
    pub fn name(&self) -> Option<&str> {
        self.values.str("name")
    }

    /// Code of the parent region.
    pub fn region_code(&self) -> Option<&str> {
        self.values.str("regionCode")
    }

    /// Parent region.
    pub fn region_entity(&self, atlas: &Atlas) -> Result<Option<&Arc<Region>>, AtlasError> {
        let region = memoized(&self.region, || {
            let referrer = Referrer::new(Self::KIND, self.code(), "regionCode");
            resolve_one(atlas, self.region_code(), &referrer)
        })?;
        Ok(region.as_ref())
    }

    /// Countries in this sub-region.
    pub fn countries_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.countries, || {
            atlas.countries(&[Filter::eq("subRegionCode", self.code())])
        })
    }
}
