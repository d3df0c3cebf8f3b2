use std::fmt;
use std::sync::OnceLock;

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::RecordSet;
use crate::entities::{Country, SubRegion, debug_record, memoized};
use crate::errors::AtlasError;
use crate::filter::Filter;
use crate::record::{FieldValues, Record};
use crate::schema::FieldDecl;
use crate::source::RegionLoader;

const REGION_FIELDS: &[FieldDecl] = &[
    mapped!("code", "string", source = "code", identifier = true, required = true),
    mapped!("name", "string", source = "name", identifier = true, required = true),
];

/// UN M49 region.
#[derive(Clone)]
pub struct Region {
    values: FieldValues,
    sub_regions: OnceLock<RecordSet<SubRegion>>,
    countries: OnceLock<RecordSet<Country>>,
}

impl Record for Region {
    const KIND: &'static str = "Region";

    fn declarations() -> &'static [FieldDecl] {
        REGION_FIELDS
    }

    fn from_values(values: FieldValues) -> Self {
        Self {
            values,
            sub_regions: OnceLock::new(),
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

impl DatasetRecord for Region {
    type Loader = RegionLoader;

    fn loader() -> Self::Loader {
        RegionLoader
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_record(self, f)
    }
}

impl Region {
    /// Three-digit region code.
    pub fn code(&self) -> Option<&str> {
        self.values.str("code")
    }

    /// Region name.
    pub fn name(&self) -> Option<&str> {
        self.values.str("name")
    }

    /// Sub-regions of this region.
    pub fn sub_regions_collection(
        &self,
        atlas: &Atlas,
    ) -> Result<&RecordSet<SubRegion>, AtlasError> {
        memoized(&self.sub_regions, || {
            atlas.sub_regions(&[Filter::eq("regionCode", self.code())])
        })
    }

    /// Countries in this region.
    pub fn countries_collection(&self, atlas: &Atlas) -> Result<&RecordSet<Country>, AtlasError> {
        memoized(&self.countries, || {
            atlas.countries(&[Filter::eq("regionCode", self.code())])
        })
    }
}
