use serde_json::{Map, Value as JsonValue};
use std::marker::PhantomData;

use crate::constants::resources::{PARENT_REGION_KEY, REGION_RESOURCE, REGIONS_KEY, SUB_REGIONS_KEY};
use crate::entities::{Region, SubRegion};
use crate::errors::AtlasError;
use crate::record::Record;
use crate::source::{RecordLoader, array_of_objects, flatten_entry, json_kind};
use crate::types::{RawEntry, ResourceName};
use crate::value::Value;

/// Loader for documents that are a flat array of entry objects.
#[derive(Clone, Copy, Debug)]
pub struct ListLoader<R: Record> {
    resource: ResourceName,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> ListLoader<R> {
    /// Load `R` records from the array stored in `resource`.
    pub fn new(resource: ResourceName) -> Self {
        Self {
            resource,
            _record: PhantomData,
        }
    }
}

impl<R: Record> RecordLoader for ListLoader<R> {
    type Record = R;

    fn resource_name(&self) -> ResourceName {
        self.resource
    }

    fn raw_entries(&self, document: JsonValue) -> Result<Vec<RawEntry>, AtlasError> {
        Ok(array_of_objects(self.resource, document)?
            .into_iter()
            .map(flatten_entry)
            .collect())
    }
}

/// Loader for the top-level regions of the region document.
///
/// Only `code` and `name` are taken; nested sub-regions are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionLoader;

impl RecordLoader for RegionLoader {
    type Record = Region;

    fn resource_name(&self) -> ResourceName {
        REGION_RESOURCE
    }

    fn raw_entries(&self, document: JsonValue) -> Result<Vec<RawEntry>, AtlasError> {
        Ok(regions(document)?
            .into_iter()
            .map(|mut region| {
                let mut raw = RawEntry::new();
                for key in ["code", "name"] {
                    if let Some(value) = region.remove(key) {
                        raw.insert(key.to_string(), Value::from(value));
                    }
                }
                raw
            })
            .collect())
    }
}

/// Loader for every sub-region nested under the regions of the region document.
///
/// Each entry gains `regionCode` holding its parent region's code.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubRegionLoader;

impl RecordLoader for SubRegionLoader {
    type Record = SubRegion;

    fn resource_name(&self) -> ResourceName {
        REGION_RESOURCE
    }

    fn raw_entries(&self, document: JsonValue) -> Result<Vec<RawEntry>, AtlasError> {
        let mut entries = Vec::new();
        for mut region in regions(document)? {
            let parent_code = region.get("code").cloned().unwrap_or(JsonValue::Null);
            let Some(children) = region.remove(SUB_REGIONS_KEY) else {
                continue;
            };
            for child in array_of_objects(REGION_RESOURCE, children)? {
                let mut raw = flatten_entry(child);
                raw.insert(PARENT_REGION_KEY.to_string(), Value::from(parent_code.clone()));
                entries.push(raw);
            }
        }
        Ok(entries)
    }
}

fn regions(document: JsonValue) -> Result<Vec<Map<String, JsonValue>>, AtlasError> {
    match document {
        JsonValue::Object(mut root) => match root.remove(REGIONS_KEY) {
            Some(regions) => array_of_objects(REGION_RESOURCE, regions),
            None => Err(AtlasError::MalformedResource {
                name: REGION_RESOURCE,
                reason: format!("missing top-level '{REGIONS_KEY}' key"),
            }),
        },
        other => Err(AtlasError::MalformedResource {
            name: REGION_RESOURCE,
            reason: format!("expected an object, got {}", json_kind(&other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> JsonValue {
        json!({
            "regions": [
                {
                    "code": "150",
                    "name": "Europe",
                    "subRegions": [
                        {"code": "154", "name": "Northern Europe"},
                        {"code": "155", "name": "Western Europe"}
                    ]
                },
                {"code": "009", "name": "Oceania", "subRegions": []}
            ]
        })
    }

    #[test]
    fn region_loader_keeps_code_and_name_only() {
        let entries = RegionLoader.raw_entries(document()).unwrap();
        assert_eq!(entries.len(), 2);
        let keys: Vec<&str> = entries[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["code", "name"]);
        assert_eq!(entries[1]["name"], Value::from("Oceania"));
    }

    #[test]
    fn sub_region_loader_injects_parent_code() {
        let entries = SubRegionLoader.raw_entries(document()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["code"], Value::from("154"));
        assert_eq!(entries[1]["regionCode"], Value::from("150"));
    }

    #[test]
    fn region_document_shape_is_checked() {
        assert!(RegionLoader.raw_entries(json!([])).is_err());
        assert!(SubRegionLoader.raw_entries(json!({"areas": []})).is_err());
    }

    #[test]
    fn list_loader_flattens_each_entry() {
        let loader = ListLoader::<Region>::new("custom.json");
        assert_eq!(loader.resource_name(), "custom.json");
        let entries = loader
            .raw_entries(json!([{"code": "001", "name": {"short": "World"}}]))
            .unwrap();
        assert_eq!(entries[0]["name_short"], Value::from("World"));
    }
}
