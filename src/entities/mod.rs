//! Record types of the reference dataset and their cross-references.
//!
//! Each record type owns a static field table, typed accessors over its
//! mapped fields, and lazily resolved references to related records. A
//! reference is resolved through an `Atlas` on first use and kept on the
//! record afterwards.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::atlas::{Atlas, DatasetRecord};
use crate::collection::{CollectionMutator, RecordSet};
use crate::errors::AtlasError;
use crate::record::Record;

/// Declare a mapped field with the three required metadata attributes.
macro_rules! mapped {
    ($name:literal, $ty:literal, source = $source:literal, identifier = $id:literal, required = $req:literal) => {
        $crate::schema::FieldDecl::mapped(
            $name,
            $ty,
            &[
                (
                    $crate::constants::schema::MAP_ATTR_SOURCE,
                    $crate::schema::MapAttr::Text($source),
                ),
                (
                    $crate::constants::schema::MAP_ATTR_IS_IDENTIFIER,
                    $crate::schema::MapAttr::Flag($id),
                ),
                (
                    $crate::constants::schema::MAP_ATTR_IS_REQUIRED,
                    $crate::schema::MapAttr::Flag($req),
                ),
            ],
        )
    };
}

mod country;
mod currency;
mod language;
mod region;
mod sub_region;

pub use country::Country;
pub use currency::Currency;
pub use language::Language;
pub use region::Region;
pub use sub_region::SubRegion;

/// Value stored in `slot`, resolving it first when empty.
///
/// A failed resolution leaves the slot empty so a later call can retry.
pub(crate) fn memoized<T>(
    slot: &OnceLock<T>,
    resolve: impl FnOnce() -> Result<T, AtlasError>,
) -> Result<&T, AtlasError> {
    if let Some(value) = slot.get() {
        return Ok(value);
    }
    let value = resolve()?;
    Ok(slot.get_or_init(|| value))
}

/// Records of `R` named by `identifiers`, in the order given.
///
/// Unknown identifiers are skipped with a warning. An empty list yields an
/// empty set without loading `R`.
pub(crate) fn resolve_identifiers<R: DatasetRecord>(
    atlas: &Atlas,
    identifiers: &[&str],
    referrer: &dyn fmt::Display,
) -> Result<RecordSet<R>, AtlasError> {
    let map = atlas.entity_map::<R>()?;
    if identifiers.is_empty() {
        return Ok(RecordSet::empty(map));
    }
    let all = atlas.records::<R>()?;
    let mut resolved = CollectionMutator::new(map);
    for identifier in identifiers {
        match all.find(identifier) {
            Some(record) => {
                resolved.append(Arc::clone(record));
            }
            None => warn!(
                "[geoatlas:refs] {} references unknown {} '{}'",
                referrer,
                R::KIND,
                identifier
            ),
        }
    }
    Ok(resolved.finish())
}

/// Single record of `R` named by `identifier`, warning when it is unknown.
pub(crate) fn resolve_one<R: DatasetRecord>(
    atlas: &Atlas,
    identifier: Option<&str>,
    referrer: &dyn fmt::Display,
) -> Result<Option<Arc<R>>, AtlasError> {
    let Some(identifier) = identifier else {
        return Ok(None);
    };
    let found = atlas.lookup::<R>(identifier)?;
    if found.is_none() {
        warn!(
            "[geoatlas:refs] {} references unknown {} '{}'",
            referrer,
            R::KIND,
            identifier
        );
    }
    Ok(found)
}

/// Debug output listing only mapped values, so memoized references (which
/// may point back at the record) are never walked.
pub(crate) fn debug_record<R: Record>(record: &R, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = f.debug_struct(R::KIND);
    for (name, value) in record.field_values().mapped_values() {
        out.field(name, &value);
    }
    out.finish_non_exhaustive()
}

/// `Kind(identifier)` label used in reference warnings.
pub(crate) struct Referrer<'a> {
    kind: &'static str,
    identifier: Option<&'a str>,
    field: &'static str,
}

impl<'a> Referrer<'a> {
    pub(crate) fn new(kind: &'static str, identifier: Option<&'a str>, field: &'static str) -> Self {
        Self {
            kind,
            identifier,
            field,
        }
    }
}

impl fmt::Display for Referrer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}).{}",
            self.kind,
            self.identifier.unwrap_or("?"),
            self.field
        )
    }
}
