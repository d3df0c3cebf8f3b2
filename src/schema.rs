//! Field declarations and the derived, cached entity maps.
//!
//! Ownership model:
//! - Each record type owns a static table of `FieldDecl`s.
//! - `derive_entity_map` validates that table and produces an `EntityMap`.
//! - `entity_map` memoizes the derived map in a `MemoCache` so the table is
//!   validated once per record type while caching is enabled.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::cache::{MemoCache, memo_key};
use crate::constants::schema::{
    ENTITY_MAP_CACHE_TAG, MAP_ATTR_IS_IDENTIFIER, MAP_ATTR_IS_REQUIRED, MAP_ATTR_SOURCE,
    MAP_ATTR_TYPE, REQUIRED_MAP_ATTRS,
};
use crate::errors::AtlasError;
use crate::record::Record;
use crate::types::{FieldName, RecordKind, SourceKey};
use crate::value::{SemanticType, normalize_type_name};

/// One attribute value inside a field's metadata block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapAttr {
    /// Text attribute (`source`, `type`).
    Text(&'static str),
    /// Boolean attribute (`isIdentifier`, `isRequired`).
    Flag(bool),
}

/// Ordered `(attribute, value)` pairs attached to a mapped field.
pub type MapBlock = &'static [(&'static str, MapAttr)];

/// Static declaration of one record field.
#[derive(Clone, Copy, Debug)]
pub struct FieldDecl {
    /// Field name as exposed to queries.
    pub name: FieldName,
    /// Declared value type (`string`, `bool`, `int`, `float`, `array`, ...).
    pub declared_type: &'static str,
    /// Metadata block; `None` keeps the field out of the entity map.
    pub map: Option<MapBlock>,
}

impl FieldDecl {
    /// Declare a field that participates in mapping.
    pub const fn mapped(name: FieldName, declared_type: &'static str, map: MapBlock) -> Self {
        Self {
            name,
            declared_type,
            map: Some(map),
        }
    }

    /// Declare a field that records carry but mapping ignores.
    pub const fn unmapped(name: FieldName, declared_type: &'static str) -> Self {
        Self {
            name,
            declared_type,
            map: None,
        }
    }

    /// Semantic type implied by the declared type, when it names one.
    pub fn declared_semantic_type(&self) -> Option<SemanticType> {
        SemanticType::from_name(self.declared_type)
    }
}

/// Validated metadata for one mapped field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMeta {
    /// Field name.
    pub name: FieldName,
    /// Flattened raw key the field is filled from.
    pub source: SourceKey,
    /// Normalized value type.
    pub semantic_type: SemanticType,
    /// Whether identifier lookups consider this field.
    pub is_identifier: bool,
    /// Whether raw data must provide `source`.
    pub is_required: bool,
}

/// Ordered field name to metadata mapping for one record type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMap {
    kind: RecordKind,
    fields: IndexMap<FieldName, FieldMeta>,
}

impl EntityMap {
    /// Record type this map describes.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Metadata for `field`, if it is mapped.
    pub fn get(&self, field: &str) -> Option<&FieldMeta> {
        self.fields.get(field)
    }

    /// Metadata for `field`, failing with the list of mapped fields when absent.
    pub fn meta(&self, field: &str) -> Result<&FieldMeta, AtlasError> {
        self.get(field).ok_or_else(|| AtlasError::UnknownField {
            kind: self.kind,
            missing: vec![field.to_string()],
            available: self.field_names(),
        })
    }

    /// True if `field` is mapped.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Mapped field names in declaration order.
    pub fn field_names(&self) -> Vec<FieldName> {
        self.fields.keys().copied().collect()
    }

    /// Mapped fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values()
    }

    /// Fields eligible for natural-key lookup.
    pub fn identifiers(&self) -> impl Iterator<Item = &FieldMeta> {
        self.iter().filter(|meta| meta.is_identifier)
    }

    /// Number of mapped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Validate a declaration table and build its entity map.
///
/// Unmapped declarations are skipped. Any malformed metadata block is a
/// `Mapping` error naming the record type and field.
pub fn derive_entity_map(
    kind: RecordKind,
    declarations: &[FieldDecl],
) -> Result<EntityMap, AtlasError> {
    let mut fields = IndexMap::with_capacity(declarations.len());
    for decl in declarations {
        let Some(block) = decl.map else {
            continue;
        };
        let meta = derive_field_meta(kind, decl, block)?;
        if fields.insert(decl.name, meta).is_some() {
            return Err(mapping_error(kind, decl.name, "field is declared more than once"));
        }
    }
    Ok(EntityMap { kind, fields })
}

/// Entity map for `R`, memoized in `cache` without expiry.
pub fn entity_map<R: Record>(cache: &MemoCache) -> Result<Arc<EntityMap>, AtlasError> {
    let key = memo_key(ENTITY_MAP_CACHE_TAG, &R::KIND);
    cache.fetch_or_try_insert_with(key, None, || {
        derive_entity_map(R::KIND, R::declarations())
    })
}

fn derive_field_meta(
    kind: RecordKind,
    decl: &FieldDecl,
    block: MapBlock,
) -> Result<FieldMeta, AtlasError> {
    let mut source = None;
    let mut type_override = None;
    let mut is_identifier = None;
    let mut is_required = None;

    for (attr, value) in block {
        let slot_taken = match *attr {
            MAP_ATTR_SOURCE => set_once(&mut source, text_attr(kind, decl, attr, *value)?),
            MAP_ATTR_TYPE => set_once(&mut type_override, text_attr(kind, decl, attr, *value)?),
            MAP_ATTR_IS_IDENTIFIER => {
                set_once(&mut is_identifier, flag_attr(kind, decl, attr, *value)?)
            }
            MAP_ATTR_IS_REQUIRED => {
                set_once(&mut is_required, flag_attr(kind, decl, attr, *value)?)
            }
            unexpected => {
                return Err(mapping_error(
                    kind,
                    decl.name,
                    format!("has not valid param [{unexpected}]"),
                ));
            }
        };
        if slot_taken {
            return Err(mapping_error(
                kind,
                decl.name,
                format!("param [{attr}] is given more than once"),
            ));
        }
    }

    let present = [source.is_some(), is_identifier.is_some(), is_required.is_some()];
    let missing: Vec<&str> = REQUIRED_MAP_ATTRS
        .iter()
        .zip(present)
        .filter(|(_, present)| !present)
        .map(|(attr, _)| *attr)
        .collect();
    let (Some(source), Some(is_identifier), Some(is_required)) = (source, is_identifier, is_required)
    else {
        return Err(mapping_error(
            kind,
            decl.name,
            format!("missing required param [{}]", missing.join(", ")),
        ));
    };

    let type_name = normalize_type_name(type_override.unwrap_or(decl.declared_type));
    let semantic_type = SemanticType::from_name(type_name).ok_or_else(|| {
        mapping_error(
            kind,
            decl.name,
            format!("has not valid value for param with type {type_name}"),
        )
    })?;

    Ok(FieldMeta {
        name: decl.name,
        source,
        semantic_type,
        is_identifier,
        is_required,
    })
}

/// Store `value` in an empty slot; returns `true` when the slot was already filled.
fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return true;
    }
    *slot = Some(value);
    false
}

fn text_attr(
    kind: RecordKind,
    decl: &FieldDecl,
    attr: &str,
    value: MapAttr,
) -> Result<&'static str, AtlasError> {
    match value {
        MapAttr::Text(text) => Ok(text),
        MapAttr::Flag(_) => Err(mapping_error(
            kind,
            decl.name,
            format!("param [{attr}] expects a text value"),
        )),
    }
}

fn flag_attr(
    kind: RecordKind,
    decl: &FieldDecl,
    attr: &str,
    value: MapAttr,
) -> Result<bool, AtlasError> {
    match value {
        MapAttr::Flag(flag) => Ok(flag),
        MapAttr::Text(_) => Err(mapping_error(
            kind,
            decl.name,
            format!("param [{attr}] expects a boolean flag"),
        )),
    }
}

fn mapping_error(kind: RecordKind, field: FieldName, reason: impl Into<String>) -> AtlasError {
    AtlasError::Mapping {
        kind,
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::MapAttr::{Flag, Text};
    use super::*;

    const GOOD: &[FieldDecl] = &[
        FieldDecl::mapped(
            "code",
            "string",
            &[
                ("source", Text("iso_code")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(true)),
            ],
        ),
        FieldDecl::unmapped("note", "string"),
        FieldDecl::mapped(
            "share",
            "float",
            &[
                ("source", Text("share")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "rank",
            "string",
            &[
                ("source", Text("rank")),
                ("type", Text("int")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
    ];

    fn reason_of(err: AtlasError) -> (FieldName, String) {
        match err {
            AtlasError::Mapping { field, reason, .. } => (field, reason),
            other => panic!("expected mapping error, got {other:?}"),
        }
    }

    #[test]
    fn derives_mapped_fields_in_declaration_order() {
        let map = derive_entity_map("Sample", GOOD).unwrap();
        assert_eq!(map.kind(), "Sample");
        assert_eq!(map.field_names(), vec!["code", "share", "rank"]);
        assert!(!map.contains("note"));

        let code = map.get("code").unwrap();
        assert_eq!(code.source, "iso_code");
        assert_eq!(code.semantic_type, SemanticType::String);
        assert!(code.is_identifier && code.is_required);

        assert_eq!(map.get("share").unwrap().semantic_type, SemanticType::Double);
        assert_eq!(map.get("rank").unwrap().semantic_type, SemanticType::Integer);
        assert_eq!(
            map.identifiers().map(|meta| meta.name).collect::<Vec<_>>(),
            vec!["code"]
        );
    }

    #[test]
    fn unexpected_attribute_is_rejected() {
        let decls = [FieldDecl::mapped(
            "code",
            "string",
            &[
                ("source", Text("code")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(true)),
                ("isUnique", Flag(true)),
            ],
        )];
        let (field, reason) = reason_of(derive_entity_map("Sample", &decls).unwrap_err());
        assert_eq!(field, "code");
        assert!(reason.contains("isUnique"), "{reason}");
    }

    #[test]
    fn missing_attributes_are_all_reported() {
        let decls = [FieldDecl::mapped("code", "string", &[("source", Text("code"))])];
        let (_, reason) = reason_of(derive_entity_map("Sample", &decls).unwrap_err());
        assert!(reason.contains("isIdentifier, isRequired"), "{reason}");
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let decls = [FieldDecl::mapped(
            "when",
            "DateTime",
            &[
                ("source", Text("when")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        )];
        let (field, reason) = reason_of(derive_entity_map("Sample", &decls).unwrap_err());
        assert_eq!(field, "when");
        assert!(reason.contains("DateTime"), "{reason}");
    }

    #[test]
    fn wrong_attribute_kind_and_duplicates_are_rejected() {
        let wrong_kind = [FieldDecl::mapped(
            "code",
            "string",
            &[
                ("source", Text("code")),
                ("isIdentifier", Text("yes")),
                ("isRequired", Flag(true)),
            ],
        )];
        assert!(derive_entity_map("Sample", &wrong_kind).is_err());

        let duplicated = [FieldDecl::mapped(
            "code",
            "string",
            &[
                ("source", Text("code")),
                ("source", Text("other")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(true)),
            ],
        )];
        let (_, reason) = reason_of(derive_entity_map("Sample", &duplicated).unwrap_err());
        assert!(reason.contains("more than once"), "{reason}");
    }

    #[test]
    fn meta_lookup_lists_available_fields() {
        let map = derive_entity_map("Sample", GOOD).unwrap();
        let err = map.meta("unknown").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[unknown]"), "{message}");
        assert!(message.contains("code, share, rank"), "{message}");
    }
}
