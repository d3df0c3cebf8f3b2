//! Type-aware filter operators, filter chains, and identifier search.
//!
//! Ownership model:
//! - `Operator` names a predicate; the predicate table maps each variant to a
//!   plain function so dispatch stays exhaustive.
//! - `allowed_operators` decides which operators a semantic type accepts.
//! - `FilterEngine` owns the current `RecordSet` and replaces it with a
//!   narrowed copy after every successful filter.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::collection::{CollectionMutator, RecordSet};
use crate::errors::AtlasError;
use crate::record::Record;
use crate::value::{SemanticType, Value};

/// Filter operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Strict equality.
    Eq,
    /// Strict inequality.
    Neq,
    /// Value is null.
    IsNull,
    /// Value is not null.
    IsNotNull,
    /// Value is one of the argument's elements.
    In,
    /// Value is none of the argument's elements.
    NotIn,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Inclusive `[lower, upper]` range.
    Between,
    /// Case-sensitive substring match.
    Like,
    /// Negated substring match.
    NotLike,
    /// Array contains the argument.
    Has,
    /// Array does not contain the argument.
    NotHas,
    /// Array has no elements.
    IsEmpty,
    /// Array has at least one element.
    IsNotEmpty,
}

use Operator::*;

const STRING_OPERATORS: &[Operator] = &[Eq, Neq, IsNull, IsNotNull, In, NotIn, Like, NotLike];
const NUMBER_OPERATORS: &[Operator] = &[
    Eq, Neq, IsNull, IsNotNull, In, NotIn, Gt, Gte, Lt, Lte, Between,
];
const BOOLEAN_OPERATORS: &[Operator] = &[Eq, Neq, IsNull, IsNotNull];
const ARRAY_OPERATORS: &[Operator] = &[Eq, Neq, IsEmpty, IsNotEmpty, Has, NotHas];

/// Operators accepted by fields of `semantic_type`.
pub fn allowed_operators(semantic_type: SemanticType) -> &'static [Operator] {
    match semantic_type {
        SemanticType::String => STRING_OPERATORS,
        SemanticType::Integer | SemanticType::Double => NUMBER_OPERATORS,
        SemanticType::Boolean => BOOLEAN_OPERATORS,
        SemanticType::Array => ARRAY_OPERATORS,
    }
}

type Predicate = fn(&Value, &Value) -> bool;

impl Operator {
    /// Every operator, in canonical order.
    pub const ALL: [Operator; 17] = [
        Eq, Neq, IsNull, IsNotNull, In, NotIn, Gt, Gte, Lt, Lte, Between, Like, NotLike, Has,
        NotHas, IsEmpty, IsNotEmpty,
    ];

    /// Canonical operator name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Eq => "eq",
            Neq => "neq",
            IsNull => "isNull",
            IsNotNull => "isNotNull",
            In => "in",
            NotIn => "notIn",
            Gt => "gt",
            Gte => "gte",
            Lt => "lt",
            Lte => "lte",
            Between => "between",
            Like => "like",
            NotLike => "notLike",
            Has => "has",
            NotHas => "notHas",
            IsEmpty => "isEmpty",
            IsNotEmpty => "isNotEmpty",
        }
    }

    /// Whether the operator reads a filter argument.
    pub const fn takes_argument(self) -> bool {
        !matches!(self, IsNull | IsNotNull | IsEmpty | IsNotEmpty)
    }

    fn predicate(self) -> Predicate {
        match self {
            Eq => equals,
            Neq => |value, arg| !equals(value, arg),
            IsNull => |value, _| value.is_null(),
            IsNotNull => |value, _| !value.is_null(),
            In => member_of,
            NotIn => |value, arg| !member_of(value, arg),
            Gt => |value, arg| value.numeric_cmp(arg) == Some(Ordering::Greater),
            Gte => |value, arg| {
                matches!(value.numeric_cmp(arg), Some(Ordering::Greater | Ordering::Equal))
            },
            Lt => |value, arg| value.numeric_cmp(arg) == Some(Ordering::Less),
            Lte => |value, arg| {
                matches!(value.numeric_cmp(arg), Some(Ordering::Less | Ordering::Equal))
            },
            Between => within,
            Like => contains_text,
            NotLike => |value, arg| !contains_text(value, arg),
            Has => has_element,
            NotHas => |value, arg| !has_element(value, arg),
            IsEmpty => |value, _| value.as_array().is_some_and(<[Value]>::is_empty),
            IsNotEmpty => |value, _| value.as_array().is_some_and(|items| !items.is_empty()),
        }
    }
}

fn equals(value: &Value, arg: &Value) -> bool {
    value == arg
}

fn member_of(value: &Value, arg: &Value) -> bool {
    arg.as_array().is_some_and(|items| items.contains(value))
}

fn within(value: &Value, arg: &Value) -> bool {
    let Some([lower, upper]) = arg.as_array() else {
        return false;
    };
    matches!(
        value.numeric_cmp(lower),
        Some(Ordering::Greater | Ordering::Equal)
    ) && matches!(
        value.numeric_cmp(upper),
        Some(Ordering::Less | Ordering::Equal)
    )
}

fn contains_text(value: &Value, arg: &Value) -> bool {
    match (value.as_str(), arg.as_str()) {
        (Some(text), Some(needle)) => text.contains(needle),
        _ => false,
    }
}

fn has_element(value: &Value, arg: &Value) -> bool {
    value.as_array().is_some_and(|items| items.contains(arg))
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = AtlasError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name == "btw" {
            return Ok(Between);
        }
        Operator::ALL
            .into_iter()
            .find(|operator| operator.as_str() == name)
            .ok_or_else(|| AtlasError::UnknownOperator(name.to_string()))
    }
}

/// One `field operator value` condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// Mapped field the condition reads.
    pub field: String,
    /// Filter argument; ignored by argument-less operators.
    pub value: Value,
    /// Operator applied to the field value and the argument.
    pub operator: Operator,
}

impl Filter {
    /// Build a condition.
    pub fn new(field: impl Into<String>, value: impl Into<Value>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator,
        }
    }

    /// Equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, value, Eq)
    }

    /// Condition for an argument-less operator (`isNull`, `isEmpty`, ...).
    pub fn test(field: impl Into<String>, operator: Operator) -> Self {
        Self::new(field, Value::Null, operator)
    }
}

impl<F: Into<String>, V: Into<Value>> From<(F, V)> for Filter {
    fn from((field, value): (F, V)) -> Self {
        Filter::eq(field, value)
    }
}

impl<F: Into<String>, V: Into<Value>> From<(F, V, Operator)> for Filter {
    fn from((field, value, operator): (F, V, Operator)) -> Self {
        Filter::new(field, value, operator)
    }
}

/// Validate `arg` for `operator` on a field of `semantic_type`.
///
/// Integer arguments aimed at `double` fields are widened, matching how
/// integers are stored into those fields.
fn check_argument(
    field: &str,
    semantic_type: SemanticType,
    operator: Operator,
    arg: Value,
) -> Result<Value, AtlasError> {
    let invalid = |expected: String, reason: String| AtlasError::InvalidArgument {
        field: field.to_string(),
        operator,
        expected,
        reason,
    };
    match operator {
        IsNull | IsNotNull | IsEmpty | IsNotEmpty => Ok(Value::Null),
        In | NotIn => match widen(semantic_type, arg) {
            Value::Array(items) => Ok(Value::Array(items)),
            other => Err(invalid(
                "array".to_string(),
                format!("got {}", other.type_name()),
            )),
        },
        Between => match widen(semantic_type, arg) {
            Value::Array(items)
                if items.len() == 2
                    && items
                        .iter()
                        .all(|item| item.semantic_type() == Some(semantic_type)) =>
            {
                Ok(Value::Array(items))
            }
            other => Err(invalid(
                format!("[{semantic_type}, {semantic_type}]"),
                format!("expected a 2-element array of bounds, got {other}"),
            )),
        },
        Has | NotHas => match arg {
            Value::Null | Value::Array(_) => Err(invalid(
                "scalar".to_string(),
                format!("got {}", arg.type_name()),
            )),
            scalar => Ok(scalar),
        },
        Eq | Neq | Gt | Gte | Lt | Lte | Like | NotLike => {
            let arg = widen(semantic_type, arg);
            if arg.semantic_type() == Some(semantic_type) {
                Ok(arg)
            } else {
                Err(invalid(
                    semantic_type.to_string(),
                    format!("got {}", arg.type_name()),
                ))
            }
        }
    }
}

fn widen(semantic_type: SemanticType, arg: Value) -> Value {
    if semantic_type != SemanticType::Double {
        return arg;
    }
    match arg {
        Value::Integer(integer) => Value::Double(integer as f64),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| widen(SemanticType::Double, item))
                .collect(),
        ),
        other => other,
    }
}

/// Applies filters to a current record set, narrowing it step by step.
#[derive(Clone, Debug)]
pub struct FilterEngine<R: Record> {
    current: RecordSet<R>,
}

impl<R: Record> FilterEngine<R> {
    /// Start from `set`.
    pub fn new(set: RecordSet<R>) -> Self {
        Self { current: set }
    }

    /// Set produced by the filters applied so far.
    pub fn current(&self) -> &RecordSet<R> {
        &self.current
    }

    /// Consume the engine, returning the current set.
    pub fn into_current(self) -> RecordSet<R> {
        self.current
    }

    /// Keep records whose `field` satisfies `operator` against `value`.
    ///
    /// Fails with `UnknownField`, `InvalidOperator`, or `InvalidArgument`
    /// before touching any record; the current set is only replaced on
    /// success.
    pub fn apply_filter(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        operator: Operator,
    ) -> Result<&RecordSet<R>, AtlasError> {
        let map = Arc::clone(self.current.entity_map());
        let meta = map.meta(field)?;
        let allowed = allowed_operators(meta.semantic_type);
        if !allowed.contains(&operator) {
            return Err(AtlasError::InvalidOperator {
                field: field.to_string(),
                operator,
                semantic_type: meta.semantic_type,
                allowed,
            });
        }
        let arg = check_argument(field, meta.semantic_type, operator, value.into())?;
        let predicate = operator.predicate();

        let mut narrowed = CollectionMutator::new(Arc::clone(&map));
        narrowed.append_all(
            self.current
                .iter()
                .filter(|record| {
                    let value = record.field_values().get(meta.name).unwrap_or(&Value::Null);
                    predicate(value, &arg)
                })
                .cloned(),
        );
        self.current = narrowed.finish();
        Ok(&self.current)
    }

    /// Apply one prepared `Filter`.
    pub fn apply(&mut self, filter: &Filter) -> Result<&RecordSet<R>, AtlasError> {
        self.apply_filter(&filter.field, filter.value.clone(), filter.operator)
    }

    /// Apply `filters` in order, each narrowing the previous result.
    pub fn apply_filters(&mut self, filters: &[Filter]) -> Result<&RecordSet<R>, AtlasError> {
        for filter in filters {
            self.apply(filter)?;
        }
        Ok(&self.current)
    }

    /// First record of the current set matching `identifier`.
    pub fn find_by_identifier(&self, identifier: &str) -> Option<&Arc<R>> {
        find_by_identifier(&self.current, identifier)
    }
}

/// First record in `set` whose identifier fields contain `identifier`,
/// compared case-insensitively.
///
/// Array identifier fields contribute each non-empty element; integer values
/// compare by their decimal text.
pub fn find_by_identifier<'s, R: Record>(
    set: &'s RecordSet<R>,
    identifier: &str,
) -> Option<&'s Arc<R>> {
    let needle = identifier.to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let fields: Vec<&str> = set.entity_map().identifiers().map(|meta| meta.name).collect();
    set.iter().find(|record| {
        let values = record.field_values();
        fields.iter().any(|field| {
            values
                .get(field)
                .is_some_and(|value| identifier_matches(value, &needle))
        })
    })
}

fn identifier_matches(value: &Value, needle: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| identifier_matches(item, needle)),
        Value::String(text) => !text.is_empty() && text.to_lowercase() == needle,
        Value::Integer(integer) => integer.to_string() == needle,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{Place, place, place_map};

    fn codes(set: &RecordSet<Place>) -> Vec<String> {
        set.iter()
            .filter_map(|record| record.field_values().str("code").map(str::to_string))
            .collect()
    }

    fn sample() -> RecordSet<Place> {
        let mut mutator = CollectionMutator::new(place_map());
        mutator
            .append(place("DNK", "Denmark", 5_593_790, &["DEU"]))
            .append(place("DEU", "Germany", 83_000_000, &["DNK", "AUT"]))
            .append(place("ISL", "Iceland", 370_000, &[]))
            .append(place("AUT", "Austria", 9_000_000, &["DEU"]));
        mutator.finish()
    }

    #[test]
    fn operator_names_round_trip_and_btw_alias() {
        for operator in Operator::ALL {
            assert_eq!(operator.as_str().parse::<Operator>().unwrap(), operator);
        }
        assert_eq!("btw".parse::<Operator>().unwrap(), Between);
        assert!(matches!(
            "like%".parse::<Operator>(),
            Err(AtlasError::UnknownOperator(name)) if name == "like%"
        ));
    }

    #[test]
    fn ordering_and_membership_filters() {
        let set = sample();
        assert_eq!(codes(&set.filter("population", 5_000_000, Gt).unwrap()), ["DNK", "DEU", "AUT"]);
        assert_eq!(codes(&set.filter("population", 5_593_790, Lte).unwrap()), ["DNK", "ISL"]);
        assert_eq!(
            codes(&set.filter("code", vec!["ISL", "DNK"], In).unwrap()),
            ["DNK", "ISL"]
        );
        assert_eq!(
            codes(&set.filter("code", vec!["ISL", "DNK"], NotIn).unwrap()),
            ["DEU", "AUT"]
        );
        assert_eq!(
            codes(&set.filter("population", vec![1_000_000, 10_000_000], Between).unwrap()),
            ["DNK", "AUT"]
        );
    }

    #[test]
    fn array_and_text_filters() {
        let set = sample();
        assert_eq!(codes(&set.filter("borders", "DNK", Has).unwrap()), ["DEU"]);
        assert_eq!(codes(&set.filter("borders", "DEU", NotHas).unwrap()), ["DEU", "ISL"]);
        assert_eq!(codes(&set.filter("borders", Value::Null, IsEmpty).unwrap()), ["ISL"]);
        assert_eq!(codes(&set.filter("borders", Value::Null, IsNotEmpty).unwrap()).len(), 3);
        assert_eq!(codes(&set.filter("name", "land", Like).unwrap()), ["ISL"]);
        assert_eq!(codes(&set.filter("name", "many", NotLike).unwrap()), ["DNK", "ISL", "AUT"]);
    }

    #[test]
    fn null_values_never_satisfy_orderings() {
        let set = sample();
        assert!(set.filter("area", 1.0, Gt).unwrap().is_empty());
        assert!(set.filter("area", 1.0, Lte).unwrap().is_empty());
        assert_eq!(set.filter("area", Value::Null, IsNull).unwrap().count(), 4);
        assert_eq!(set.filter("isIsland", Value::Null, IsNotNull).unwrap().count(), 0);
    }

    #[test]
    fn integer_arguments_widen_for_double_fields() {
        let set = sample();
        assert!(set.filter("area", 40_000, Gt).is_ok());
        assert!(set.filter("area", vec![1, 2], Between).is_ok());
        assert!(set.filter("population", 5.5, Gt).is_err());
    }

    #[test]
    fn operator_not_allowed_for_type_lists_allowed_set() {
        let err = sample().filter("borders", 1, Gt).unwrap_err();
        match &err {
            AtlasError::InvalidOperator {
                semantic_type,
                allowed,
                ..
            } => {
                assert_eq!(*semantic_type, SemanticType::Array);
                assert_eq!(*allowed, ARRAY_OPERATORS);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("isEmpty"), "{err}");
    }

    #[test]
    fn mistyped_arguments_are_rejected() {
        let set = sample();
        for (field, value, operator) in [
            ("population", Value::from("big"), Gt),
            ("code", Value::from(1), Eq),
            ("code", Value::from("DNK"), In),
            ("population", Value::from(vec![1]), Between),
            ("population", Value::from(vec![1, 2, 3]), Between),
            ("population", Value::from(vec![Value::from(1), Value::from("x")]), Between),
            ("borders", Value::Null, Has),
            ("borders", Value::from(vec!["DEU"]), Has),
            ("isIsland", Value::from("yes"), Eq),
        ] {
            let err = set.filter(field, value, operator).unwrap_err();
            assert!(
                matches!(err, AtlasError::InvalidArgument { .. }),
                "{field} {operator}: {err:?}"
            );
        }
    }

    #[test]
    fn failed_filter_keeps_current_set() {
        let mut engine = FilterEngine::new(sample());
        engine.apply_filter("population", 1_000_000, Gt).unwrap();
        assert!(engine.apply_filter("population", "x", Gt).is_err());
        assert!(engine.apply_filter("capital", "x", Eq).is_err());
        assert_eq!(codes(engine.current()), ["DNK", "DEU", "AUT"]);
    }

    #[test]
    fn filters_chain_as_successive_narrowing() {
        let mut engine = FilterEngine::new(sample());
        let filters = [
            Filter::new("population", 1_000_000, Gt),
            Filter::new("borders", "DEU", Has),
        ];
        engine.apply_filters(&filters).unwrap();
        assert_eq!(codes(engine.current()), ["DNK", "AUT"]);

        let untouched = sample().multi_filter(&[]).unwrap();
        assert_eq!(codes(&untouched), ["DNK", "DEU", "ISL", "AUT"]);
    }

    #[test]
    fn identifier_search_is_case_insensitive_and_first_match() {
        let set = sample();
        let found = set.find("dnk").unwrap();
        assert_eq!(found.field_values().str("code"), Some("DNK"));
        assert_eq!(set.find("GERMANY").unwrap().field_values().str("code"), Some("DEU"));
        assert!(set.find("atlantis").is_none());
        assert!(set.find("").is_none());

        let mut mutator = CollectionMutator::wrap(set.clone());
        mutator.append(place("XXX", "denmark", 1, &[]));
        let duplicated = mutator.finish();
        let engine = FilterEngine::new(duplicated);
        assert_eq!(
            engine.find_by_identifier("Denmark").unwrap().field_values().str("code"),
            Some("DNK")
        );
    }

    #[test]
    fn filters_build_from_tuples() {
        assert_eq!(Filter::from(("code", "DNK")), Filter::eq("code", "DNK"));
        assert_eq!(
            Filter::from(("borders", "DEU", Has)),
            Filter::new("borders", "DEU", Has)
        );
        assert_eq!(Filter::test("borders", IsEmpty).value, Value::Null);
    }
}
