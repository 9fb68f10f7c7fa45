//! Immutable attribute constraints over catalog metadata.
//!
//! A [`ConstraintSet`] is an unordered set of `(attribute, value)` pairs. It is used in
//! two places:
//!
//! - as the guard half of a capability binding, tested with set algebra against the
//!   attributes of a single [`MetadataRow`](crate::MetadataRow);
//! - as a catalog query, compiled into a [`Predicate`] that filters Arrow record batches.
//!
//! There is no way to mutate a set once it is built. Methods that derive a new set
//! ([`ConstraintSet::with`], [`ConstraintSet::intersection`]) return a fresh value.
//!
//! # Examples
//!
//! ```
//! use vegaset_core_common::constraints::{is_json, is_spatial, Attr, ConstraintSet};
//!
//! let row = ConstraintSet::new([(Attr::DatasetName, "earthquakes")])
//!     .with(Attr::Suffix, ".json")
//!     .with(Attr::IsSpatial, true);
//!
//! assert!(is_json().includes(&row));
//! assert!(is_spatial().includes(&row));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::{ArrayRef, BooleanArray, Int64Array, RecordBatch, Scalar, StringArray};
use arrow::compute::kernels::{boolean, cmp};
use arrow::error::ArrowError;
use thiserror::Error;

use crate::metadata::Suffix;

/// A catalog column that constraints may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attr {
    DatasetName,
    Suffix,
    FileName,
    Bytes,
    IsImage,
    IsTabular,
    IsGeo,
    IsTopo,
    IsSpatial,
    IsJson,
    HasSchema,
    Sha,
    Url,
    Tag,
}

impl Attr {
    /// Every attribute, in catalog column order.
    pub const ALL: [Attr; 14] = [
        Attr::DatasetName,
        Attr::Suffix,
        Attr::FileName,
        Attr::Bytes,
        Attr::IsImage,
        Attr::IsTabular,
        Attr::IsGeo,
        Attr::IsTopo,
        Attr::IsSpatial,
        Attr::IsJson,
        Attr::HasSchema,
        Attr::Sha,
        Attr::Url,
        Attr::Tag,
    ];

    /// Returns the name of the catalog column backing this attribute.
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Attr::DatasetName => "dataset_name",
            Attr::Suffix => "suffix",
            Attr::FileName => "file_name",
            Attr::Bytes => "bytes",
            Attr::IsImage => "is_image",
            Attr::IsTabular => "is_tabular",
            Attr::IsGeo => "is_geo",
            Attr::IsTopo => "is_topo",
            Attr::IsSpatial => "is_spatial",
            Attr::IsJson => "is_json",
            Attr::HasSchema => "has_schema",
            Attr::Sha => "sha",
            Attr::Url => "url",
            Attr::Tag => "tag",
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A scalar value compared for equality against a catalog column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<Suffix> for AttrValue {
    fn from(value: Suffix) -> Self {
        AttrValue::Str(value.as_str().to_string())
    }
}

/// Errors raised while building or compiling constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// An empty set has no predicate form
    #[error("Unable to compile an empty constraint set into a predicate")]
    Empty,

    /// `include` and `exclude` share at least one pair
    #[error("Constraints overlap at: {overlap}\ninclude={include}\nexclude={exclude}")]
    Overlap {
        /// The shared pairs
        overlap: String,
        /// The include set of the rejected binding
        include: String,
        /// The exclude set of the rejected binding
        exclude: String,
    },
}

/// An immutable, unordered set of `(attribute, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConstraintSet {
    items: BTreeSet<(Attr, AttrValue)>,
}

impl ConstraintSet {
    /// Builds a set from `(attribute, value)` pairs.
    pub fn new<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (Attr, V)>,
        V: Into<AttrValue>,
    {
        Self {
            items: items
                .into_iter()
                .map(|(attr, value)| (attr, value.into()))
                .collect(),
        }
    }

    /// Returns the empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a new set with one more pair.
    #[must_use]
    pub fn with(&self, attr: Attr, value: impl Into<AttrValue>) -> Self {
        let mut items = self.items.clone();
        items.insert((attr, value.into()));
        Self { items }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterates the pairs in attribute order.
    pub fn iter(&self) -> impl Iterator<Item = &(Attr, AttrValue)> {
        self.items.iter()
    }

    /// Returns the first value bound to `attr`, if any.
    #[must_use]
    pub fn get(&self, attr: Attr) -> Option<&AttrValue> {
        self.items
            .iter()
            .find(|(key, _)| *key == attr)
            .map(|(_, value)| value)
    }

    /// Returns `true` if every pair of `self` appears in `attrs`.
    ///
    /// This is the membership test used when a set guards a reader: the set
    /// "includes" a row when the row satisfies all of its pairs.
    #[must_use]
    pub fn includes(&self, attrs: &ConstraintSet) -> bool {
        self.is_subset(attrs)
    }

    #[must_use]
    pub fn is_subset(&self, other: &ConstraintSet) -> bool {
        self.items.is_subset(&other.items)
    }

    #[must_use]
    pub fn is_disjoint(&self, other: &ConstraintSet) -> bool {
        self.items.is_disjoint(&other.items)
    }

    #[must_use]
    pub fn intersection(&self, other: &ConstraintSet) -> ConstraintSet {
        Self {
            items: self.items.intersection(&other.items).cloned().collect(),
        }
    }

    /// Compiles the set into a conjunction of equality tests.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::Empty`] when the set has no pairs.
    pub fn compile(&self) -> Result<Predicate, ConstraintError> {
        if self.is_empty() {
            return Err(ConstraintError::Empty);
        }
        Ok(Predicate {
            terms: self.items.iter().cloned().collect(),
        })
    }

    fn fmt_pairs(&self) -> String {
        self.items
            .iter()
            .map(|(attr, value)| format!("{attr}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is_meta({})", self.fmt_pairs())
    }
}

impl<V: Into<AttrValue>> FromIterator<(Attr, V)> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = (Attr, V)>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// A compiled conjunction of equality tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    terms: Vec<(Attr, AttrValue)>,
}

impl Predicate {
    /// Returns `true` if every term is satisfied by `attrs`.
    #[must_use]
    pub fn matches(&self, attrs: &ConstraintSet) -> bool {
        self.terms
            .iter()
            .all(|(attr, value)| attrs.get(*attr) == Some(value))
    }

    /// Evaluates the predicate against catalog rows, producing a selection mask.
    ///
    /// # Errors
    ///
    /// Returns an [`ArrowError`] if a referenced column is missing or its type
    /// does not match the type of the constrained value.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray, ArrowError> {
        let mut mask: Option<BooleanArray> = None;
        for (attr, value) in &self.terms {
            let column = batch.column_by_name(attr.column_name()).ok_or_else(|| {
                ArrowError::SchemaError(format!("Catalog has no column '{attr}'"))
            })?;
            let term = equals(column, value)?;
            mask = Some(match mask {
                Some(acc) => boolean::and(&acc, &term)?,
                None => term,
            });
        }
        mask.ok_or_else(|| ArrowError::InvalidArgumentError("Predicate has no terms".into()))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self
            .terms
            .iter()
            .map(|(attr, value)| format!("({attr} == {value})"))
            .collect::<Vec<_>>();
        f.write_str(&terms.join(" & "))
    }
}

fn equals(column: &ArrayRef, value: &AttrValue) -> Result<BooleanArray, ArrowError> {
    match value {
        AttrValue::Bool(v) => cmp::eq(column, &Scalar::new(BooleanArray::from(vec![*v]))),
        AttrValue::Int(v) => cmp::eq(column, &Scalar::new(Int64Array::from(vec![*v]))),
        AttrValue::Str(v) => cmp::eq(column, &Scalar::new(StringArray::from(vec![v.as_str()]))),
    }
}

/// Builds a set from `(attribute, value)` pairs; alias of [`ConstraintSet::new`].
pub fn is_meta<I, V>(items: I) -> ConstraintSet
where
    I: IntoIterator<Item = (Attr, V)>,
    V: Into<AttrValue>,
{
    ConstraintSet::new(items)
}

#[must_use]
pub fn is_suffix(suffix: Suffix) -> ConstraintSet {
    is_meta([(Attr::Suffix, suffix)])
}

#[must_use]
pub fn is_csv() -> ConstraintSet {
    is_suffix(Suffix::Csv)
}

#[must_use]
pub fn is_json() -> ConstraintSet {
    is_suffix(Suffix::Json)
}

#[must_use]
pub fn is_tsv() -> ConstraintSet {
    is_suffix(Suffix::Tsv)
}

#[must_use]
pub fn is_arrow() -> ConstraintSet {
    is_suffix(Suffix::Arrow)
}

#[must_use]
pub fn is_parquet() -> ConstraintSet {
    is_suffix(Suffix::Parquet)
}

#[must_use]
pub fn is_spatial() -> ConstraintSet {
    is_meta([(Attr::IsSpatial, true)])
}

#[must_use]
pub fn is_topo() -> ConstraintSet {
    is_meta([(Attr::IsTopo, true)])
}

#[must_use]
pub fn is_not_tabular() -> ConstraintSet {
    is_meta([(Attr::IsTabular, false)])
}

#[must_use]
pub fn is_image() -> ConstraintSet {
    is_meta([(Attr::IsImage, true)])
}
