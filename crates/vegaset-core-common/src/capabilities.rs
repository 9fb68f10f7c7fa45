//! Capability bindings that pair a reader with the metadata it supports.
//!
//! A [`CapabilityBinding`] guards a reader with two constraint sets, `include` and
//! `exclude`, and classifies a row's attributes `A` with a NIMPLY gate:
//!
//! | `include ⊆ A` | `exclude ∩ A` | [`Outcome`]  |
//! |---------------|---------------|--------------|
//! | no            | any           | `Irrelevant` |
//! | yes           | non-empty     | `Refused`    |
//! | yes           | empty         | `Applies`    |
//!
//! A [`CapabilityRegistry`] holds the bindings of one backend in declaration order
//! and resolves a row to the first binding that is not irrelevant.

use std::fmt;
use std::sync::Arc;

use crate::constraints::{ConstraintError, ConstraintSet};

/// Classification of one row by one binding.
pub enum Outcome<'a, F: ?Sized> {
    /// The binding's `include` set does not match; try the next binding.
    Irrelevant,
    /// The binding matches but an `exclude` pair rules the row out.
    Refused,
    /// The binding's reader handles the row.
    Applies(&'a Arc<F>),
}

impl<F: ?Sized> Outcome<'_, F> {
    #[must_use]
    pub fn is_irrelevant(&self) -> bool {
        matches!(self, Outcome::Irrelevant)
    }
}

/// A reader together with the constraints that decide when it may be used.
pub struct CapabilityBinding<F: ?Sized> {
    reader: Arc<F>,
    include: ConstraintSet,
    exclude: ConstraintSet,
}

impl<F: ?Sized> CapabilityBinding<F> {
    /// Creates a binding; `exclude` defaults to the empty set.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::Overlap`] if `include` and `exclude` share a pair,
    /// since such a binding could never apply.
    pub fn new(
        reader: Arc<F>,
        include: ConstraintSet,
        exclude: Option<ConstraintSet>,
    ) -> Result<Self, ConstraintError> {
        let exclude = exclude.unwrap_or_default();
        if !include.is_disjoint(&exclude) {
            return Err(ConstraintError::Overlap {
                overlap: include.intersection(&exclude).to_string(),
                include: include.to_string(),
                exclude: exclude.to_string(),
            });
        }
        Ok(Self {
            reader,
            include,
            exclude,
        })
    }

    #[must_use]
    pub fn reader(&self) -> &Arc<F> {
        &self.reader
    }

    #[must_use]
    pub fn include(&self) -> &ConstraintSet {
        &self.include
    }

    #[must_use]
    pub fn exclude(&self) -> &ConstraintSet {
        &self.exclude
    }

    /// Classifies `attrs` with the NIMPLY gate.
    #[must_use]
    pub fn outcome(&self, attrs: &ConstraintSet) -> Outcome<'_, F> {
        if !self.include.includes(attrs) {
            Outcome::Irrelevant
        } else if self.exclude.is_disjoint(attrs) {
            Outcome::Applies(&self.reader)
        } else {
            Outcome::Refused
        }
    }
}

impl<F: ?Sized> fmt::Debug for CapabilityBinding<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityBinding")
            .field("include", &self.include.to_string())
            .field("exclude", &self.exclude.to_string())
            .finish_non_exhaustive()
    }
}

/// Result of resolving a row against a whole registry.
pub enum Resolution<'a, F: ?Sized> {
    /// The first relevant binding applies.
    Applies(&'a Arc<F>),
    /// The first relevant binding refuses the row.
    Refused(&'a CapabilityBinding<F>),
    /// No binding is relevant.
    NoCapability,
}

impl<F: ?Sized> Resolution<'_, F> {
    /// Short label for diagnostics: `"applies"`, `"refused"`, or `"no-capability"`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Applies(_) => "applies",
            Resolution::Refused(_) => "refused",
            Resolution::NoCapability => "no-capability",
        }
    }
}

/// An ordered, immutable list of bindings for one backend.
pub struct CapabilityRegistry<F: ?Sized> {
    bindings: Vec<CapabilityBinding<F>>,
}

impl<F: ?Sized> CapabilityRegistry<F> {
    #[must_use]
    pub fn new(bindings: Vec<CapabilityBinding<F>>) -> Self {
        Self { bindings }
    }

    /// Returns the first non-irrelevant outcome, in declaration order.
    #[must_use]
    pub fn resolve(&self, attrs: &ConstraintSet) -> Resolution<'_, F> {
        for binding in &self.bindings {
            match binding.outcome(attrs) {
                Outcome::Irrelevant => {},
                Outcome::Refused => return Resolution::Refused(binding),
                Outcome::Applies(reader) => return Resolution::Applies(reader),
            }
        }
        Resolution::NoCapability
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityBinding<F>> {
        self.bindings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<F: ?Sized> fmt::Debug for CapabilityRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.bindings).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{
        Attr, AttrValue, is_csv, is_json, is_meta, is_not_tabular, is_spatial, is_topo,
    };

    type Named = &'static str;

    fn bind(name: Named, include: ConstraintSet, exclude: Option<ConstraintSet>) -> CapabilityBinding<Named> {
        CapabilityBinding::new(Arc::new(name), include, exclude).unwrap()
    }

    fn row(pairs: &[(Attr, AttrValue)]) -> ConstraintSet {
        pairs.iter().cloned().collect()
    }

    fn applied(resolution: &Resolution<'_, Named>) -> Option<Named> {
        match resolution {
            Resolution::Applies(reader) => Some(***reader),
            _ => None,
        }
    }

    #[test]
    fn test_overlap_is_rejected_for_every_attribute() {
        for attr in Attr::ALL {
            let pair = is_meta([(attr, true)]);
            let include = pair.with(Attr::Tag, "v3.2.0");
            let err = CapabilityBinding::new(Arc::new("reader"), include, Some(pair)).unwrap_err();
            assert!(matches!(err, ConstraintError::Overlap { .. }), "{attr}");
        }
    }

    #[test]
    fn test_outcomes_follow_nimply_gate() {
        let binding = bind("read_json", is_json(), Some(is_spatial()));

        let tabular = row(&[
            (Attr::Suffix, ".json".into()),
            (Attr::IsSpatial, false.into()),
        ]);
        let spatial = row(&[
            (Attr::Suffix, ".json".into()),
            (Attr::IsSpatial, true.into()),
        ]);
        let csv = row(&[(Attr::Suffix, ".csv".into())]);

        assert!(matches!(binding.outcome(&tabular), Outcome::Applies(_)));
        assert!(matches!(binding.outcome(&spatial), Outcome::Refused));
        assert!(binding.outcome(&csv).is_irrelevant());
    }

    #[test]
    fn test_registry_first_relevant_binding_wins() {
        let registry = CapabilityRegistry::new(vec![
            bind(
                "read_geojson",
                is_json().with(Attr::IsSpatial, true),
                Some(is_topo()),
            ),
            bind("read_json", is_json(), Some(is_not_tabular())),
            bind("read_csv", is_csv(), None),
        ]);

        let geo = row(&[
            (Attr::Suffix, ".json".into()),
            (Attr::IsSpatial, true.into()),
            (Attr::IsTopo, false.into()),
            (Attr::IsTabular, false.into()),
        ]);
        let topo = row(&[
            (Attr::Suffix, ".json".into()),
            (Attr::IsSpatial, true.into()),
            (Attr::IsTopo, true.into()),
            (Attr::IsTabular, false.into()),
        ]);
        let parquet = row(&[(Attr::Suffix, ".parquet".into())]);

        assert_eq!(applied(&registry.resolve(&geo)), Some("read_geojson"));
        assert_eq!(applied(&registry.resolve(&is_csv())), Some("read_csv"));
        assert_eq!(registry.resolve(&topo).label(), "refused");
        assert_eq!(registry.resolve(&parquet).label(), "no-capability");
    }

    #[test]
    fn test_refused_reports_binding() {
        let registry = CapabilityRegistry::new(vec![bind("read_json", is_json(), Some(is_spatial()))]);
        let spatial = is_json().with(Attr::IsSpatial, true);

        match registry.resolve(&spatial) {
            Resolution::Refused(binding) => {
                assert_eq!(**binding.reader(), "read_json");
                assert_eq!(binding.exclude(), &is_spatial());
            },
            other => panic!("expected refusal, got {}", other.label()),
        }
    }

    #[test]
    fn test_empty_registry_has_no_capability() {
        let registry: CapabilityRegistry<Named> = CapabilityRegistry::new(Vec::new());
        assert!(registry.is_empty());
        assert_eq!(registry.resolve(&is_csv()).label(), "no-capability");
    }
}
