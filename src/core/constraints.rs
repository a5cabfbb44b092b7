// src/core/constraints.rs

//! Checks applied to resolved values: numeric bounds, their intersection and free predicates.

use crate::core::value::ConfigValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a value failed a constraint, or why a set of bounds cannot be combined.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// A bound was checked against a value that is not a number.
    #[error("value {value} is not numeric")]
    NotNumeric {
        /// The offending value.
        value: ConfigValue,
    },
    /// The value is under a lower bound.
    #[error("value {value} is {} the lower bound {bound}", if *.strict { "less than or equal to" } else { "less than" })]
    BelowLowerBound {
        /// The value, as a float.
        value: f64,
        /// The bound.
        bound: f64,
        /// Whether the bound itself is excluded.
        strict: bool,
    },
    /// The value is over an upper bound.
    #[error("value {value} is {} the upper bound {bound}", if *.strict { "greater than or equal to" } else { "greater than" })]
    AboveUpperBound {
        /// The value, as a float.
        value: f64,
        /// The bound.
        bound: f64,
        /// Whether the bound itself is excluded.
        strict: bool,
    },
    /// The tightest bounds of a composite leave no admissible value.
    #[error("incompatible constraints: lower bound {lower}{} vs upper bound {upper}{}", strictness(*.lower_strict), strictness(*.upper_strict))]
    Incompatible {
        /// Tightest lower bound.
        lower: f64,
        /// Whether it is strict.
        lower_strict: bool,
        /// Tightest upper bound.
        upper: f64,
        /// Whether it is strict.
        upper_strict: bool,
    },
    /// A [`Predicate`] returned `false`.
    #[error("value {value} does not satisfy '{description}'")]
    PredicateFailed {
        /// The offending value.
        value: ConfigValue,
        /// The predicate's description.
        description: String,
    },
}

fn strictness(strict: bool) -> &'static str {
    if strict { " (strict)" } else { "" }
}

/// A rule a resolved value must satisfy.
pub trait Constraint: fmt::Debug + Send + Sync {
    /// `Ok` when `value` is admissible.
    fn check(&self, value: &ConfigValue) -> Result<(), ConstraintError>;
}

fn numeric(value: &ConfigValue) -> Result<f64, ConstraintError> {
    value.as_f64().ok_or_else(|| ConstraintError::NotNumeric {
        value: value.clone(),
    })
}

/// Rejects values below `bound` (or equal to it when `strict`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowerBound {
    /// The bound.
    pub bound: f64,
    /// Excludes the bound itself.
    pub strict: bool,
}

impl LowerBound {
    /// Bound with explicit strictness.
    pub fn new(bound: f64, strict: bool) -> Self {
        Self { bound, strict }
    }

    /// `value > bound`
    pub fn strict(bound: f64) -> Self {
        Self::new(bound, true)
    }

    /// `value >= bound`
    pub fn inclusive(bound: f64) -> Self {
        Self::new(bound, false)
    }
}

impl Constraint for LowerBound {
    fn check(&self, value: &ConfigValue) -> Result<(), ConstraintError> {
        let x = numeric(value)?;
        let violated = if self.strict {
            x <= self.bound
        } else {
            x < self.bound
        };
        if violated {
            return Err(ConstraintError::BelowLowerBound {
                value: x,
                bound: self.bound,
                strict: self.strict,
            });
        }
        Ok(())
    }
}

/// Rejects values above `bound` (or equal to it when `strict`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperBound {
    /// The bound.
    pub bound: f64,
    /// Excludes the bound itself.
    pub strict: bool,
}

impl UpperBound {
    /// Bound with explicit strictness.
    pub fn new(bound: f64, strict: bool) -> Self {
        Self { bound, strict }
    }

    /// `value < bound`
    pub fn strict(bound: f64) -> Self {
        Self::new(bound, true)
    }

    /// `value <= bound`
    pub fn inclusive(bound: f64) -> Self {
        Self::new(bound, false)
    }
}

impl Constraint for UpperBound {
    fn check(&self, value: &ConfigValue) -> Result<(), ConstraintError> {
        let x = numeric(value)?;
        let violated = if self.strict {
            x >= self.bound
        } else {
            x > self.bound
        };
        if violated {
            return Err(ConstraintError::AboveUpperBound {
                value: x,
                bound: self.bound,
                strict: self.strict,
            });
        }
        Ok(())
    }
}

/// Either kind of bound, so both can go into one [`CompositeConstraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// A lower bound.
    Lower(LowerBound),
    /// An upper bound.
    Upper(UpperBound),
}

impl From<LowerBound> for Bound {
    fn from(bound: LowerBound) -> Self {
        Self::Lower(bound)
    }
}

impl From<UpperBound> for Bound {
    fn from(bound: UpperBound) -> Self {
        Self::Upper(bound)
    }
}

/// Intersection of several bounds, reduced to the tightest lower and upper bound.
///
/// Construction fails when the reduced bounds leave no admissible value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeConstraint {
    lower: Option<LowerBound>,
    upper: Option<UpperBound>,
}

impl CompositeConstraint {
    /// Reduces `bounds`; fails with [`ConstraintError::Incompatible`] when they cannot all hold.
    pub fn new<I>(bounds: I) -> Result<Self, ConstraintError>
    where
        I: IntoIterator,
        I::Item: Into<Bound>,
    {
        let mut lower: Option<LowerBound> = None;
        let mut upper: Option<UpperBound> = None;

        for bound in bounds.into_iter().map(Into::into) {
            match bound {
                Bound::Lower(candidate) => {
                    let tighter = lower.is_none_or(|current| {
                        candidate.bound > current.bound
                            || (candidate.bound == current.bound && candidate.strict)
                    });
                    if tighter {
                        lower = Some(candidate);
                    }
                }
                Bound::Upper(candidate) => {
                    let tighter = upper.is_none_or(|current| {
                        candidate.bound < current.bound
                            || (candidate.bound == current.bound && candidate.strict)
                    });
                    if tighter {
                        upper = Some(candidate);
                    }
                }
            }
        }

        if let (Some(lo), Some(hi)) = (lower, upper)
            && (lo.bound > hi.bound || (lo.bound == hi.bound && (lo.strict || hi.strict)))
        {
            return Err(ConstraintError::Incompatible {
                lower: lo.bound,
                lower_strict: lo.strict,
                upper: hi.bound,
                upper_strict: hi.strict,
            });
        }

        Ok(Self { lower, upper })
    }

    /// The tightest lower bound, if any was given.
    pub fn lower(&self) -> Option<LowerBound> {
        self.lower
    }

    /// The tightest upper bound, if any was given.
    pub fn upper(&self) -> Option<UpperBound> {
        self.upper
    }
}

impl Constraint for CompositeConstraint {
    fn check(&self, value: &ConfigValue) -> Result<(), ConstraintError> {
        if let Some(lower) = &self.lower {
            lower.check(value)?;
        }
        if let Some(upper) = &self.upper {
            upper.check(value)?;
        }
        Ok(())
    }
}

/// An arbitrary check, described for error messages.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    check: Arc<dyn Fn(&ConfigValue) -> bool + Send + Sync>,
}

impl Predicate {
    /// `description` is quoted in [`ConstraintError::PredicateFailed`].
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ConfigValue) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Constraint for Predicate {
    fn check(&self, value: &ConfigValue) -> Result<(), ConstraintError> {
        if (self.check)(value) {
            Ok(())
        } else {
            Err(ConstraintError::PredicateFailed {
                value: value.clone(),
                description: self.description.clone(),
            })
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> ConfigValue {
        ConfigValue::Int(i)
    }

    #[test]
    fn test_lower_bound_checker() {
        let strict = LowerBound::strict(3.0);
        assert!(strict.check(&int(5)).is_ok());
        assert!(strict.check(&int(3)).is_err());
        assert!(strict.check(&int(2)).is_err());

        let inclusive = LowerBound::inclusive(3.0);
        assert!(inclusive.check(&int(5)).is_ok());
        assert!(inclusive.check(&int(3)).is_ok());
        assert!(inclusive.check(&int(2)).is_err());
    }

    #[test]
    fn test_upper_bound_checker() {
        let strict = UpperBound::strict(5.0);
        assert!(strict.check(&int(3)).is_ok());
        assert!(strict.check(&int(5)).is_err());
        assert!(strict.check(&int(6)).is_err());

        let inclusive = UpperBound::inclusive(5.0);
        assert!(inclusive.check(&int(3)).is_ok());
        assert!(inclusive.check(&int(5)).is_ok());
        assert!(inclusive.check(&int(6)).is_err());
    }

    #[test]
    fn test_bound_error_messages() {
        let err = LowerBound::strict(0.0).check(&int(-1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "value -1 is less than or equal to the lower bound 0"
        );
        let err = UpperBound::inclusive(1.0).check(&ConfigValue::Float(1.5)).unwrap_err();
        assert_eq!(err.to_string(), "value 1.5 is greater than the upper bound 1");
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let err = LowerBound::strict(0.0)
            .check(&ConfigValue::from("ten"))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::NotNumeric { .. }));
    }

    #[test]
    fn test_composite_compatible_bounds() {
        let checker = CompositeConstraint::new([
            Bound::from(LowerBound::inclusive(3.0)),
            Bound::from(UpperBound::inclusive(10.0)),
        ])
        .unwrap();
        assert!(checker.check(&int(5)).is_ok());
        assert!(checker.check(&int(3)).is_ok());
        assert!(checker.check(&int(10)).is_ok());
        assert!(checker.check(&int(2)).is_err());
        assert!(checker.check(&int(11)).is_err());
    }

    #[test]
    fn test_composite_incompatible_bounds() {
        assert!(
            CompositeConstraint::new([
                Bound::from(LowerBound::strict(5.0)),
                Bound::from(UpperBound::inclusive(3.0)),
            ])
            .is_err()
        );
        assert!(
            CompositeConstraint::new([
                Bound::from(LowerBound::strict(5.0)),
                Bound::from(UpperBound::strict(5.0)),
            ])
            .is_err()
        );
        assert!(
            CompositeConstraint::new([
                Bound::from(LowerBound::inclusive(5.0)),
                Bound::from(UpperBound::strict(5.0)),
            ])
            .is_err()
        );
        // A single admissible point is fine.
        assert!(
            CompositeConstraint::new([
                Bound::from(LowerBound::inclusive(5.0)),
                Bound::from(UpperBound::inclusive(5.0)),
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_composite_keeps_tightest_bounds() {
        let checker = CompositeConstraint::new([
            Bound::from(LowerBound::inclusive(3.0)),
            Bound::from(UpperBound::strict(11.0)),
            Bound::from(UpperBound::inclusive(7.0)),
            Bound::from(LowerBound::strict(5.0)),
            Bound::from(UpperBound::inclusive(10.0)),
        ])
        .unwrap();
        assert_eq!(checker.lower(), Some(LowerBound::strict(5.0)));
        assert_eq!(checker.upper(), Some(UpperBound::inclusive(7.0)));
        assert!(checker.check(&ConfigValue::Float(6.1)).is_ok());
        assert!(checker.check(&int(7)).is_ok());
        assert!(checker.check(&int(4)).is_err());
        assert!(checker.check(&int(8)).is_err());
    }

    #[test]
    fn test_predicate() {
        let positive = Predicate::new("x > 0", |v| v.as_f64().is_some_and(|x| x > 0.0));
        assert!(positive.check(&int(1)).is_ok());
        let err = positive.check(&int(-5)).unwrap_err();
        assert_eq!(err.to_string(), "value -5 does not satisfy 'x > 0'");
    }
}
