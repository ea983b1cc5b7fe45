//! Intervals and normalized interval sets over a variable domain
//!
//! An [`IntervalSet`] is the set of values a single variable may take inside
//! one box of a region. Sets are kept in a canonical form: intervals are
//! non-empty, sorted, pairwise disjoint and non-adjacent. For integer and
//! boolean variables all bounds are closed integer bounds, so two sets
//! describing the same values are structurally equal.

use std::{
    cmp::Ordering,
    fmt::{self, Display},
    ops::Bound,
};

use crate::{
    expressions::{ComparisonOp, Constraint, Domain, Variable},
    fraction::Fraction,
};

/// Interval with optional lower and upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    /// Lower / left boundary of the interval
    lower: Bound<Fraction>,
    /// Upper / right boundary of the interval
    upper: Bound<Fraction>,
}

impl Interval {
    /// Create a new interval
    pub fn new(lower: Bound<Fraction>, upper: Bound<Fraction>) -> Self {
        Self { lower, upper }
    }

    /// Interval containing every value
    pub fn unbounded() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Interval containing exactly `value`
    pub fn point(value: Fraction) -> Self {
        Self::new(Bound::Included(value), Bound::Included(value))
    }

    /// Lower bound of the interval
    pub fn lower(&self) -> Bound<Fraction> {
        self.lower
    }

    /// Upper bound of the interval
    pub fn upper(&self) -> Bound<Fraction> {
        self.upper
    }

    /// Interval of values `v` satisfying `v op value`
    ///
    /// `Neq` is not representable as a single interval and yields `None`.
    pub fn from_comparison(op: ComparisonOp, value: Fraction) -> Option<Self> {
        let res = match op {
            ComparisonOp::Gt => Self::new(Bound::Excluded(value), Bound::Unbounded),
            ComparisonOp::Geq => Self::new(Bound::Included(value), Bound::Unbounded),
            ComparisonOp::Eq => Self::point(value),
            ComparisonOp::Leq => Self::new(Bound::Unbounded, Bound::Included(value)),
            ComparisonOp::Lt => Self::new(Bound::Unbounded, Bound::Excluded(value)),
            ComparisonOp::Neq => return None,
        };
        Some(res)
    }

    /// Check whether the interval contains no value of the real line
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(l), Bound::Included(u)) => l > u,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        }
    }

    /// Check whether `value` lies in the interval
    pub fn contains(&self, value: &Fraction) -> bool {
        let above_lower = match self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => l <= *value,
            Bound::Excluded(l) => l < *value,
        };
        let below_upper = match self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => *value <= u,
            Bound::Excluded(u) => *value < u,
        };
        above_lower && below_upper
    }

    /// Returns the single value of a point interval
    pub fn as_point(&self) -> Option<Fraction> {
        match (self.lower, self.upper) {
            (Bound::Included(l), Bound::Included(u)) if l == u => Some(l),
            _ => None,
        }
    }

    /// Intersection of two intervals
    pub fn intersect(&self, other: &Self) -> Self {
        let lower = match cmp_lower(&self.lower, &other.lower) {
            Ordering::Less => other.lower,
            _ => self.lower,
        };
        let upper = match cmp_upper(&self.upper, &other.upper) {
            Ordering::Greater => other.upper,
            _ => self.upper,
        };
        Self { lower, upper }
    }

    /// Restrict the bounds to the values admissible in `domain`
    ///
    /// Integer and boolean intervals are turned into closed integer intervals,
    /// boolean intervals are additionally clipped to `[0, 1]`.
    fn normalize_for(self, domain: Domain) -> Self {
        if domain == Domain::Real {
            return self;
        }

        // bounds beyond the range of a fraction keep their original form
        let closed = |value: i128, bound: Bound<Fraction>| {
            Fraction::try_from(value).map_or(bound, Bound::Included)
        };
        let lower = match self.lower {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Included(v) => closed(v.ceil(), self.lower),
            Bound::Excluded(v) => closed(v.floor() + 1, self.lower),
        };
        let upper = match self.upper {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Included(v) => closed(v.floor(), self.upper),
            Bound::Excluded(v) => closed(v.ceil() - 1, self.upper),
        };

        let res = Self { lower, upper };
        if domain == Domain::Bool {
            return res.intersect(&Self::new(
                Bound::Included(Fraction::zero()),
                Bound::Included(Fraction::one()),
            ));
        }
        res
    }

    /// Encode the interval as a constraint on `var`
    fn to_constraint(self, var: &Variable) -> Constraint {
        if let Some(p) = self.as_point() {
            return Constraint::comparison(var.clone(), ComparisonOp::Eq, p);
        }

        let lower = match self.lower {
            Bound::Unbounded => Constraint::True,
            Bound::Included(v) => Constraint::comparison(var.clone(), ComparisonOp::Geq, v),
            Bound::Excluded(v) => Constraint::comparison(var.clone(), ComparisonOp::Gt, v),
        };
        let upper = match self.upper {
            Bound::Unbounded => Constraint::True,
            Bound::Included(v) => Constraint::comparison(var.clone(), ComparisonOp::Leq, v),
            Bound::Excluded(v) => Constraint::comparison(var.clone(), ComparisonOp::Lt, v),
        };
        lower & upper
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Bound::Unbounded => write!(f, "(-inf")?,
            Bound::Included(v) => write!(f, "[{v}")?,
            Bound::Excluded(v) => write!(f, "({v}")?,
        }
        write!(f, ", ")?;
        match self.upper {
            Bound::Unbounded => write!(f, "inf)"),
            Bound::Included(v) => write!(f, "{v}]"),
            Bound::Excluded(v) => write!(f, "{v})"),
        }
    }
}

/// Order lower bounds by the smallest value they admit
fn cmp_lower(a: &Bound<Fraction>, b: &Bound<Fraction>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Order upper bounds by the largest value they admit
fn cmp_upper(a: &Bound<Fraction>, b: &Bound<Fraction>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// Bound admitting exactly the values the given bound excludes at the same
/// position
fn flip(bound: Bound<Fraction>) -> Bound<Fraction> {
    match bound {
        Bound::Unbounded => Bound::Unbounded,
        Bound::Included(v) => Bound::Excluded(v),
        Bound::Excluded(v) => Bound::Included(v),
    }
}

/// Check whether an interval ending in `upper` and one starting in `lower`
/// (not before the first one starts) can be merged into one interval
fn touches(upper: &Bound<Fraction>, lower: &Bound<Fraction>, domain: Domain) -> bool {
    match (upper, lower) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Included(u), Bound::Included(l)) if domain != Domain::Real => {
            l.floor() <= u.floor() + 1
        }
        (Bound::Included(u), Bound::Included(l))
        | (Bound::Included(u), Bound::Excluded(l))
        | (Bound::Excluded(u), Bound::Included(l)) => l <= u,
        (Bound::Excluded(u), Bound::Excluded(l)) => l < u,
    }
}

/// Canonical set of values of one variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    domain: Domain,
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Create a normalized interval set from arbitrary intervals
    pub fn new(domain: Domain, intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut intervals = intervals
            .into_iter()
            .map(|i| i.normalize_for(domain))
            .filter(|i| !i.is_empty())
            .collect::<Vec<_>>();
        intervals.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if let Some(last) = merged.last_mut() {
                if touches(&last.upper, &interval.lower, domain) {
                    if cmp_upper(&interval.upper, &last.upper) == Ordering::Greater {
                        last.upper = interval.upper;
                    }
                    continue;
                }
            }
            merged.push(interval);
        }

        Self {
            domain,
            intervals: merged,
        }
    }

    /// Set of all values of the domain
    pub fn universe(domain: Domain) -> Self {
        Self::new(domain, [Interval::unbounded()])
    }

    /// Empty set
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            intervals: Vec::new(),
        }
    }

    /// Values `v` satisfying `v op value`
    ///
    /// # Example
    ///
    /// ```
    /// use dpn_constraints::{expressions::{ComparisonOp, Domain}, fraction::Fraction, interval::IntervalSet};
    ///
    /// let gt = IntervalSet::from_comparison(Domain::Integer, ComparisonOp::Gt, Fraction::from(2));
    /// let geq = IntervalSet::from_comparison(Domain::Integer, ComparisonOp::Geq, Fraction::from(3));
    /// assert_eq!(gt, geq);
    /// ```
    pub fn from_comparison(domain: Domain, op: ComparisonOp, value: Fraction) -> Self {
        match Interval::from_comparison(op, value) {
            Some(i) => Self::new(domain, [i]),
            None => Self::new(domain, [Interval::point(value)]).complement(),
        }
    }

    /// Domain the set ranges over
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Intervals of the set in ascending order
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Check whether the set contains no value
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Check whether the set contains every value of the domain
    pub fn is_universe(&self) -> bool {
        *self == Self::universe(self.domain)
    }

    /// Check whether `value` is contained in the set
    pub fn contains(&self, value: &Fraction) -> bool {
        self.intervals.iter().any(|i| i.contains(value))
    }

    /// Intersection of two sets
    pub fn intersect(&self, other: &Self) -> Self {
        debug_assert_eq!(self.domain, other.domain);
        let intervals = self
            .intervals
            .iter()
            .flat_map(|a| other.intervals.iter().map(move |b| a.intersect(b)))
            .collect::<Vec<_>>();
        Self::new(self.domain, intervals)
    }

    /// Union of two sets
    pub fn union(&self, other: &Self) -> Self {
        debug_assert_eq!(self.domain, other.domain);
        Self::new(
            self.domain,
            self.intervals.iter().chain(other.intervals.iter()).copied(),
        )
    }

    /// Values of the domain not contained in the set
    pub fn complement(&self) -> Self {
        let mut gaps = Vec::with_capacity(self.intervals.len() + 1);
        let mut next_lower = Bound::Unbounded;

        for interval in self.intervals.iter() {
            if interval.lower != Bound::Unbounded {
                gaps.push(Interval::new(next_lower, flip(interval.lower)));
            }

            if interval.upper == Bound::Unbounded {
                return Self::new(self.domain, gaps);
            }
            next_lower = flip(interval.upper);
        }

        gaps.push(Interval::new(next_lower, Bound::Unbounded));
        Self::new(self.domain, gaps)
    }

    /// Check whether every value of `self` is contained in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        self.intersect(&other.complement()).is_empty()
    }

    /// Encode the set as a constraint on `var`
    pub fn to_constraint(&self, var: &Variable) -> Constraint {
        if self.is_empty() {
            return Constraint::False;
        }
        if self.is_universe() {
            return Constraint::True;
        }

        let complement = self.complement();
        if let [single] = complement.intervals() {
            if let Some(p) = single.as_point() {
                if self.domain == Domain::Bool {
                    return Constraint::comparison(var.clone(), ComparisonOp::Eq, p == Fraction::zero());
                }
                return Constraint::comparison(var.clone(), ComparisonOp::Neq, p);
            }
        }

        Constraint::disjunction(self.intervals.iter().map(|i| i.to_constraint(var)))
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let parts = self
            .intervals
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join(" u "))
    }
}
