//! Transition guards
//!
//! A [`Guard`] wraps the constraint of a transition together with its
//! modification history. Guards are values: every transformation returns a
//! new guard and leaves the original untouched, so the repair loop can keep
//! the state before each step and restore it on rollback.

use std::fmt;

use dpn_constraints::{
    expressions::{Constraint, VariableMap, VariableRole},
    oracle::ConstraintOracle,
};

/// Guard of a transition
///
/// The set of written variables is part of the guard and only ever grows:
/// a transformation that simplifies a write constraint away still leaves the
/// variable written, i.e. it is assigned an arbitrary value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guard {
    /// Constraints the guard was built from
    base_constraints: Vec<Constraint>,
    /// Current constraint of the guard
    actual: Constraint,
    /// Constraint before the first repair, if the guard has been repaired
    before_update: Option<Constraint>,
    /// Variables written by the transition
    write_vars: VariableMap,
    /// Variables read by the transition
    read_vars: VariableMap,
}

impl Guard {
    /// Create a new guard as the conjunction of `base_constraints`
    pub fn new(base_constraints: Vec<Constraint>) -> Self {
        let actual = Constraint::conjunction(base_constraints.iter().cloned());
        let write_vars = actual.write_vars();
        let read_vars = actual.read_vars();
        Self {
            base_constraints,
            actual,
            before_update: None,
            write_vars,
            read_vars,
        }
    }

    /// Guard that is always satisfied and writes nothing
    pub fn tautology() -> Self {
        Self::new(Vec::new())
    }

    /// Declare additional written variables that the constraint does not
    /// mention
    pub fn with_writes(mut self, writes: VariableMap) -> Self {
        self.write_vars.extend(writes);
        self
    }

    /// Current constraint of the guard
    pub fn actual_constraint(&self) -> &Constraint {
        &self.actual
    }

    /// Constraint before the first repair, or the current constraint if the
    /// guard has never been repaired
    pub fn constraint_before_update(&self) -> &Constraint {
        self.before_update.as_ref().unwrap_or(&self.actual)
    }

    /// Constraints the guard was originally built from
    pub fn base_constraints(&self) -> &[Constraint] {
        &self.base_constraints
    }

    /// Check whether the guard has been modified by a repair
    pub fn is_repaired(&self) -> bool {
        self.before_update.is_some()
    }

    /// Variables written by the transition
    pub fn write_vars(&self) -> &VariableMap {
        &self.write_vars
    }

    /// Variables read by the transition
    pub fn read_vars(&self) -> &VariableMap {
        &self.read_vars
    }

    /// Check whether the guard neither reads nor writes any variable
    pub fn is_data_free(&self) -> bool {
        self.write_vars.is_empty() && self.read_vars.is_empty()
    }

    /// Condition on the read values under which the guard can fire
    ///
    /// The written instances are existentially eliminated.
    pub fn read_condition<O: ConstraintOracle>(&self, oracle: &O) -> Constraint {
        if self.write_vars.is_empty() {
            return self.actual.clone();
        }
        oracle.project(&self.actual, &self.write_vars, VariableRole::Write)
    }

    /// Guard strengthened with `conjunct`
    ///
    /// Refinement produces a fresh guard whose base constraints include the
    /// conjunct; the repair history is kept.
    pub fn refined(&self, conjunct: Constraint) -> Self {
        let mut base_constraints = self.base_constraints.clone();
        base_constraints.push(conjunct.clone());
        let actual = self.actual.clone() & conjunct;
        self.with_actual(base_constraints, actual, self.before_update.clone())
    }

    /// Guard replaced by the repaired constraint `actual`
    ///
    /// The constraint before the first repair is recorded.
    pub fn repaired(&self, actual: Constraint) -> Self {
        let before_update = Some(self.constraint_before_update().clone());
        self.with_actual(self.base_constraints.clone(), actual, before_update)
    }

    /// Guard with a simplified but equivalent constraint
    pub fn simplified<O: ConstraintOracle>(&self, oracle: &O) -> Self {
        let actual = oracle.simplify(&self.actual);
        self.with_actual(
            self.base_constraints.clone(),
            actual,
            self.before_update.clone(),
        )
    }

    /// Disjunction of `guards`
    ///
    /// Used to merge split transitions back into their base transition.
    /// Returns `None` if `guards` is empty.
    pub fn merged<'a, O: ConstraintOracle>(
        guards: impl IntoIterator<Item = &'a Guard>,
        oracle: &O,
    ) -> Option<Self> {
        let guards = guards.into_iter().collect::<Vec<_>>();
        let first = guards.first()?;

        let actual = oracle.simplify(&Constraint::disjunction(
            guards.iter().map(|g| g.actual.clone()),
        ));
        let before_update = if guards.iter().any(|g| g.is_repaired()) {
            Some(oracle.simplify(&Constraint::disjunction(
                guards.iter().map(|g| g.constraint_before_update().clone()),
            )))
        } else {
            None
        };

        let mut merged = first.with_actual(vec![actual.clone()], actual, before_update);
        for g in &guards {
            merged.write_vars.extend(g.write_vars.clone());
            merged.read_vars.extend(g.read_vars.clone());
        }
        Some(merged)
    }

    fn with_actual(
        &self,
        base_constraints: Vec<Constraint>,
        actual: Constraint,
        before_update: Option<Constraint>,
    ) -> Self {
        let mut write_vars = self.write_vars.clone();
        write_vars.extend(actual.write_vars());
        let mut read_vars = self.read_vars.clone();
        read_vars.extend(actual.read_vars());

        Self {
            base_constraints,
            actual,
            before_update,
            write_vars,
            read_vars,
        }
    }
}

impl From<Constraint> for Guard {
    fn from(value: Constraint) -> Self {
        Guard::new(value.conjuncts().into_iter().cloned().collect())
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.actual)
    }
}

#[cfg(test)]
mod tests {
    use dpn_constraints::{
        expressions::{ComparisonOp, Domain, Variable},
        oracle::IntervalOracle,
    };

    use super::*;

    fn x_w() -> Variable {
        Variable::write("x", Domain::Integer)
    }

    fn x_r() -> Variable {
        Variable::read("x", Domain::Integer)
    }

    #[test]
    fn test_new_guard_tracks_vars() {
        let guard = Guard::new(vec![
            Constraint::comparison(x_w(), ComparisonOp::Eq, 5),
            Constraint::comparison(Variable::read("y", Domain::Real), ComparisonOp::Gt, 0),
        ]);

        assert!(guard.write_vars().contains_key("x"));
        assert!(guard.read_vars().contains_key("y"));
        assert!(!guard.is_repaired());
        assert_eq!(guard.constraint_before_update(), guard.actual_constraint());
    }

    #[test]
    fn test_repair_keeps_first_checkpoint() {
        let guard = Guard::from(Constraint::comparison(x_r(), ComparisonOp::Gt, 0));
        let repaired = guard.repaired(Constraint::comparison(x_r(), ComparisonOp::Gt, 3));

        assert!(repaired.is_repaired());
        assert_eq!(
            repaired.constraint_before_update(),
            guard.actual_constraint()
        );

        // a second repair keeps the first history entry
        let twice = repaired.repaired(Constraint::comparison(x_r(), ComparisonOp::Gt, 4));
        assert_eq!(twice.constraint_before_update(), guard.actual_constraint());
        assert_eq!(twice.base_constraints(), guard.base_constraints());
    }

    #[test]
    fn test_writes_survive_simplification() {
        let oracle = IntervalOracle::new();
        let guard = Guard::from(
            Constraint::comparison(x_w(), ComparisonOp::Gt, 0)
                | Constraint::comparison(x_w(), ComparisonOp::Leq, 0),
        );

        let simplified = guard.simplified(&oracle);
        assert!(simplified.actual_constraint().is_true());
        assert!(simplified.write_vars().contains_key("x"));
    }

    #[test]
    fn test_read_condition() {
        let oracle = IntervalOracle::new();
        let guard = Guard::from(
            Constraint::comparison(x_w(), ComparisonOp::Eq, 5)
                & Constraint::comparison(x_r(), ComparisonOp::Gt, 0),
        );

        let cond = guard.read_condition(&oracle);
        assert!(cond.write_vars().is_empty());
        assert!(oracle.are_equal(&cond, &Constraint::comparison(x_r(), ComparisonOp::Gt, 0)));
    }

    #[test]
    fn test_merged() {
        let oracle = IntervalOracle::new();
        let a = Guard::from(Constraint::comparison(x_r(), ComparisonOp::Gt, 0));
        let b = Guard::from(Constraint::comparison(x_r(), ComparisonOp::Leq, 0));

        let merged = Guard::merged([&a, &b], &oracle).unwrap();
        assert!(oracle.are_equal(merged.actual_constraint(), &Constraint::True));
        assert!(Guard::merged(std::iter::empty::<&Guard>(), &oracle).is_none());
    }
}
