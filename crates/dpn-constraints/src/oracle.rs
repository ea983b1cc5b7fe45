//! Constraint oracle
//!
//! Every component of the verification engine consults a
//! [`ConstraintOracle`] for satisfiability, equivalence and projection
//! queries over [`Constraint`]s. The oracle is treated as an opaque, blocking
//! service: the engine never inspects how a query is answered.
//!
//! [`IntervalOracle`] is the oracle shipped with this crate. It decides the
//! constraint language exactly by translating constraints into [`Region`]s.

use std::{cell::Cell, collections::BTreeSet, fmt};

use log::debug;

use crate::{
    expressions::{Constraint, Variable, VariableMap, VariableRole},
    region::Region,
};

/// Interface of the decision procedure used by the verification engine
pub trait ConstraintOracle {
    /// Check whether some assignment satisfies `formula`
    fn can_be_satisfied(&self, formula: &Constraint) -> bool;

    /// Check whether `lhs` and `rhs` are logically equivalent
    fn are_equal(&self, lhs: &Constraint, rhs: &Constraint) -> bool;

    /// Compute the constraint after a transition with guard `guard` fired in
    /// a state constrained by `source`
    ///
    /// The result is `source ∧ guard`, where the previous values of the
    /// variables in `write_vars` are forgotten and their written values become
    /// the read values visible to subsequent steps.
    fn step(&self, source: &Constraint, guard: &Constraint, write_vars: &VariableMap)
    -> Constraint;

    /// Existentially eliminate the instances of `vars` in role `role`
    fn project(&self, formula: &Constraint, vars: &VariableMap, role: VariableRole)
    -> Constraint;

    /// Return an equivalent, simplified constraint
    fn simplify(&self, formula: &Constraint) -> Constraint;

    /// Check whether every assignment satisfying `lhs` satisfies `rhs`
    fn implies(&self, lhs: &Constraint, rhs: &Constraint) -> bool {
        !self.can_be_satisfied(&(lhs.clone() & !rhs.clone()))
    }

    /// Log statistics about the answered queries
    fn log_statistics(&self) {}
}

/// Number of queries answered by an oracle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStatistics {
    /// Satisfiability queries
    pub satisfiability: usize,
    /// Equivalence queries
    pub equivalence: usize,
    /// Step computations
    pub steps: usize,
    /// Projections
    pub projections: usize,
}

impl fmt::Display for OracleStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} satisfiability, {} equivalence, {} step and {} projection queries",
            self.satisfiability, self.equivalence, self.steps, self.projections
        )
    }
}

/// Oracle deciding constraints through interval regions
///
/// Each verification run should own its oracle, the query counters are not
/// shared between threads.
///
/// # Example
///
/// ```
/// use dpn_constraints::{expressions::*, oracle::{ConstraintOracle, IntervalOracle}};
///
/// let oracle = IntervalOracle::new();
/// let x_r = Variable::read("x", Domain::Integer);
/// let x_w = Variable::write("x", Domain::Integer);
///
/// let source = Constraint::comparison(x_r.clone(), ComparisonOp::Eq, 0);
/// let guard = Constraint::comparison(x_w.clone(), ComparisonOp::Eq, 5);
///
/// let next = oracle.step(&source, &guard, &guard.write_vars());
/// assert!(oracle.are_equal(&next, &Constraint::comparison(x_r, ComparisonOp::Eq, 5)));
/// ```
#[derive(Debug, Default)]
pub struct IntervalOracle {
    statistics: Cell<OracleStatistics>,
}

impl IntervalOracle {
    /// Create a new oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries answered so far
    pub fn statistics(&self) -> OracleStatistics {
        self.statistics.get()
    }

    fn count(&self, f: impl FnOnce(&mut OracleStatistics)) {
        let mut stats = self.statistics.get();
        f(&mut stats);
        self.statistics.set(stats);
    }

    /// Instances of the variables in `vars` in role `role` as they appear in
    /// the given regions
    fn instances(vars: &VariableMap, role: VariableRole, regions: &[&Region]) -> BTreeSet<Variable> {
        regions
            .iter()
            .flat_map(|r| r.cubes().iter().flat_map(|c| c.variables()))
            .filter(|v| v.role() == role && vars.contains_key(v.name()))
            .cloned()
            .collect()
    }
}

impl ConstraintOracle for IntervalOracle {
    fn can_be_satisfied(&self, formula: &Constraint) -> bool {
        self.count(|s| s.satisfiability += 1);
        !Region::from_constraint(formula).is_empty()
    }

    fn are_equal(&self, lhs: &Constraint, rhs: &Constraint) -> bool {
        self.count(|s| s.equivalence += 1);
        if lhs == rhs {
            return true;
        }
        Region::from_constraint(lhs).is_equivalent(&Region::from_constraint(rhs))
    }

    fn step(
        &self,
        source: &Constraint,
        guard: &Constraint,
        write_vars: &VariableMap,
    ) -> Constraint {
        self.count(|s| s.steps += 1);
        let conjunction =
            Region::from_constraint(source).intersect(&Region::from_constraint(guard));

        let overwritten = Self::instances(write_vars, VariableRole::Read, &[&conjunction]);
        conjunction
            .project(&overwritten)
            .rename_role(write_vars, VariableRole::Write, VariableRole::Read)
            .to_constraint()
    }

    fn project(
        &self,
        formula: &Constraint,
        vars: &VariableMap,
        role: VariableRole,
    ) -> Constraint {
        self.count(|s| s.projections += 1);
        let region = Region::from_constraint(formula);
        let eliminated = Self::instances(vars, role, &[&region]);
        region.project(&eliminated).to_constraint()
    }

    fn simplify(&self, formula: &Constraint) -> Constraint {
        Region::from_constraint(formula).to_constraint()
    }

    fn log_statistics(&self) {
        debug!("Constraint oracle answered {}", self.statistics());
    }
}
