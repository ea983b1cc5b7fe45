//! Regions: constraints in disjunctive normal form over boxes
//!
//! A [`Region`] is a finite union of [`Cube`]s. A cube constrains every
//! variable instance independently to an [`IntervalSet`]; variables that do
//! not appear in a cube are unconstrained. Because every atom of the
//! constraint language compares a single variable with a constant, every
//! constraint has an exact representation as a region, and all oracle queries
//! (satisfiability, equivalence, projection) reduce to set operations on
//! regions.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
};

use crate::{
    expressions::{BooleanConnective, Constraint, Variable, VariableMap, VariableRole},
    interval::IntervalSet,
};

/// Conjunction of per-variable interval constraints
///
/// Invariant: a cube never stores an empty or a universal interval set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cube {
    bounds: BTreeMap<Variable, IntervalSet>,
}

impl Cube {
    /// Cube without any constraint
    pub fn top() -> Self {
        Self::default()
    }

    /// Cube constraining a single variable, `None` if `set` is empty
    pub fn single(var: Variable, set: IntervalSet) -> Option<Self> {
        Self::top().restrict(var, set)
    }

    /// Values the cube admits for `var`
    pub fn get(&self, var: &Variable) -> IntervalSet {
        self.bounds
            .get(var)
            .cloned()
            .unwrap_or_else(|| IntervalSet::universe(var.domain()))
    }

    /// Variables constrained by the cube
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bounds.keys()
    }

    /// Intersect the values of `var` with `set`
    ///
    /// Returns `None` if the resulting cube is empty.
    pub fn restrict(mut self, var: Variable, set: IntervalSet) -> Option<Self> {
        let new_set = self.get(&var).intersect(&set);
        if new_set.is_empty() {
            return None;
        }

        if new_set.is_universe() {
            self.bounds.remove(&var);
        } else {
            self.bounds.insert(var, new_set);
        }
        Some(self)
    }

    /// Intersection of two cubes, `None` if it is empty
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        other
            .bounds
            .iter()
            .try_fold(self.clone(), |acc, (var, set)| {
                acc.restrict(var.clone(), set.clone())
            })
    }

    /// Check whether every assignment in `self` is also in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        other
            .bounds
            .iter()
            .all(|(var, set)| self.get(var).is_subset(set))
    }

    /// Complement of the cube as a region
    pub fn complement(&self) -> Region {
        let cubes = self
            .bounds
            .iter()
            .filter_map(|(var, set)| Cube::single(var.clone(), set.complement()))
            .collect::<Vec<_>>();
        Region::from_cubes(cubes)
    }

    /// Drop the constraints on the given variable instances
    fn forget(&mut self, vars: &BTreeSet<Variable>) {
        self.bounds.retain(|var, _| !vars.contains(var));
    }

    /// Change the role of the variables named in `names` from `from` to `to`
    fn rename_role(&self, names: &VariableMap, from: VariableRole, to: VariableRole) -> Self {
        let bounds = self
            .bounds
            .iter()
            .map(|(var, set)| {
                if var.role() == from && names.contains_key(var.name()) {
                    (var.with_role(to), set.clone())
                } else {
                    (var.clone(), set.clone())
                }
            })
            .collect();
        Self { bounds }
    }

    /// Check whether the cubes only differ in the values of a single variable
    fn differs_in_one_variable(&self, other: &Self) -> Option<Variable> {
        let vars = self
            .bounds
            .keys()
            .chain(other.bounds.keys())
            .collect::<BTreeSet<_>>();

        let mut differing = vars
            .into_iter()
            .filter(|var| self.bounds.get(*var) != other.bounds.get(*var));
        let first = differing.next()?;
        if differing.next().is_some() {
            return None;
        }
        Some(first.clone())
    }

    /// Encode the cube as a conjunction
    pub fn to_constraint(&self) -> Constraint {
        Constraint::conjunction(self.bounds.iter().map(|(var, set)| set.to_constraint(var)))
    }
}

impl Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bounds.is_empty() {
            return write!(f, "top");
        }
        let parts = self
            .bounds
            .iter()
            .map(|(var, set)| format!("{var} in {set}"))
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Union of cubes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    cubes: Vec<Cube>,
}

impl Region {
    /// Region containing every assignment
    pub fn top() -> Self {
        Self {
            cubes: vec![Cube::top()],
        }
    }

    /// Region containing no assignment
    pub fn bottom() -> Self {
        Self { cubes: Vec::new() }
    }

    /// Create a simplified region from a list of cubes
    pub fn from_cubes(cubes: impl IntoIterator<Item = Cube>) -> Self {
        let mut res = Self {
            cubes: cubes.into_iter().collect(),
        };
        res.simplify();
        res
    }

    /// Translate a constraint into a region
    pub fn from_constraint(constraint: &Constraint) -> Self {
        match constraint {
            Constraint::True => Self::top(),
            Constraint::False => Self::bottom(),
            Constraint::Comparison(var, op, value) => {
                let set = IntervalSet::from_comparison(var.domain(), *op, *value);
                Self::from_cubes(Cube::single(var.clone(), set))
            }
            Constraint::BinaryExpression(lhs, BooleanConnective::And, rhs) => {
                Self::from_constraint(lhs).intersect(&Self::from_constraint(rhs))
            }
            Constraint::BinaryExpression(lhs, BooleanConnective::Or, rhs) => {
                Self::from_constraint(lhs).union(&Self::from_constraint(rhs))
            }
            Constraint::Not(inner) => Self::from_constraint(inner).complement(),
        }
    }

    /// Cubes of the region
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    /// Check whether the region contains no assignment
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    /// Check whether the region contains every assignment
    pub fn is_top(&self) -> bool {
        self.cubes.iter().any(|c| c.bounds.is_empty())
    }

    /// Intersection of two regions
    pub fn intersect(&self, other: &Self) -> Self {
        let cubes = self
            .cubes
            .iter()
            .flat_map(|a| other.cubes.iter().filter_map(move |b| a.intersect(b)))
            .collect::<Vec<_>>();
        Self::from_cubes(cubes)
    }

    /// Union of two regions
    pub fn union(&self, other: &Self) -> Self {
        Self::from_cubes(self.cubes.iter().chain(other.cubes.iter()).cloned())
    }

    /// Complement of the region
    pub fn complement(&self) -> Self {
        self.cubes
            .iter()
            .fold(Self::top(), |acc, cube| acc.intersect(&cube.complement()))
    }

    /// Check whether `self` is contained in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        // cheap syntactic check first
        if self
            .cubes
            .iter()
            .all(|a| other.cubes.iter().any(|b| a.is_subset(b)))
        {
            return true;
        }
        self.intersect(&other.complement()).is_empty()
    }

    /// Check whether both regions contain the same assignments
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.is_subset(other) && other.is_subset(self)
    }

    /// Existentially eliminate the given variable instances
    pub fn project(&self, vars: &BTreeSet<Variable>) -> Self {
        let cubes = self.cubes.iter().cloned().map(|mut c| {
            c.forget(vars);
            c
        });
        Self::from_cubes(cubes)
    }

    /// Change the role of the variables named in `names` from `from` to `to`
    pub fn rename_role(&self, names: &VariableMap, from: VariableRole, to: VariableRole) -> Self {
        Self::from_cubes(self.cubes.iter().map(|c| c.rename_role(names, from, to)))
    }

    /// Encode the region as a constraint in disjunctive normal form
    pub fn to_constraint(&self) -> Constraint {
        if self.is_top() {
            return Constraint::True;
        }
        Constraint::disjunction(self.cubes.iter().map(|c| c.to_constraint()))
    }

    /// Remove subsumed cubes and merge cubes that only differ in one variable
    fn simplify(&mut self) {
        if self.is_top() {
            self.cubes = vec![Cube::top()];
            return;
        }

        loop {
            let mut changed = self.remove_subsumed();
            changed |= self.merge_neighbours();
            if !changed {
                break;
            }
        }
    }

    fn remove_subsumed(&mut self) -> bool {
        let len_before = self.cubes.len();
        let mut kept: Vec<Cube> = Vec::with_capacity(self.cubes.len());
        for cube in self.cubes.drain(..) {
            if kept.iter().any(|k| cube.is_subset(k)) {
                continue;
            }
            kept.retain(|k| !k.is_subset(&cube));
            kept.push(cube);
        }

        self.cubes = kept;
        self.cubes.len() != len_before
    }

    fn merge_neighbours(&mut self) -> bool {
        for i in 0..self.cubes.len() {
            for j in (i + 1)..self.cubes.len() {
                let Some(var) = self.cubes[i].differs_in_one_variable(&self.cubes[j]) else {
                    continue;
                };

                let merged_set = self.cubes[i].get(&var).union(&self.cubes[j].get(&var));
                let mut merged = self.cubes[i].clone();
                if merged_set.is_universe() {
                    merged.bounds.remove(&var);
                } else {
                    merged.bounds.insert(var, merged_set);
                }

                self.cubes.swap_remove(j);
                self.cubes[i] = merged;
                return true;
            }
        }
        false
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cubes.is_empty() {
            return write!(f, "bottom");
        }
        let parts = self.cubes.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        expressions::{ComparisonOp, Constraint, Domain, Variable, VariableMap, VariableRole},
        fraction::Fraction,
    };

    use super::*;

    fn x_r() -> Variable {
        Variable::read("x", Domain::Integer)
    }

    fn y_r() -> Variable {
        Variable::read("y", Domain::Real)
    }

    #[test]
    fn test_region_of_contradiction_is_empty() {
        let c = Constraint::comparison(x_r(), ComparisonOp::Gt, 3)
            & Constraint::comparison(x_r(), ComparisonOp::Lt, 4);
        assert!(Region::from_constraint(&c).is_empty());

        let c = Constraint::comparison(y_r(), ComparisonOp::Gt, 3)
            & Constraint::comparison(y_r(), ComparisonOp::Lt, 4);
        assert!(!Region::from_constraint(&c).is_empty());
    }

    #[test]
    fn test_complement_of_cube() {
        let c = Constraint::comparison(x_r(), ComparisonOp::Eq, 1)
            & Constraint::comparison(y_r(), ComparisonOp::Leq, 0);
        let region = Region::from_constraint(&c);
        let complement = region.complement();

        assert_eq!(complement.cubes().len(), 2);
        assert!(region.intersect(&complement).is_empty());
        assert!(region.union(&complement).complement().is_empty());
    }

    #[test]
    fn test_merge_cubes_differing_in_one_variable() {
        let c = (Constraint::comparison(x_r(), ComparisonOp::Leq, 0)
            & Constraint::comparison(y_r(), ComparisonOp::Eq, 1))
            | (Constraint::comparison(x_r(), ComparisonOp::Gt, 0)
                & Constraint::comparison(y_r(), ComparisonOp::Eq, 1));
        let region = Region::from_constraint(&c);

        assert_eq!(region.cubes().len(), 1);
        assert_eq!(region.to_constraint().to_string(), "y_r == 1");
    }

    #[test]
    fn test_subsumed_cubes_are_removed() {
        let c = Constraint::comparison(x_r(), ComparisonOp::Gt, 5)
            | Constraint::comparison(x_r(), ComparisonOp::Gt, 0);
        let region = Region::from_constraint(&c);

        assert_eq!(region.cubes().len(), 1);
        assert_eq!(region.to_constraint().to_string(), "x_r >= 1");
    }

    #[test]
    fn test_project_and_rename() {
        let x_w = Variable::write("x", Domain::Integer);
        let c = Constraint::comparison(x_r(), ComparisonOp::Eq, 0)
            & Constraint::comparison(x_w.clone(), ComparisonOp::Eq, 5);
        let region = Region::from_constraint(&c);

        let projected = region.project(&[x_r()].into_iter().collect());
        let names = VariableMap::from([("x".to_string(), Domain::Integer)]);
        let renamed = projected.rename_role(&names, VariableRole::Write, VariableRole::Read);

        assert_eq!(renamed.to_constraint().to_string(), "x_r == 5");
        assert!(
            renamed
                .cubes()
                .iter()
                .all(|c| c.get(&x_r()).contains(&Fraction::from(5)))
        );
    }

    #[test]
    fn test_equivalence() {
        let a = Region::from_constraint(&!Constraint::comparison(x_r(), ComparisonOp::Eq, 2));
        let b = Region::from_constraint(
            &(Constraint::comparison(x_r(), ComparisonOp::Lt, 2)
                | Constraint::comparison(x_r(), ComparisonOp::Geq, 3)),
        );
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&Region::top()));
    }
}
