//! Variable declarations of a Data Petri Net

use std::collections::BTreeMap;

use dpn_constraints::{
    expressions::{ComparisonOp, Constraint, Domain, Variable, VariableMap},
    fraction::Fraction,
};

/// Declaration of a single data variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableDeclaration {
    domain: Domain,
    initial_value: Option<Fraction>,
}

impl VariableDeclaration {
    /// Declare a variable of domain `domain` with an optional initial value
    pub fn new(domain: Domain, initial_value: Option<Fraction>) -> Self {
        Self {
            domain,
            initial_value,
        }
    }

    /// Domain of the variable
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Initial value; an uninitialized variable may hold any value
    pub fn initial_value(&self) -> Option<Fraction> {
        self.initial_value
    }
}

/// All variables declared in a net
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VariableStore {
    variables: BTreeMap<String, VariableDeclaration>,
}

impl VariableStore {
    /// Add a declaration; returns the previous declaration of the same name
    pub(crate) fn declare(
        &mut self,
        name: String,
        declaration: VariableDeclaration,
    ) -> Option<VariableDeclaration> {
        self.variables.insert(name, declaration)
    }

    /// Declaration of variable `name`
    pub fn get(&self, name: &str) -> Option<&VariableDeclaration> {
        self.variables.get(name)
    }

    /// Domain of variable `name`
    pub fn domain_of(&self, name: &str) -> Option<Domain> {
        self.variables.get(name).map(|d| d.domain)
    }

    /// Iterate over all declarations
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableDeclaration)> {
        self.variables.iter()
    }

    /// Number of declared variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Check whether no variables are declared
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All variables with their domains
    pub fn as_variable_map(&self) -> VariableMap {
        self.variables
            .iter()
            .map(|(n, d)| (n.clone(), d.domain))
            .collect()
    }

    /// Constraint over the read instances describing the initial valuation
    pub fn initial_constraint(&self) -> Constraint {
        Constraint::conjunction(self.variables.iter().filter_map(|(name, decl)| {
            decl.initial_value.map(|value| {
                Constraint::comparison(
                    Variable::read(name, decl.domain),
                    ComparisonOp::Eq,
                    value,
                )
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_constraint() {
        let mut store = VariableStore::default();
        assert!(store.initial_constraint().is_true());

        store.declare(
            "x".into(),
            VariableDeclaration::new(Domain::Integer, Some(Fraction::from(0))),
        );
        store.declare("y".into(), VariableDeclaration::new(Domain::Real, None));

        assert_eq!(
            store.initial_constraint(),
            Constraint::comparison(
                Variable::read("x", Domain::Integer),
                ComparisonOp::Eq,
                0
            )
        );
        assert_eq!(store.domain_of("y"), Some(Domain::Real));
        assert_eq!(store.len(), 2);
    }
}
