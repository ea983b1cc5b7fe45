//! Type definitions for constraint formulas over data variables
//!
//! Guards of a Data Petri Net and the data part of symbolic states are
//! [`Constraint`]s: boolean combinations of comparisons between a
//! [`Variable`] instance and a constant.
//!
//! Every variable of a net appears in two roles: the value *read* by a
//! transition (written `x_r`) and the value *written* by it (written `x_w`).
//! Constraints of symbolic states only ever talk about read instances, guards
//! may mention both.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
    ops::{BitAnd, BitOr, Not},
    str::FromStr,
};

use crate::fraction::Fraction;

/// Value domain of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// `true` / `false`, encoded as the integers 1 and 0
    Bool,
    /// Mathematical integers
    Integer,
    /// Real numbers
    Real,
}

impl Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Bool => write!(f, "bool"),
            Domain::Integer => write!(f, "integer"),
            Domain::Real => write!(f, "real"),
        }
    }
}

/// Error returned when parsing an unknown domain name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomainError(pub String);

impl std::error::Error for UnknownDomainError {}

impl Display for UnknownDomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown variable domain '{}' (expected one of 'bool', 'integer', 'real')",
            self.0
        )
    }
}

impl FromStr for Domain {
    type Err = UnknownDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Domain::Bool),
            "int" | "integer" => Ok(Domain::Integer),
            "real" => Ok(Domain::Real),
            _ => Err(UnknownDomainError(s.to_string())),
        }
    }
}

/// Role in which a variable instance appears in a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableRole {
    /// Value before the transition fires (`x_r`)
    Read,
    /// Value written by the transition (`x_w`)
    Write,
}

impl VariableRole {
    /// Suffix used to mark the role of a variable instance
    pub fn suffix(&self) -> &'static str {
        match self {
            VariableRole::Read => "_r",
            VariableRole::Write => "_w",
        }
    }
}

/// Mapping from variable names to their domain
///
/// This is the shape of the read and write sets of a guard.
pub type VariableMap = BTreeMap<String, Domain>;

/// Instance of a data variable in a given role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: String,
    role: VariableRole,
    domain: Domain,
}

impl Variable {
    /// Create a new variable instance
    pub fn new(name: impl ToString, role: VariableRole, domain: Domain) -> Self {
        Self {
            name: name.to_string(),
            role,
            domain,
        }
    }

    /// Create the read instance of a variable
    pub fn read(name: impl ToString, domain: Domain) -> Self {
        Self::new(name, VariableRole::Read, domain)
    }

    /// Create the write instance of a variable
    pub fn write(name: impl ToString, domain: Domain) -> Self {
        Self::new(name, VariableRole::Write, domain)
    }

    /// Name of the variable without role suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of this instance
    pub fn role(&self) -> VariableRole {
        self.role
    }

    /// Domain of the variable
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Same variable in a different role
    pub fn with_role(&self, role: VariableRole) -> Self {
        Self {
            name: self.name.clone(),
            role,
            domain: self.domain,
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.role.suffix())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComparisonOp {
    /// Greater
    Gt,
    /// Greater equal
    Geq,
    /// Equal
    Eq,
    /// Not equal
    Neq,
    /// Less equal
    Leq,
    /// Less
    Lt,
}

impl ComparisonOp {
    /// Operator expressing the negated comparison
    pub fn negate(self) -> Self {
        match self {
            ComparisonOp::Gt => ComparisonOp::Leq,
            ComparisonOp::Geq => ComparisonOp::Lt,
            ComparisonOp::Eq => ComparisonOp::Neq,
            ComparisonOp::Neq => ComparisonOp::Eq,
            ComparisonOp::Leq => ComparisonOp::Gt,
            ComparisonOp::Lt => ComparisonOp::Geq,
        }
    }
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Gt => write!(f, ">"),
            ComparisonOp::Geq => write!(f, ">="),
            ComparisonOp::Eq => write!(f, "=="),
            ComparisonOp::Neq => write!(f, "!="),
            ComparisonOp::Leq => write!(f, "<="),
            ComparisonOp::Lt => write!(f, "<"),
        }
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BooleanConnective {
    /// And
    And,
    /// Or
    Or,
}

impl Display for BooleanConnective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanConnective::And => write!(f, "&&"),
            BooleanConnective::Or => write!(f, "||"),
        }
    }
}

/// Constraint over data variables
///
/// # Example
///
/// ```
/// use dpn_constraints::expressions::*;
///
/// // amount_w > 0 && !approved_r
/// let amount = Variable::write("amount", Domain::Integer);
/// let approved = Variable::read("approved", Domain::Bool);
/// let c = Constraint::comparison(amount, ComparisonOp::Gt, 0)
///     & !Constraint::comparison(approved, ComparisonOp::Eq, true);
///
/// assert_eq!(c.to_string(), "(amount_w > 0 && !(approved_r == true))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    /// Comparison between a variable and a constant
    Comparison(Variable, ComparisonOp, Fraction),
    /// Constraints combined through a boolean connective
    BinaryExpression(Box<Constraint>, BooleanConnective, Box<Constraint>),
    /// Negation
    Not(Box<Constraint>),
    /// true
    True,
    /// false
    False,
}

impl Constraint {
    /// Create a comparison `var op value`
    pub fn comparison(var: Variable, op: ComparisonOp, value: impl Into<Fraction>) -> Self {
        Constraint::Comparison(var, op, value.into())
    }

    /// Conjunction of all given constraints, `true` if there are none
    pub fn conjunction(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        constraints
            .into_iter()
            .reduce(|acc, c| acc & c)
            .unwrap_or(Constraint::True)
    }

    /// Disjunction of all given constraints, `false` if there are none
    pub fn disjunction(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        constraints
            .into_iter()
            .reduce(|acc, c| acc | c)
            .unwrap_or(Constraint::False)
    }

    /// Check whether the constraint is syntactically `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Constraint::True)
    }

    /// Check whether the constraint is syntactically `false`
    pub fn is_false(&self) -> bool {
        matches!(self, Constraint::False)
    }

    /// All variable instances appearing in the constraint
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<Variable>) {
        match self {
            Constraint::Comparison(var, _, _) => {
                vars.insert(var.clone());
            }
            Constraint::BinaryExpression(lhs, _, rhs) => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
            Constraint::Not(inner) => inner.collect_variables(vars),
            Constraint::True | Constraint::False => (),
        }
    }

    /// Variables appearing in the given role, with their domain
    pub fn variables_in_role(&self, role: VariableRole) -> VariableMap {
        self.variables()
            .into_iter()
            .filter(|v| v.role() == role)
            .map(|v| (v.name().to_string(), v.domain()))
            .collect()
    }

    /// Variables written by a guard
    pub fn write_vars(&self) -> VariableMap {
        self.variables_in_role(VariableRole::Write)
    }

    /// Variables read by a guard
    pub fn read_vars(&self) -> VariableMap {
        self.variables_in_role(VariableRole::Read)
    }

    /// Change the role of the instances of variables in `names` from `from`
    /// to `to`
    pub fn rename_role(&self, names: &VariableMap, from: VariableRole, to: VariableRole) -> Self {
        match self {
            Constraint::Comparison(var, op, value) => {
                if var.role() == from && names.contains_key(var.name()) {
                    Constraint::Comparison(var.with_role(to), *op, *value)
                } else {
                    self.clone()
                }
            }
            Constraint::BinaryExpression(lhs, con, rhs) => Constraint::BinaryExpression(
                Box::new(lhs.rename_role(names, from, to)),
                *con,
                Box::new(rhs.rename_role(names, from, to)),
            ),
            Constraint::Not(inner) => {
                Constraint::Not(Box::new(inner.rename_role(names, from, to)))
            }
            Constraint::True | Constraint::False => self.clone(),
        }
    }

    /// Split a constraint into its top level conjuncts
    pub fn conjuncts(&self) -> Vec<&Constraint> {
        match self {
            Constraint::BinaryExpression(lhs, BooleanConnective::And, rhs) => {
                let mut res = lhs.conjuncts();
                res.extend(rhs.conjuncts());
                res
            }
            Constraint::True => Vec::new(),
            _ => vec![self],
        }
    }
}

impl BitAnd for Constraint {
    type Output = Constraint;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Constraint::True, c) | (c, Constraint::True) => c,
            (Constraint::False, _) | (_, Constraint::False) => Constraint::False,
            (lhs, rhs) => {
                Constraint::BinaryExpression(Box::new(lhs), BooleanConnective::And, Box::new(rhs))
            }
        }
    }
}

impl BitOr for Constraint {
    type Output = Constraint;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Constraint::False, c) | (c, Constraint::False) => c,
            (Constraint::True, _) | (_, Constraint::True) => Constraint::True,
            (lhs, rhs) => {
                Constraint::BinaryExpression(Box::new(lhs), BooleanConnective::Or, Box::new(rhs))
            }
        }
    }
}

impl Not for Constraint {
    type Output = Constraint;

    fn not(self) -> Self::Output {
        match self {
            Constraint::True => Constraint::False,
            Constraint::False => Constraint::True,
            Constraint::Not(inner) => *inner,
            c => Constraint::Not(Box::new(c)),
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Comparison(var, op, value) => {
                if var.domain() == Domain::Bool && value.is_integer() {
                    let b = *value != Fraction::zero();
                    write!(f, "{var} {op} {b}")
                } else {
                    write!(f, "{var} {op} {value}")
                }
            }
            Constraint::BinaryExpression(lhs, con, rhs) => write!(f, "({lhs} {con} {rhs})"),
            Constraint::Not(inner) => match inner.as_ref() {
                Constraint::BinaryExpression(_, _, _) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Constraint::True => write!(f, "true"),
            Constraint::False => write!(f, "false"),
        }
    }
}
