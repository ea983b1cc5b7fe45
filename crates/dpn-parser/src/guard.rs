//! Parser for guard expressions
//!
//! The parser uses the [pest](https://pest.rs/) parser generator, with the
//! grammar defined in `guard.pest`. Guards are boolean combinations of
//! comparisons between a variable instance and a constant, e.g.
//! `amount_w > 0 && (approved_r || amount_r <= 2.5)`.

use std::str::FromStr;

use dpn_constraints::{
    expressions::{ComparisonOp, Constraint, Domain, Variable, VariableMap, VariableRole},
    fraction::Fraction,
};
use pest::{
    Parser, Span, error,
    iterators::Pair,
    pratt_parser::{Assoc, PrattParser},
};
use pest_derive::Parser;

use crate::ParseError;

// Location of the grammar file and generation of parser
#[allow(missing_docs)]
#[derive(Parser)]
#[grammar = "guard.pest"]
struct PestGuardParser;

// Pratt parser responsible for maintaining operator precedence
//
// `!` binds stronger than `&&`, which binds stronger than `||`
lazy_static::lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::Op;

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(Rule::or, Assoc::Left))
            .op(Op::infix(Rule::and, Assoc::Left))
            .op(Op::prefix(Rule::not))
    };
}

/// Parse the guard `input` over the declared `variables`
///
/// # Example
///
/// ```
/// use dpn_constraints::expressions::{Domain, VariableMap};
/// use dpn_parser::guard::parse_guard;
///
/// let variables = VariableMap::from([
///     ("amount".to_string(), Domain::Real),
///     ("approved".to_string(), Domain::Bool),
/// ]);
/// let guard = parse_guard("amount_w > 0 && !approved_r", &variables).unwrap();
///
/// assert_eq!(guard.to_string(), "(amount_w > 0 && !(approved_r == true))");
/// ```
pub fn parse_guard(input: &str, variables: &VariableMap) -> Result<Constraint, ParseError> {
    let to_error = |message: String| ParseError::Guard {
        guard: input.to_string(),
        message,
    };

    let mut pairs = PestGuardParser::parse(Rule::guard, input).map_err(|e| to_error(e.to_string()))?;
    let pair = pairs
        .next()
        .and_then(|guard| guard.into_inner().next())
        .ok_or_else(|| to_error("Empty guard".to_string()))?;

    parse_boolean_expr(pair, variables).map_err(|e| to_error(e.to_string()))
}

/// Parse a constraint from a boolean expression
fn parse_boolean_expr(
    pair: Pair<'_, Rule>,
    variables: &VariableMap,
) -> Result<Constraint, Box<error::Error<()>>> {
    debug_assert!(
        pair.as_rule() == Rule::boolean_expr,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    PRATT_PARSER
        .map_primary(|atom| parse_boolean_atom(atom, variables))
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and => Ok(lhs? & rhs?),
            Rule::or => Ok(lhs? | rhs?),
            _ => unreachable!(
                "Unknown boolean connective {:?}: {}",
                op.as_rule(),
                op.as_str()
            ),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not => Ok(!rhs?),
            _ => unreachable!(
                "Unknown boolean unary operator {:?}: {}",
                op.as_rule(),
                op.as_str()
            ),
        })
        .parse(pair.into_inner())
}

/// Parse a boolean atom
fn parse_boolean_atom(
    pair: Pair<'_, Rule>,
    variables: &VariableMap,
) -> Result<Constraint, Box<error::Error<()>>> {
    let span = pair.as_span();
    let pair = pair
        .into_inner()
        .next()
        .ok_or_else(|| new_parsing_error("Empty boolean atom".to_string(), span))?;

    match pair.as_rule() {
        Rule::boolean_expr => parse_boolean_expr(pair, variables),
        Rule::bool_const => Ok(if parse_bool_const(&pair) {
            Constraint::True
        } else {
            Constraint::False
        }),
        Rule::variable => {
            let var = parse_variable(&pair, variables)?;
            if var.domain() != Domain::Bool {
                return Err(new_parsing_error(
                    format!("Variable '{}' of domain {} used as condition", var, var.domain()),
                    pair.as_span(),
                ));
            }
            Ok(Constraint::comparison(var, ComparisonOp::Eq, true))
        }
        Rule::comparison_expr | Rule::reversed_comparison_expr => {
            parse_comparison_expr(pair, variables)
        }
        _ => unreachable!(
            "Unknown rule for boolean atom {:?}: {}",
            pair.as_rule(),
            pair.as_str()
        ),
    }
}

/// Parse a comparison between a variable and a constant
fn parse_comparison_expr(
    pair: Pair<'_, Rule>,
    variables: &VariableMap,
) -> Result<Constraint, Box<error::Error<()>>> {
    let reversed = pair.as_rule() == Rule::reversed_comparison_expr;
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let (Some(first), Some(op), Some(second)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(new_parsing_error(
            "Incomplete comparison".to_string(),
            span,
        ));
    };

    let op = parse_comparison_op(&op);
    let (var, constant, op) = if reversed {
        (second, first, mirror(op))
    } else {
        (first, second, op)
    };

    let var_span = var.as_span();
    let var = parse_variable(&var, variables)?;
    let value = parse_constant(constant)?;

    let fits = match var.domain() {
        Domain::Bool => value == Fraction::zero() || value == Fraction::one(),
        Domain::Integer | Domain::Real => true,
    };
    if !fits {
        return Err(new_parsing_error(
            format!("Constant {value} is not a value of the boolean variable '{var}'"),
            var_span,
        ));
    }

    Ok(Constraint::comparison(var, op, value))
}

/// Operator of the comparison with swapped sides
fn mirror(op: ComparisonOp) -> ComparisonOp {
    match op {
        ComparisonOp::Gt => ComparisonOp::Lt,
        ComparisonOp::Geq => ComparisonOp::Leq,
        ComparisonOp::Leq => ComparisonOp::Geq,
        ComparisonOp::Lt => ComparisonOp::Gt,
        ComparisonOp::Eq | ComparisonOp::Neq => op,
    }
}

/// Parse comparison operator
#[inline(always)]
fn parse_comparison_op(pair: &Pair<'_, Rule>) -> ComparisonOp {
    match pair.as_rule() {
        Rule::equal => ComparisonOp::Eq,
        Rule::n_equal => ComparisonOp::Neq,
        Rule::less_eq => ComparisonOp::Leq,
        Rule::less => ComparisonOp::Lt,
        Rule::greater_eq => ComparisonOp::Geq,
        Rule::greater => ComparisonOp::Gt,
        _ => unreachable!(
            "Unknown rule for comparison operator {:?}: {}",
            pair.as_rule(),
            pair.as_str()
        ),
    }
}

/// Parse boolean constant
#[inline(always)]
fn parse_bool_const(pair: &Pair<'_, Rule>) -> bool {
    debug_assert!(
        pair.as_rule() == Rule::bool_const,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    pair.as_str().trim() == "true"
}

/// Parse a numeric or boolean constant
fn parse_constant(pair: Pair<'_, Rule>) -> Result<Fraction, Box<error::Error<()>>> {
    let span = pair.as_span();
    let Some(pair) = pair.into_inner().next() else {
        return Err(new_parsing_error("Empty constant".to_string(), span));
    };

    match pair.as_rule() {
        Rule::bool_const => Ok(Fraction::from(parse_bool_const(&pair))),
        Rule::number => Fraction::from_str(pair.as_str())
            .map_err(|e| new_parsing_error(e.to_string(), pair.as_span())),
        _ => unreachable!(
            "Unknown rule for constant {:?}: {}",
            pair.as_rule(),
            pair.as_str()
        ),
    }
}

/// Parse a variable instance `name_r` or `name_w`
fn parse_variable(
    pair: &Pair<'_, Rule>,
    variables: &VariableMap,
) -> Result<Variable, Box<error::Error<()>>> {
    let text = pair.as_str();
    let (name, role) = if let Some(name) = text.strip_suffix("_r") {
        (name, VariableRole::Read)
    } else if let Some(name) = text.strip_suffix("_w") {
        (name, VariableRole::Write)
    } else {
        return Err(new_parsing_error(
            format!("Variable '{text}' must end in '_r' or '_w'"),
            pair.as_span(),
        ));
    };

    let Some(domain) = variables.get(name) else {
        return Err(new_parsing_error(
            format!("Unknown variable '{name}'"),
            pair.as_span(),
        ));
    };
    Ok(Variable::new(name, role, *domain))
}

/// Generate a new parsing error
#[inline(always)]
fn new_parsing_error(message: String, span: Span<'_>) -> Box<error::Error<()>> {
    Box::new(error::Error::new_from_span(
        error::ErrorVariant::CustomError { message },
        span,
    ))
}
