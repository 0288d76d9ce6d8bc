//! Query AST structures
//!
//! The parser (an external collaborator) produces these. They are read-only
//! for the lifetime of one evaluation.

use std::fmt;

/// One-sided comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A single field predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// field == value
    Equals { field: String, value: String },
    /// lower <(=) field <(=) upper
    BoundedRange {
        field: String,
        lower: String,
        lower_inclusive: bool,
        upper: String,
        upper_inclusive: bool,
    },
    /// field =~ pattern (whole-value match)
    Regex { field: String, pattern: String },
    /// name(args...); the first argument names the field
    Function { name: String, args: Vec<String> },
    /// field op value, not yet rewritten into a bounded range
    Compare {
        field: String,
        op: CompareOp,
        value: String,
    },
    /// field != value
    NotEquals { field: String, value: String },
    /// field !~ pattern
    NotRegex { field: String, pattern: String },
}

impl Predicate {
    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a bounded range predicate
    pub fn range(
        field: impl Into<String>,
        lower: impl Into<String>,
        lower_inclusive: bool,
        upper: impl Into<String>,
        upper_inclusive: bool,
    ) -> Self {
        Predicate::BoundedRange {
            field: field.into(),
            lower: lower.into(),
            lower_inclusive,
            upper: upper.into(),
            upper_inclusive,
        }
    }

    /// Create a regex predicate
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Regex {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a function predicate
    pub fn function(
        name: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Predicate::Function {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a one-sided comparison
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Create an inequality predicate
    pub fn ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::NotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a negated regex predicate
    pub fn not_regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::NotRegex {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Returns the field this predicate constrains, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::BoundedRange { field, .. }
            | Predicate::Regex { field, .. }
            | Predicate::Compare { field, .. }
            | Predicate::NotEquals { field, .. }
            | Predicate::NotRegex { field, .. } => Some(field),
            Predicate::Function { args, .. } => args.first().map(String::as_str),
        }
    }

    /// Returns the canonical string form, used to de-duplicate terms
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { field, value } => {
                write!(f, "{} == ", field)?;
                write_quoted(f, value)
            }
            Predicate::BoundedRange {
                field,
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                let lo_op = if *lower_inclusive { ">=" } else { ">" };
                let hi_op = if *upper_inclusive { "<=" } else { "<" };
                write!(f, "(({} {} ", field, lo_op)?;
                write_quoted(f, lower)?;
                write!(f, ") && ({} {} ", field, hi_op)?;
                write_quoted(f, upper)?;
                f.write_str("))")
            }
            Predicate::Regex { field, pattern } => {
                write!(f, "{} =~ ", field)?;
                write_quoted(f, pattern)
            }
            Predicate::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, arg)?;
                }
                f.write_str(")")
            }
            Predicate::Compare { field, op, value } => {
                write!(f, "{} {} ", field, op.as_str())?;
                write_quoted(f, value)
            }
            Predicate::NotEquals { field, value } => {
                write!(f, "{} != ", field)?;
                write_quoted(f, value)
            }
            Predicate::NotRegex { field, pattern } => {
                write!(f, "{} !~ ", field)?;
                write_quoted(f, pattern)
            }
        }
    }
}

/// Boolean expression tree over predicates
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// Never index-resolvable; rejected before evaluation
    Not(Box<Expression>),
    Leaf(Predicate),
}

impl Expression {
    pub fn and(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Or(children.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expression) -> Self {
        Expression::Not(Box::new(child))
    }

    pub fn leaf(predicate: Predicate) -> Self {
        Expression::Leaf(predicate)
    }

    /// Shorthand for `Leaf(Equals { .. })`
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Expression::Leaf(Predicate::eq(field, value))
    }
}

impl From<Predicate> for Expression {
    fn from(predicate: Predicate) -> Self {
        Expression::Leaf(predicate)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expression], op: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And(children) => write_joined(f, children, "&&"),
            Expression::Or(children) => write_joined(f, children, "||"),
            Expression::Not(child) => write!(f, "!({})", child),
            Expression::Leaf(predicate) => write!(f, "{}", predicate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_field() {
        assert_eq!(Predicate::eq("NAME", "alice").field(), Some("NAME"));
        assert_eq!(
            Predicate::function("geo:within_bounding_box", ["GEO", "0", "0", "1", "1"]).field(),
            Some("GEO")
        );
        let no_args: Vec<String> = Vec::new();
        assert_eq!(Predicate::function("f", no_args).field(), None);
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(Predicate::eq("NAME", "alice").canonical(), "NAME == 'alice'");
        assert_eq!(
            Predicate::range("AGE", "10", true, "20", false).canonical(),
            "((AGE >= '10') && (AGE < '20'))"
        );
        assert_eq!(Predicate::regex("NAME", "al.*").canonical(), "NAME =~ 'al.*'");
        assert_eq!(Predicate::eq("Q", "it's").canonical(), "Q == 'it\\'s'");
    }

    #[test]
    fn test_equal_predicates_share_canonical_form() {
        let a = Predicate::eq("CITY", "nyc");
        let b = Predicate::eq("CITY", "nyc");
        assert_eq!(a.canonical(), b.canonical());
        assert_ne!(a.canonical(), Predicate::ne("CITY", "nyc").canonical());
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::and([
            Expression::eq("NAME", "alice"),
            Expression::or([
                Expression::eq("CITY", "nyc"),
                Expression::not(Expression::eq("X", "y")),
            ]),
        ]);
        assert_eq!(
            expr.to_string(),
            "(NAME == 'alice' && (CITY == 'nyc' || !(X == 'y')))"
        );
    }
}
