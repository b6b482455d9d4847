//! Operator definitions and precedence classes.

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Look up an operator by its source token
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "^" => BinaryOperator::Pow,
            "==" => BinaryOperator::Eq,
            "!=" => BinaryOperator::Ne,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::Le,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::Ge,
            "&&" => BinaryOperator::And,
            "||" => BinaryOperator::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Pow => "^",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    pub fn class(&self) -> PrecedenceClass {
        match self {
            BinaryOperator::And | BinaryOperator::Or => PrecedenceClass::Logical,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => PrecedenceClass::Comparison,
            BinaryOperator::Add | BinaryOperator::Sub => PrecedenceClass::Additive,
            BinaryOperator::Mul | BinaryOperator::Div => PrecedenceClass::Multiplicative,
            BinaryOperator::Pow => PrecedenceClass::Power,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.class() == PrecedenceClass::Comparison
    }
}

/// Operator precedence classes, lowest binding first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrecedenceClass {
    Logical,
    Comparison,
    Additive,
    Multiplicative,
    Power,
}

impl PrecedenceClass {
    /// Classes in the order the tree builder tries them
    pub const ORDER: [PrecedenceClass; 5] = [
        PrecedenceClass::Logical,
        PrecedenceClass::Comparison,
        PrecedenceClass::Additive,
        PrecedenceClass::Multiplicative,
        PrecedenceClass::Power,
    ];

    /// Tokens of this class; two-character tokens come first so they win over
    /// their one-character prefixes
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            PrecedenceClass::Logical => &["&&", "||"],
            PrecedenceClass::Comparison => &[">=", "<=", "==", "!=", ">", "<"],
            PrecedenceClass::Additive => &["+", "-"],
            PrecedenceClass::Multiplicative => &["*", "/"],
            PrecedenceClass::Power => &["^"],
        }
    }

    /// Left-associative classes split at their last top-level operator,
    /// power splits at its first
    pub fn splits_at_last(&self) -> bool {
        !matches!(self, PrecedenceClass::Power)
    }

    /// A leading minus binds to the first operand of these classes rather than
    /// to the whole expression
    pub fn binds_below_negation(&self) -> bool {
        matches!(
            self,
            PrecedenceClass::Logical | PrecedenceClass::Comparison | PrecedenceClass::Additive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for class in PrecedenceClass::ORDER {
            for token in class.tokens() {
                let op = BinaryOperator::from_token(token).unwrap();
                assert_eq!(op.as_str(), *token);
                assert_eq!(op.class(), class);
            }
        }
        assert_eq!(BinaryOperator::from_token("="), None);
    }

    #[test]
    fn test_class_order() {
        assert!(PrecedenceClass::Logical < PrecedenceClass::Comparison);
        assert!(PrecedenceClass::Multiplicative < PrecedenceClass::Power);
        assert!(PrecedenceClass::Additive.splits_at_last());
        assert!(!PrecedenceClass::Power.splits_at_last());
        assert!(PrecedenceClass::Additive.binds_below_negation());
        assert!(!PrecedenceClass::Multiplicative.binds_below_negation());
    }
}
