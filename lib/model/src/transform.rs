use oxrdf::Variable;
use std::fmt;

/// Which side of a join a transform applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSide {
    Left,
    Right,
}

/// A single value-transform operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOp {
    /// Multiply a numeric value by the given factor.
    Scale(i64),
    /// Cast the value to an integer.
    ToInt,
    /// Cast the value to a string.
    ToString,
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformOp::Scale(factor) => write!(f, "scl({factor})"),
            TransformOp::ToInt => f.write_str("toInt"),
            TransformOp::ToString => f.write_str("toStr"),
        }
    }
}

/// One entry of a `TRANSFORM(...)` clause.
///
/// Transforms are keyed by the pair of join variables whose values need
/// adjustment before they can be compared, plus the side of the join the
/// operations apply to. The clause is not part of the base query grammar and
/// is stripped from the text before standard parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub left_variable: Variable,
    pub right_variable: Variable,
    pub side: TransformSide,
    pub ops: Vec<TransformOp>,
}

impl Transform {
    /// Returns whether this transform targets values bound by `variable`.
    pub fn applies_to(&self, variable: &Variable) -> bool {
        match self.side {
            TransformSide::Left => &self.left_variable == variable,
            TransformSide::Right => &self.right_variable == variable,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}",
            self.left_variable,
            self.right_variable,
            match self.side {
                TransformSide::Left => "l",
                TransformSide::Right => "r",
            }
        )?;
        for op in &self.ops {
            write!(f, ".{op}")?;
        }
        Ok(())
    }
}
