//! Vector descriptors (spec component A): a `(left, right)` index pair, or
//! a part-select `(offset, length)` pair, evaluable against a scope.

use crate::error::{ExprError, ExprResult};
use crate::expr::{Expr, Scope};

#[derive(Debug, Clone, PartialEq)]
pub enum VectorDescriptor {
    Range { left: Expr, right: Expr },
    PartSelect { offset: Expr, length: u32 },
}

fn reject_negative_literal(e: &Expr) -> ExprResult<()> {
    if let Expr::Literal(v) = e {
        if *v < 0 {
            return Err(ExprError::ValueError {
                message: format!("negative integer literal {v} is not a valid vector bound"),
            });
        }
    }
    Ok(())
}

impl VectorDescriptor {
    /// Construct a `[left:right]` descriptor; `right` defaults to 0 via
    /// [`VectorDescriptor::with_left`].
    pub fn new(left: Expr, right: Expr) -> ExprResult<Self> {
        reject_negative_literal(&left)?;
        reject_negative_literal(&right)?;
        Ok(VectorDescriptor::Range { left, right })
    }

    pub fn with_left(left: Expr) -> ExprResult<Self> {
        Self::new(left, Expr::literal(0))
    }

    pub fn part_select(offset: Expr, length: u32) -> ExprResult<Self> {
        reject_negative_literal(&offset)?;
        Ok(VectorDescriptor::PartSelect { offset, length })
    }

    /// `len()`: both ends must be literal integers.
    pub fn len(&self) -> ExprResult<u32> {
        match self {
            VectorDescriptor::Range { left, right } => match (left, right) {
                (Expr::Literal(l), Expr::Literal(r)) => Ok((l - r).unsigned_abs() as u32 + 1),
                _ => Err(ExprError::TypeError {
                    message: "len() requires both vector bounds to be literal integers".to_string(),
                }),
            },
            VectorDescriptor::PartSelect { length, .. } => Ok(*length),
        }
    }

    pub fn evaluate(&self, scope: &Scope) -> ExprResult<(i64, i64)> {
        match self {
            VectorDescriptor::Range { left, right } => {
                let l = left.evaluate(scope)?;
                let r = right.evaluate(scope)?;
                if l < 0 || r < 0 {
                    return Err(ExprError::ValueError {
                        message: "vector bounds must evaluate to non-negative integers".to_string(),
                    });
                }
                Ok((l, r))
            }
            VectorDescriptor::PartSelect { offset, length } => {
                let o = offset.evaluate(scope)?;
                if o < 0 {
                    return Err(ExprError::ValueError {
                        message: "part-select offset must evaluate to a non-negative integer".to_string(),
                    });
                }
                Ok((o + *length as i64 - 1, o))
            }
        }
    }

    /// Static width check, reused by [`crate::constant::IntegerConstant`].
    pub fn fits(value: u64, width: u32) -> bool {
        crate::constant::IntegerConstant::fits_width(value, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_matches_literal_bounds() {
        let v = VectorDescriptor::new(Expr::literal(7), Expr::literal(0)).unwrap();
        assert_eq!(v.len().unwrap(), 8);
    }

    #[test]
    fn equal_bounds_have_length_one() {
        let v = VectorDescriptor::new(Expr::literal(3), Expr::literal(3)).unwrap();
        assert_eq!(v.len().unwrap(), 1);
    }

    #[test]
    fn negative_literal_is_rejected() {
        assert!(VectorDescriptor::new(Expr::literal(-1), Expr::literal(0)).is_err());
    }

    #[test]
    fn len_requires_literal_bounds() {
        let v = VectorDescriptor::new(Expr::name("WIDTH"), Expr::literal(0)).unwrap();
        assert!(v.len().is_err());
    }
}
