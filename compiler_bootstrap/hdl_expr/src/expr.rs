//! The expression algebra (spec component B): a typed tree over integer
//! literals, name references, operators, calls, and subscripts, with
//! scope-based evaluation, bottom-up simplification, and a dump format.

use crate::error::{ExprError, ExprResult};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Shl,
    Shr,
    Or,
    And,
    Xor,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::Xor => "^",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

/// A tagged expression tree node. Each node can optionally carry a width,
/// mirroring the source model's width-annotated nodes; width is advisory
/// and is not checked during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(i64),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        width: Option<u32>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        width: Option<u32>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Subscript {
        signal: String,
        high: Box<Expr>,
        low: Option<Box<Expr>>,
    },
}

/// A scope entry: either a bound integer or a callable builtin.
#[derive(Clone)]
pub enum ScopeValue {
    Integer(i64),
    Callable(Rc<dyn Fn(&[i64]) -> ExprResult<i64>>),
}

impl fmt::Debug for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeValue::Integer(v) => write!(f, "Integer({v})"),
            ScopeValue::Callable(_) => write!(f, "Callable(..)"),
        }
    }
}

/// A name → value mapping used for evaluation, generalizing the source
/// implementation's plain-dict scope (spec section 9: "builtins as
/// first-class scope entries").
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: HashMap<String, ScopeValue>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut scope = Self::new();
        crate::builtin::install_builtins(&mut scope);
        scope
    }

    pub fn bind(&mut self, name: impl Into<String>, value: i64) {
        self.entries.insert(name.into(), ScopeValue::Integer(value));
    }

    pub fn bind_callable<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[i64]) -> ExprResult<i64> + 'static,
    {
        self.entries.insert(name.into(), ScopeValue::Callable(Rc::new(f)));
    }

    pub fn get(&self, name: &str) -> Option<&ScopeValue> {
        self.entries.get(name)
    }

    pub fn merge(&mut self, other: &Scope) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }
}

impl Expr {
    pub fn literal(value: i64) -> Expr {
        Expr::Literal(value)
    }

    pub fn name(name: impl Into<String>) -> Expr {
        Expr::Name(name.into())
    }

    /// `combine(lhs, op, rhs)`: the result owns clones of both subtrees.
    pub fn combine(lhs: &Expr, op: BinaryOp, rhs: &Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs.clone()),
            rhs: Box::new(rhs.clone()),
            width: None,
        }
    }

    pub fn unary(op: UnaryOp, operand: &Expr) -> Expr {
        Expr::Unary { op, operand: Box::new(operand.clone()), width: None }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call { name: name.into(), args }
    }

    /// Evaluate against a scope. Division truncates toward zero (Rust's
    /// native integer division semantics already do this).
    pub fn evaluate(&self, scope: &Scope) -> ExprResult<i64> {
        match self {
            Expr::Literal(v) => Ok(*v),
            Expr::Name(name) => match scope.get(name) {
                Some(ScopeValue::Integer(v)) => Ok(*v),
                Some(ScopeValue::Callable(_)) => Err(ExprError::TypeError {
                    message: format!("{name:?} is a function, not a value"),
                }),
                None => Err(ExprError::NameError { name: name.clone() }),
            },
            Expr::Unary { op, operand, .. } => {
                let v = operand.evaluate(scope)?;
                Ok(match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => i64::from(v == 0),
                    UnaryOp::BitNot => !v,
                })
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let l = lhs.evaluate(scope)?;
                let r = rhs.evaluate(scope)?;
                Ok(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => {
                        if r == 0 {
                            return Err(ExprError::DivisionByZero);
                        }
                        l / r
                    }
                    BinaryOp::Shl => l << r,
                    BinaryOp::Shr => l >> r,
                    BinaryOp::Or => l | r,
                    BinaryOp::And => l & r,
                    BinaryOp::Xor => l ^ r,
                })
            }
            Expr::Call { name, args } => {
                let argv = args.iter().map(|a| a.evaluate(scope)).collect::<ExprResult<Vec<_>>>()?;
                match scope.get(name) {
                    Some(ScopeValue::Callable(f)) => f(&argv),
                    Some(ScopeValue::Integer(_)) => Err(ExprError::TypeError {
                        message: format!("{name:?} is a value, not callable"),
                    }),
                    None => Err(ExprError::NameError { name: name.clone() }),
                }
            }
            Expr::Subscript { .. } => Err(ExprError::TypeError {
                message: "subscript nodes cannot be evaluated directly".to_string(),
            }),
        }
    }

    /// Bottom-up algebraic simplification per spec section 4.1's rule set.
    pub fn simplify(&self) -> ExprResult<Expr> {
        match self {
            Expr::Literal(_) | Expr::Name(_) => Ok(self.clone()),
            Expr::Unary { op, operand, width } => {
                let operand = operand.simplify()?;
                Ok(Expr::Unary { op: *op, operand: Box::new(operand), width: *width })
            }
            Expr::Binary { op, lhs, rhs, width } => {
                let lhs = lhs.simplify()?;
                let rhs = rhs.simplify()?;
                simplify_binary(*op, lhs, rhs, *width)
            }
            Expr::Call { name, args } => {
                let args = args.iter().map(|a| a.simplify()).collect::<ExprResult<Vec<_>>>()?;
                Ok(Expr::Call { name: name.clone(), args })
            }
            Expr::Subscript { signal, high, low } => {
                let high = high.simplify()?;
                let low = match low {
                    Some(l) => Some(Box::new(l.simplify()?)),
                    None => None,
                };
                Ok(Expr::Subscript { signal: signal.clone(), high: Box::new(high), low })
            }
        }
    }

    /// Human-readable parenthesized dump.
    pub fn dump(&self) -> String {
        match self {
            Expr::Literal(v) => v.to_string(),
            Expr::Name(name) => name.clone(),
            Expr::Unary { op, operand, .. } => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                };
                format!("({}{})", sym, operand.dump())
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                format!("({} {} {})", lhs.dump(), op, rhs.dump())
            }
            Expr::Call { name, args } => {
                let rendered = args.iter().map(Expr::dump).collect::<Vec<_>>().join(", ");
                format!("{name}({rendered})")
            }
            Expr::Subscript { signal, high, low } => match low {
                Some(low) => format!("{signal}[{}:{}]", high.dump(), low.dump()),
                None => format!("{signal}[{}]", high.dump()),
            },
        }
    }
}

fn literal_value(e: &Expr) -> Option<i64> {
    match e {
        Expr::Literal(v) => Some(*v),
        _ => None,
    }
}

fn simplify_binary(op: BinaryOp, lhs: Expr, rhs: Expr, width: Option<u32>) -> ExprResult<Expr> {
    let lv = literal_value(&lhs);
    let rv = literal_value(&rhs);

    let reduced = match (op, lv, rv) {
        (BinaryOp::Add, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Add, Some(0), _) => Some(rhs.clone()),
        (BinaryOp::Sub, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Shl, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Shr, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Or, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Or, Some(0), _) => Some(rhs.clone()),
        (BinaryOp::Xor, _, Some(0)) => Some(lhs.clone()),
        (BinaryOp::Xor, Some(0), _) => Some(rhs.clone()),
        (BinaryOp::Mul, _, Some(1)) => Some(lhs.clone()),
        (BinaryOp::Mul, Some(1), _) => Some(rhs.clone()),
        (BinaryOp::Div, _, Some(1)) => Some(lhs.clone()),
        (BinaryOp::Mul, _, Some(0)) => Some(Expr::Literal(0)),
        (BinaryOp::Mul, Some(0), _) => Some(Expr::Literal(0)),
        (BinaryOp::Div, _, Some(0)) => {
            return Err(ExprError::ValueError { message: "division by literal zero".to_string() })
        }
        (_, Some(a), Some(b)) => Some(fold_constants(op, a, b)?),
        _ => None,
    };

    Ok(reduced.unwrap_or(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), width }))
}

fn fold_constants(op: BinaryOp, a: i64, b: i64) -> ExprResult<Expr> {
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0 {
                return Err(ExprError::ValueError { message: "division by literal zero".to_string() });
            }
            a / b
        }
        BinaryOp::Shl => a << b,
        BinaryOp::Shr => a >> b,
        BinaryOp::Or => a | b,
        BinaryOp::And => a & b,
        BinaryOp::Xor => a ^ b,
    };
    Ok(Expr::Literal(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_clog2_plus_one() {
        let mut scope = Scope::with_builtins();
        scope.bind("N", 16);
        let e = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::call("clog2", vec![Expr::name("N")])),
            rhs: Box::new(Expr::literal(1)),
            width: None,
        };
        assert_eq!(e.evaluate(&scope).unwrap(), 5);
        let simplified = e.simplify().unwrap();
        assert_eq!(simplified.evaluate(&scope).unwrap(), 5);
    }

    #[test]
    fn fold_rules() {
        let x = Expr::name("x");
        let zero = Expr::literal(0);
        let one = Expr::literal(1);
        assert_eq!(Expr::combine(&x, BinaryOp::Add, &zero).simplify().unwrap(), x);
        assert_eq!(Expr::combine(&zero, BinaryOp::Add, &x).simplify().unwrap(), x);
        assert_eq!(Expr::combine(&x, BinaryOp::Mul, &one).simplify().unwrap(), x);
        assert_eq!(
            Expr::combine(&x, BinaryOp::Mul, &zero).simplify().unwrap(),
            Expr::literal(0)
        );
    }

    #[test]
    fn division_by_literal_zero_fails_to_simplify() {
        let e = Expr::combine(&Expr::name("x"), BinaryOp::Div, &Expr::literal(0));
        assert!(e.simplify().is_err());
    }

    #[test]
    fn undefined_name_is_a_name_error() {
        let scope = Scope::new();
        assert!(matches!(
            Expr::name("missing").evaluate(&scope),
            Err(ExprError::NameError { .. })
        ));
    }

    #[test]
    fn division_truncates_toward_zero() {
        let scope = Scope::new();
        let e = Expr::combine(&Expr::literal(-7), BinaryOp::Div, &Expr::literal(2));
        assert_eq!(e.evaluate(&scope).unwrap(), -3);
    }
}
