//! Builtin functions installed into a [`crate::Scope`] (spec section 4.4):
//! `ceil`, `log2`, `clog2`. Each takes a single evaluated integer argument.

use crate::error::{ExprError, ExprResult};
use crate::expr::Scope;

fn one_arg(args: &[i64], name: &str) -> ExprResult<f64> {
    match args {
        [v] => Ok(*v as f64),
        _ => Err(ExprError::TypeError {
            message: format!("{name} takes exactly one argument, got {}", args.len()),
        }),
    }
}

pub fn install_builtins(scope: &mut Scope) {
    scope.bind_callable("ceil", |args| {
        let v = one_arg(args, "ceil")?;
        Ok(v.ceil() as i64)
    });
    scope.bind_callable("log2", |args| {
        let v = one_arg(args, "log2")?;
        if v <= 0.0 {
            return Err(ExprError::ValueError { message: "log2 of a non-positive value".to_string() });
        }
        Ok(v.log2() as i64)
    });
    scope.bind_callable("clog2", |args| {
        let v = one_arg(args, "clog2")?;
        if v <= 0.0 {
            return Err(ExprError::ValueError { message: "clog2 of a non-positive value".to_string() });
        }
        Ok(v.log2().ceil() as i64)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn clog2_of_sixteen_is_four() {
        let scope = Scope::with_builtins();
        let e = Expr::call("clog2", vec![Expr::literal(16)]);
        assert_eq!(e.evaluate(&scope).unwrap(), 4);
    }
}
