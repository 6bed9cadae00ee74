// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::symbolic::symbolic_engine::{Condition, Expr};
use crate::symbolic::utils::rational_to_f64;
use num::integer::Integer;
use num_traits::ToPrimitive;

/// thread safe closure produced by `lambdify1D`
pub type Lambdified = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// real power: negative bases are allowed for integer exponents and for rational exponents
/// with an odd denominator, where the real odd root is taken
fn real_pow(base: f64, exp: &Expr, exp_value: f64) -> f64 {
    if let Expr::Const(q) = exp {
        if q.is_integer() {
            if let Some(n) = q.numer().to_i32() {
                return base.powi(n);
            }
        } else if base < 0.0 {
            if q.denom().is_odd() {
                let magnitude = (-base).powf(exp_value);
                return if q.numer().is_odd() { -magnitude } else { magnitude };
            }
            return f64::NAN;
        }
    }
    base.powf(exp_value)
}

fn condition_holds(cond: &Condition, x: f64) -> bool {
    match cond {
        Condition::Always => true,
        Condition::Compare(lhs, rel, rhs) => {
            let diff = lhs.eval_f64(x) - rhs.eval_f64(x);
            match diff.partial_cmp(&0.0) {
                Some(ordering) => rel.holds(ordering),
                None => false,
            }
        }
    }
}

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Converts the single-variable expression into an executable Rust closure.
    ///
    /// Every `Var` node is the argument of the closure (the parser guarantees there is only
    /// one variable). Points outside the real domain give NaN, poles give ±inf.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::var("x").pow(Expr::int(2));
    /// let func = f.lambdify1D();
    /// assert_eq!(func(3.0), 9.0);
    /// ```
    pub fn lambdify1D(&self) -> Lambdified {
        match self {
            Expr::Var(_) => Box::new(|x| x),
            Expr::Const(q) => {
                let val = rational_to_f64(q);
                Box::new(move |_| val)
            }
            Expr::Constant(c) => {
                let val = c.value();
                Box::new(move |_| val)
            }
            Expr::Add(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D();
                let rhs_fn = rhs.lambdify1D();
                Box::new(move |x| lhs_fn(x) + rhs_fn(x))
            }
            Expr::Sub(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D();
                let rhs_fn = rhs.lambdify1D();
                Box::new(move |x| lhs_fn(x) - rhs_fn(x))
            }
            Expr::Mul(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D();
                let rhs_fn = rhs.lambdify1D();
                Box::new(move |x| lhs_fn(x) * rhs_fn(x))
            }
            Expr::Div(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D();
                let rhs_fn = rhs.lambdify1D();
                Box::new(move |x| lhs_fn(x) / rhs_fn(x))
            }
            Expr::Pow(base, exp) => {
                let base_fn = base.lambdify1D();
                let exp_fn = exp.lambdify1D();
                let exp_expr = (**exp).clone();
                Box::new(move |x| real_pow(base_fn(x), &exp_expr, exp_fn(x)))
            }
            Expr::Neg(inner) => {
                let inner_fn = inner.lambdify1D();
                Box::new(move |x| -inner_fn(x))
            }
            Expr::Func(func, arg) => {
                let arg_fn = arg.lambdify1D();
                let func = *func;
                Box::new(move |x| func.apply_f64(arg_fn(x)))
            }
            Expr::Piecewise(branches) => {
                let branches = branches.clone();
                Box::new(move |x| {
                    for (expr, cond) in branches.iter() {
                        if condition_holds(cond, x) {
                            return expr.eval_f64(x);
                        }
                    }
                    f64::NAN
                })
            }
        } // end of match
    } // end of lambdify1D

    /// direct recursive evaluation with every variable set to x
    pub fn eval_f64(&self, x: f64) -> f64 {
        match self {
            Expr::Var(_) => x,
            Expr::Const(q) => rational_to_f64(q),
            Expr::Constant(c) => c.value(),
            Expr::Add(lhs, rhs) => lhs.eval_f64(x) + rhs.eval_f64(x),
            Expr::Sub(lhs, rhs) => lhs.eval_f64(x) - rhs.eval_f64(x),
            Expr::Mul(lhs, rhs) => lhs.eval_f64(x) * rhs.eval_f64(x),
            Expr::Div(lhs, rhs) => lhs.eval_f64(x) / rhs.eval_f64(x),
            Expr::Pow(base, exp) => real_pow(base.eval_f64(x), exp, exp.eval_f64(x)),
            Expr::Neg(inner) => -inner.eval_f64(x),
            Expr::Func(func, arg) => func.apply_f64(arg.eval_f64(x)),
            Expr::Piecewise(branches) => branches
                .iter()
                .find(|(_, cond)| condition_holds(cond, x))
                .map(|(expr, _)| expr.eval_f64(x))
                .unwrap_or(f64::NAN),
        }
    }

    /// floating approximation of an expression without variables
    pub fn approx(&self) -> f64 {
        self.eval_f64(f64::NAN)
    }
}
