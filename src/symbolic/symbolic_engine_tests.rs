use crate::analysis::budget::Budget;
use crate::symbolic::parse_expr::parse;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::FoldError;
use crate::symbolic::utils::big_rational;
//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(text: &str, n: i64, d: i64) -> Result<Expr, FoldError> {
        let f = parse(text).unwrap();
        f.expr
            .set_variable(&f.variable, &big_rational(n, d))
            .fold(&mut Budget::unlimited())
    }

    #[test]
    fn test_display_parses_back() {
        for text in [
            "(x-1)/(x+2)",
            "x^2 - 3*x + 2",
            "sin(x)/x",
            "exp(-x^2)",
            "log(x + 1) - atan(x)",
            "x^(1/3)",
            "abs(x - 3)*pi",
            "1/(x*(x - 1))",
            "Piecewise((x, x < 0), (x^2, True))",
        ] {
            let first = parse(text).unwrap();
            let shown = first.expr.to_string();
            let second = parse(&shown).unwrap();
            assert_eq!(first.expr, second.expr, "{} -> {}", text, shown);
        }
    }

    #[test]
    fn test_display_of_parsed_text() {
        assert_eq!(parse("(x-1)/(x+2)").unwrap().to_string(), "(x - 1)/(x + 2)");
        assert_eq!(parse("x**2").unwrap().to_string(), "x^2");
        assert_eq!(parse("ln(x)").unwrap().to_string(), "log(x)");
        assert_eq!(parse("sqrt(x+1)").unwrap().to_string(), "sqrt(x + 1)");
    }

    #[test]
    fn test_substitute_and_fold() {
        assert_eq!(at("(x-1)/(x+2)", 2, 1).unwrap(), Expr::ratio(1, 4));
        assert_eq!(at("x**2", 0, 1).unwrap(), Expr::zero());
        assert_eq!(at("(x^2 + 1)/(x - 1)", 1, 3).unwrap(), Expr::ratio(-5, 3));
        assert_eq!(at("sqrt(x+1)", 3, 1).unwrap(), Expr::int(2));
        assert_eq!(at("x^(1/3)", -8, 1).unwrap(), Expr::int(-2));
        assert_eq!(at("sqrt(x)", 8, 1).unwrap().to_string(), "2*sqrt(2)");
    }

    #[test]
    fn test_fold_failures() {
        assert!(matches!(at("1/(x-3)", 3, 1), Err(FoldError::DivisionByZero(_))));
        assert!(matches!(at("(x-1)/(x+2)", -2, 1), Err(FoldError::DivisionByZero(_))));
        assert!(matches!(at("sqrt(x+1)", -2, 1), Err(FoldError::NonReal(_))));
        assert!(matches!(at("log(x)", 0, 1), Err(FoldError::Undefined(_))));
        assert!(matches!(at("log(x)", -1, 1), Err(FoldError::NonReal(_))));
    }

    #[test]
    fn test_lambdify_agrees_with_fold() {
        for text in ["(x-1)/(x+2)", "sqrt(x)", "x^3 - 3*x", "exp(x)/(1 + x^2)", "atan(x) + cos(x)"] {
            let f = parse(text).unwrap();
            let func = f.expr.lambdify1D();
            let exact = f
                .expr
                .set_variable("x", &big_rational(7, 2))
                .fold(&mut Budget::unlimited())
                .unwrap();
            assert_relative_eq!(func(3.5), exact.approx(), epsilon = 1e-12, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_fold_is_deterministic() {
        let f = parse("1/x + 1/(x+1)").unwrap();
        let point = big_rational(1, 1);
        let first = f.expr.set_variable("x", &point).fold(&mut Budget::unlimited()).unwrap();
        let second = f.expr.set_variable("x", &point).fold(&mut Budget::unlimited()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Expr::ratio(3, 2));
    }
}
