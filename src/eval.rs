//! Expression evaluation: a 9-level precedence-climbing recursive
//! descent over the token stream, returning `f64` directly rather than
//! threading values through an explicit evaluation stack.
//!
//! Precedence, loosest to tightest: OR, AND, relational (non-associative
//! — at most one per expression), `+ -`, `* / %`, unary `NOT`, unary
//! `+ -`, parenthesized sub-expressions, and finally literals/variables/
//! built-in calls.

use std::io::{BufRead, Write};

use crate::errors::ErrorKind;
use crate::interp::Interpreter;
use crate::numfmt::{is_int, round_off, trunc};
use crate::token::Token;

impl<W: Write, R: BufRead> Interpreter<W, R> {
    /// Entry point: parses and evaluates a full expression.
    pub(crate) fn eval_expr(&mut self) -> f64 {
        self.eval_or()
    }

    fn eval_or(&mut self) -> f64 {
        let mut lhs = self.eval_and();
        while self.cur == Token::Or {
            self.advance();
            let rhs = self.eval_and();
            let result = bool_to_f64(truthy(lhs) || truthy(rhs));
            self.trace_binop("OR", lhs, rhs, result);
            lhs = result;
        }
        lhs
    }

    fn eval_and(&mut self) -> f64 {
        let mut lhs = self.eval_rel();
        while self.cur == Token::And {
            self.advance();
            let rhs = self.eval_rel();
            let result = bool_to_f64(truthy(lhs) && truthy(rhs));
            self.trace_binop("AND", lhs, rhs, result);
            lhs = result;
        }
        lhs
    }

    /// Relational operators do not chain: `a < b < c` parses a single
    /// `a < b` and then, if another relational operator follows, that is
    /// a separate (and likely erroneous, at the statement-parser level)
    /// construct rather than `(a < b) < c`.
    fn eval_rel(&mut self) -> f64 {
        let lhs = self.eval_add();
        if self.cur.is_rel_op() {
            let op = self.cur.clone();
            self.advance();
            let rhs = self.eval_add();
            let result = bool_to_f64(apply_rel(&op, lhs, rhs));
            self.trace_binop(&op.to_string(), lhs, rhs, result);
            return result;
        }
        lhs
    }

    fn eval_add(&mut self) -> f64 {
        let mut lhs = self.eval_mul();
        loop {
            match self.cur {
                Token::Plus => {
                    self.advance();
                    let rhs = self.eval_mul();
                    let result = lhs + rhs;
                    self.trace_binop("+", lhs, rhs, result);
                    lhs = result;
                }
                Token::Minus => {
                    self.advance();
                    let rhs = self.eval_mul();
                    let result = lhs - rhs;
                    self.trace_binop("-", lhs, rhs, result);
                    lhs = result;
                }
                _ => break,
            }
        }
        lhs
    }

    fn eval_mul(&mut self) -> f64 {
        let mut lhs = self.eval_not();
        loop {
            match self.cur {
                Token::Star => {
                    self.advance();
                    let rhs = self.eval_not();
                    let result = lhs * rhs;
                    self.trace_binop("*", lhs, rhs, result);
                    lhs = result;
                }
                Token::Slash => {
                    self.advance();
                    let rhs = self.eval_not();
                    if rhs == 0.0 {
                        self.report(ErrorKind::DivZero);
                        lhs = 0.0;
                    } else {
                        let result = lhs / rhs;
                        self.trace_binop("/", lhs, rhs, result);
                        lhs = result;
                    }
                }
                Token::Percent => {
                    self.advance();
                    let mut rhs = self.eval_not();
                    if !is_int(lhs) || !is_int(rhs) {
                        self.report(ErrorKind::ModOpndNotInt);
                        lhs = round_off(lhs);
                        rhs = round_off(rhs);
                    }
                    if rhs == 0.0 {
                        self.report(ErrorKind::DivZero);
                        lhs = 0.0;
                    } else {
                        let result = (lhs as i64 % rhs as i64) as f64;
                        self.trace_binop("%", lhs, rhs, result);
                        lhs = result;
                    }
                }
                _ => break,
            }
        }
        lhs
    }

    fn eval_not(&mut self) -> f64 {
        if self.cur == Token::Not {
            self.advance();
            let v = self.eval_not();
            return bool_to_f64(!truthy(v));
        }
        self.eval_unary_sign()
    }

    fn eval_unary_sign(&mut self) -> f64 {
        match self.cur {
            Token::Minus => {
                self.advance();
                -self.eval_unary_sign()
            }
            Token::Plus => {
                self.advance();
                self.eval_unary_sign()
            }
            _ => self.eval_primary(),
        }
    }

    fn eval_primary(&mut self) -> f64 {
        match self.cur.clone() {
            Token::LParen => {
                self.advance();
                let v = self.eval_expr();
                if self.cur == Token::RParen {
                    self.advance();
                } else {
                    self.report(ErrorKind::RparMissing);
                }
                v
            }
            Token::Num(text) => {
                self.advance();
                text.parse().unwrap_or(0.0)
            }
            Token::Var(name) => {
                self.advance();
                self.vars.get(&mut self.out, &mut self.diag, self.line, name)
            }
            Token::Abs | Token::Sgn | Token::Cint | Token::Fix | Token::Sqr | Token::Exp
            | Token::Log => {
                let kind = self.cur.clone();
                self.advance();
                let arg = self.paren_arg1();
                self.apply_unary_builtin(&kind, arg)
            }
            Token::Pow => {
                self.advance();
                let (base, exp) = self.paren_arg2();
                self.apply_pow(base, exp)
            }
            Token::Rnd => {
                self.advance();
                let (lo, hi) = self.paren_arg2();
                self.apply_rnd(lo, hi)
            }
            _ => {
                self.report(ErrorKind::UnexpToken);
                self.advance();
                0.0
            }
        }
    }

    fn paren_arg1(&mut self) -> f64 {
        if self.cur == Token::LParen {
            self.advance();
        } else {
            self.report(ErrorKind::LparMissing);
        }
        let v = self.eval_expr();
        if self.cur == Token::RParen {
            self.advance();
        } else {
            self.report(ErrorKind::RparMissing);
        }
        v
    }

    fn paren_arg2(&mut self) -> (f64, f64) {
        if self.cur == Token::LParen {
            self.advance();
        } else {
            self.report(ErrorKind::LparMissing);
        }
        let a = self.eval_expr();
        if self.cur == Token::Comma {
            self.advance();
        } else {
            self.report(ErrorKind::CommaMissing);
        }
        let b = self.eval_expr();
        if self.cur == Token::RParen {
            self.advance();
        } else {
            self.report(ErrorKind::RparMissing);
        }
        (a, b)
    }

    fn apply_unary_builtin(&mut self, kind: &Token, arg: f64) -> f64 {
        match kind {
            Token::Abs => arg.abs(),
            Token::Sgn => {
                if arg > 0.0 {
                    1.0
                } else if arg < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Token::Cint => round_off(arg),
            Token::Fix => trunc(arg),
            Token::Sqr => {
                if arg < 0.0 {
                    self.report(ErrorKind::SqrArgNeg);
                    0.0
                } else {
                    arg.sqrt()
                }
            }
            Token::Exp => arg.exp(),
            Token::Log => {
                if arg <= 0.0 {
                    self.report(ErrorKind::LogArgNeg);
                    0.0
                } else {
                    arg.ln()
                }
            }
            _ => unreachable!("apply_unary_builtin called with non-unary token"),
        }
    }

    fn apply_pow(&mut self, base: f64, exp: f64) -> f64 {
        let mut exp = exp;
        if exp < 0.0 {
            self.report(ErrorKind::ExpNeg);
            exp = 0.0;
        } else if !is_int(exp) {
            self.report(ErrorKind::ExpNotInt);
            exp = round_off(exp);
        }
        base.powi(exp as i32)
    }

    fn apply_rnd(&mut self, lo: f64, hi: f64) -> f64 {
        use rand::Rng;
        let mut lo = lo;
        let mut hi = hi;
        if lo < 0.0 {
            self.report(ErrorKind::RndArgNeg);
            lo = -lo;
        }
        if hi < 0.0 {
            self.report(ErrorKind::RndArgNeg);
            hi = -hi;
        }
        if !is_int(lo) || !is_int(hi) {
            self.report(ErrorKind::RndArgInt);
            lo = round_off(lo);
            hi = round_off(hi);
        }
        if !(lo < hi) {
            self.report(ErrorKind::RndWrongArg);
            return 0.0;
        }
        self.rng.gen_range(lo as i64..=hi as i64) as f64
    }

    /// Emits a one-line trace of a binary evaluation when debug mode is
    /// on. Not part of the observable arithmetic result, only of the
    /// surface output contract.
    fn trace_binop(&mut self, op: &str, lhs: f64, rhs: f64, result: f64) {
        if self.debug_mode {
            let _ = writeln!(self.out, "DEBUG: {lhs} {op} {rhs} = {result}");
        }
    }
}

fn truthy(v: f64) -> bool {
    v != 0.0
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn apply_rel(op: &Token, lhs: f64, rhs: f64) -> bool {
    match op {
        Token::Lt => lhs < rhs,
        Token::Le => lhs <= rhs,
        Token::Gt => lhs > rhs,
        Token::Ge => lhs >= rhs,
        Token::Eq => lhs == rhs,
        Token::Ne => lhs != rhs,
        _ => unreachable!("apply_rel called with non-relational token"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn eval(src: &str) -> f64 {
        let mut interp = Interpreter::new(src, Vec::new(), Cursor::new(Vec::new()));
        interp.eval_expr()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
    }

    #[test]
    fn unary_minus_binds_tighter_than_mul() {
        assert_eq!(eval("-2 * 3"), -6.0);
    }

    #[test]
    fn relational_and_logical() {
        assert_eq!(eval("1 < 2 AND 3 > 2"), 1.0);
        assert_eq!(eval("NOT (1 = 1)"), 0.0);
    }

    #[test]
    fn division_by_zero_reports_and_yields_zero() {
        let mut interp = Interpreter::new("10 / 0", Vec::new(), Cursor::new(Vec::new()));
        let v = interp.eval_expr();
        assert_eq!(v, 0.0);
        assert_eq!(interp.error_count(), 1);
    }

    #[test]
    fn builtin_functions() {
        assert_eq!(eval("ABS(-5)"), 5.0);
        assert_eq!(eval("SGN(-9)"), -1.0);
        assert_eq!(eval("SQR(9)"), 3.0);
        assert_eq!(eval("POW(2, 10)"), 1024.0);
    }

    #[test]
    fn sqr_of_negative_reports_and_yields_zero() {
        let mut interp = Interpreter::new("SQR(-1)", Vec::new(), Cursor::new(Vec::new()));
        let v = interp.eval_expr();
        assert_eq!(v, 0.0);
        assert_eq!(interp.error_count(), 1);
    }

    #[test]
    fn rnd_out_of_order_bounds_reports() {
        let mut interp = Interpreter::new("RND(5, 1)", Vec::new(), Cursor::new(Vec::new()));
        let v = interp.eval_expr();
        assert_eq!(v, 0.0);
        assert_eq!(interp.error_count(), 1);
    }
}
