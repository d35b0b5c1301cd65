//! Statement execution: one handler per statement kind, dispatched from
//! [`Interpreter::run`](crate::interp::Interpreter::run).
//!
//! Control flow is modeled by repositioning the scanner's cursor and
//! pushing/popping the bounded per-construct stacks, not by a host-side
//! call stack — GOTO, GOSUB/RETURN, and every loop terminator work by
//! jumping the lexer and falling back into the normal statement loop.

use std::io::{BufRead, Write};

use rand::SeedableRng;

use crate::errors::ErrorKind;
use crate::eval::apply_rel;
use crate::interp::{DoFrame, ForFrame, GosubFrame, Interpreter, WhileFrame};
use crate::numfmt::{format_number, is_int, round_off};
use crate::token::Token;

fn truthy(v: f64) -> bool {
    v != 0.0
}

impl<W: Write, R: BufRead> Interpreter<W, R> {
    pub(crate) fn exec_statement(&mut self) {
        match self.cur.clone() {
            Token::Num(_) => self.advance(), // line label, already recorded by the preprocessor pass
            Token::Var(name) => self.exec_assign(name),
            Token::If => self.exec_if(),
            Token::Goto => self.exec_goto(),
            Token::Gosub => self.exec_gosub(),
            Token::Return => self.exec_return(),
            Token::For => self.exec_for(),
            Token::Next => self.exec_next(),
            Token::While => self.exec_while(),
            Token::Wend => self.exec_wend(),
            Token::Do => self.exec_do(),
            Token::Until => self.exec_until(),
            Token::Break => self.exec_break(),
            Token::Continue => self.exec_continue(),
            Token::Input => self.exec_input(),
            Token::Print => self.exec_print(),
            Token::Randomize => self.exec_randomize(),
            Token::Precision => self.exec_precision(),
            Token::DebMode => self.exec_deb_mode(),
            Token::End => self.exec_end(),
            Token::Eof => {}
            _ => {
                self.report(ErrorKind::UnexpToken);
                self.advance();
            }
        }
    }

    /// Runs statements until `cur` matches one of `stops`, hits EOF, the
    /// program halts, or the error budget is exhausted. Used for IF's
    /// THEN/ELSE bodies.
    fn run_block(&mut self, stops: &[Token]) {
        while !stops.contains(&self.cur)
            && self.cur != Token::Eof
            && !self.halted
            && !self.should_abort()
        {
            if self.cur == Token::Eol {
                self.advance();
                continue;
            }
            self.exec_statement();
        }
    }

    fn exec_assign(&mut self, var: char) {
        self.advance(); // the variable itself
        if self.cur == Token::Eq {
            self.advance();
        } else {
            self.report(ErrorKind::EqMissing);
        }
        let value = self.eval_expr();
        self.vars.set(&mut self.out, &mut self.diag, self.line, var, value);
    }

    fn exec_if(&mut self) {
        self.advance(); // IF
        let cond = self.eval_expr();
        if self.cur == Token::Then {
            self.advance();
        } else {
            self.report(ErrorKind::ThenMissing);
        }

        if truthy(cond) {
            self.run_block(&[Token::Else, Token::EndIf]);
            match self.cur {
                Token::Else => {
                    self.advance();
                    self.skip_until(&Token::EndIf);
                }
                Token::EndIf => self.advance(),
                _ => {}
            }
        } else {
            match self.skip_until2(&Token::Else, &Token::EndIf) {
                Some(0) => {
                    self.run_block(&[Token::EndIf]);
                    if self.cur == Token::EndIf {
                        self.advance();
                    }
                }
                _ => {}
            }
        }
    }

    fn exec_goto(&mut self) {
        self.advance(); // GOTO
        match self.cur.clone() {
            Token::Num(label) => {
                self.advance();
                self.jump_to_label(&label);
            }
            _ => self.report(ErrorKind::LblMissing),
        }
    }

    fn exec_gosub(&mut self) {
        self.advance(); // GOSUB
        match self.cur.clone() {
            Token::Num(label) => {
                self.advance();
                let return_pos = self.cur_start;
                if self.gosub_stack.push(GosubFrame { return_pos }).is_err() {
                    self.report(ErrorKind::TooManyGosubNest);
                    return;
                }
                self.jump_to_label(&label);
            }
            _ => self.report(ErrorKind::LblMissing),
        }
    }

    fn exec_return(&mut self) {
        self.advance(); // RETURN
        match self.gosub_stack.pop() {
            None => self.report(ErrorKind::RetWithoutGosub),
            Some(frame) => {
                self.lexer.set_position(frame.return_pos);
                self.advance();
            }
        }
    }

    /// Jumps the scanner to `label`'s recorded position. Deliberately
    /// does not resync the line counter: `self.line` stays whatever the
    /// scanner last counted, so diagnostics after a jump report a stale
    /// line until the next newline is scanned, matching the source this
    /// was ported from.
    fn jump_to_label(&mut self, label: &str) {
        match self.labels.find(label) {
            Some(rec) => {
                self.lexer.set_position(rec.cursor);
                self.advance();
            }
            None => self.report(ErrorKind::LblUndef),
        }
    }

    fn exec_for(&mut self) {
        self.advance(); // FOR
        let var = match self.cur.clone() {
            Token::Var(c) => {
                self.advance();
                c
            }
            _ => {
                self.report(ErrorKind::NotVar);
                return;
            }
        };
        if self.cur == Token::Eq {
            self.advance();
        } else {
            self.report(ErrorKind::EqMissing);
        }
        let start = self.eval_expr();
        if self.cur == Token::To {
            self.advance();
        } else {
            self.report(ErrorKind::ToMissing);
        }
        let limit = self.eval_expr();
        let step = if self.cur == Token::Step {
            self.advance();
            let s = self.eval_expr();
            if s == 0.0 {
                self.report(ErrorKind::StepZero);
                1.0
            } else {
                s
            }
        } else {
            1.0
        };

        let skip_loop = if step > 0.0 { start > limit } else { start < limit };
        if skip_loop {
            while self.cur != Token::Next && self.cur != Token::Eof {
                self.advance();
            }
            if self.cur == Token::Next {
                self.advance();
            } else {
                self.report(ErrorKind::NextMissing);
            }
            return;
        }

        self.vars.set(&mut self.out, &mut self.diag, self.line, var, start);
        let body_pos = self.cur_start;
        let frame = ForFrame {
            var,
            limit,
            step,
            body_pos,
        };
        if self.for_stack.push(frame).is_err() {
            self.report(ErrorKind::TooManyForNest);
        }
    }

    fn exec_next(&mut self) {
        self.advance(); // NEXT
        match self.for_stack.peek().copied() {
            None => self.report(ErrorKind::NextWithoutFor),
            Some(frame) => {
                let next_val =
                    self.vars.get(&mut self.out, &mut self.diag, self.line, frame.var) + frame.step;
                self.vars
                    .set(&mut self.out, &mut self.diag, self.line, frame.var, next_val);
                let keep_going = if frame.step >= 0.0 {
                    next_val <= frame.limit
                } else {
                    next_val >= frame.limit
                };
                if keep_going {
                    self.lexer.set_position(frame.body_pos);
                    self.advance();
                } else {
                    self.for_stack.pop();
                }
            }
        }
    }

    /// `WHILE var rel-op expr`: the right-hand side is evaluated once,
    /// here, and cached in the frame — WEND re-fetches only the
    /// variable, never the expression.
    fn exec_while(&mut self) {
        self.advance(); // WHILE
        let var = match self.cur.clone() {
            Token::Var(c) => {
                self.advance();
                c
            }
            _ => {
                self.report(ErrorKind::NotVar);
                return;
            }
        };
        let op = self.cur.clone();
        if !op.is_rel_op() {
            self.report(ErrorKind::RelOpMissing);
            return;
        }
        self.advance();
        let rhs = self.eval_expr();
        let var_value = self.vars.get(&mut self.out, &mut self.diag, self.line, var);

        if apply_rel(&op, var_value, rhs) {
            let body_pos = self.cur_start;
            let frame = WhileFrame {
                var,
                op,
                rhs,
                body_pos,
            };
            if self.while_stack.push(frame).is_err() {
                self.report(ErrorKind::TooManyWhileNest);
            }
        } else {
            while self.cur != Token::Wend && self.cur != Token::Eof {
                self.advance();
            }
            if self.cur == Token::Wend {
                self.advance();
            } else {
                self.report(ErrorKind::WendMissing);
            }
        }
    }

    fn exec_wend(&mut self) {
        self.advance(); // WEND
        match self.while_stack.peek().cloned() {
            None => self.report(ErrorKind::WendWithoutWhile),
            Some(frame) => {
                let var_value =
                    self.vars.get(&mut self.out, &mut self.diag, self.line, frame.var);
                if apply_rel(&frame.op, var_value, frame.rhs) {
                    self.lexer.set_position(frame.body_pos);
                    self.advance();
                } else {
                    self.while_stack.pop();
                }
            }
        }
    }

    fn exec_do(&mut self) {
        self.advance(); // DO
        let body_pos = self.cur_start;
        if self.do_stack.push(DoFrame { body_pos }).is_err() {
            self.report(ErrorKind::TooManyDoNest);
        }
    }

    /// `UNTIL var rel-op expr`: unlike WHILE/WEND, the condition is
    /// textually present at the terminator itself, so it is parsed and
    /// evaluated fresh every time UNTIL runs rather than cached.
    fn exec_until(&mut self) {
        self.advance(); // UNTIL
        let var = match self.cur.clone() {
            Token::Var(c) => {
                self.advance();
                c
            }
            _ => {
                self.report(ErrorKind::NotVar);
                return;
            }
        };
        let var_value = self.vars.get(&mut self.out, &mut self.diag, self.line, var);
        let op = self.cur.clone();
        if !op.is_rel_op() {
            self.report(ErrorKind::RelOpMissing);
            return;
        }
        self.advance();
        let rhs = self.eval_expr();
        let res = apply_rel(&op, var_value, rhs);

        match self.do_stack.pop() {
            None => self.report(ErrorKind::UntilWithoutDo),
            Some(frame) => {
                if !res {
                    self.lexer.set_position(frame.body_pos);
                    self.advance();
                    if self.do_stack.push(frame).is_err() {
                        self.report(ErrorKind::TooManyDoNest);
                    }
                }
            }
        }
    }

    /// Jumps past the textually nearest loop terminator without undoing
    /// its frame — the stack for that loop stays pushed, a known quirk
    /// carried over from the source this was ported from. UNTIL's
    /// trailing `var rel-op expr` is consumed syntactically so execution
    /// resumes cleanly after the whole statement, but none of its
    /// looping action runs.
    fn exec_break(&mut self) {
        self.advance(); // BREAK
        if let Some((idx, pos)) = self.find_forward(&[Token::Next, Token::Wend, Token::Until]) {
            self.lexer.set_position(pos);
            self.advance(); // the terminator keyword itself
            self.advance(); // past it
            if idx == 2 {
                // UNTIL var rel-op expr: consume the condition's syntax
                // without evaluating it into a popped frame.
                if let Token::Var(_) = self.cur {
                    self.advance();
                }
                if self.cur.is_rel_op() {
                    self.advance();
                }
                self.eval_expr();
            }
        }
    }

    /// Jumps to the textually nearest loop terminator and executes it
    /// directly, reusing NEXT/WEND/UNTIL's own re-entry logic.
    fn exec_continue(&mut self) {
        self.advance(); // CONTINUE
        if let Some((_, pos)) = self.find_forward(&[Token::Next, Token::Wend, Token::Until]) {
            self.lexer.set_position(pos);
            self.advance();
            self.exec_statement();
        }
    }

    /// `INPUT [prompt-string ,] var`: an explicit string prompt must be
    /// followed by a comma; otherwise a default `"? "` prompt is shown.
    fn exec_input(&mut self) {
        self.advance(); // INPUT
        if let Token::Str(prompt) = self.cur.clone() {
            self.advance();
            let _ = write!(self.out, "{prompt} ");
            if self.cur == Token::Comma {
                self.advance();
            } else {
                self.report(ErrorKind::CommaMissing);
            }
        } else {
            let _ = write!(self.out, "? ");
        }

        match self.cur.clone() {
            Token::Var(name) => {
                self.advance();
                let mut line = String::new();
                let _ = self.input.read_line(&mut line);
                let value: f64 = line.trim().parse().unwrap_or(0.0);
                self.vars.set(&mut self.out, &mut self.diag, self.line, name, value);
            }
            _ => self.report(ErrorKind::VarMissing),
        }
    }

    fn exec_print(&mut self) {
        self.advance(); // PRINT
        loop {
            match self.cur.clone() {
                Token::Str(text) => {
                    self.advance();
                    let _ = write!(self.out, "{text}");
                }
                Token::Eol | Token::Eof => break,
                _ => {
                    let value = self.eval_expr();
                    let text = format_number(value, self.precision);
                    let _ = write!(self.out, "{text}");
                }
            }
            match self.cur {
                Token::Comma => {
                    self.advance();
                    let _ = write!(self.out, " ");
                }
                Token::Semi => {
                    self.advance();
                    let _ = write!(self.out, "\t");
                }
                _ => break,
            }
        }
        let _ = writeln!(self.out);
    }

    fn exec_randomize(&mut self) {
        self.advance(); // RANDOMIZE
        if matches!(self.cur, Token::Eol | Token::Eof) {
            self.rng = rand::rngs::StdRng::from_entropy();
            return;
        }
        let mut seed = self.eval_expr();
        if seed < 0.0 {
            self.report(ErrorKind::RandArgNeg);
            seed = -seed;
        }
        if !is_int(seed) {
            self.report(ErrorKind::RandArgInt);
            seed = round_off(seed);
        }
        self.rng = rand::rngs::StdRng::seed_from_u64(seed as u64);
    }

    /// Valid decimal-place range for PRECISION; out-of-range values are
    /// clamped rather than rejected.
    const PRECISION_MAX: u8 = 6;

    fn exec_precision(&mut self) {
        self.advance(); // PRECISION
        let mut value = self.eval_expr();
        if value < 0.0 {
            self.report(ErrorKind::PrecArgNeg);
            value = -value;
        }
        if !is_int(value) {
            self.report(ErrorKind::PrecArgInt);
            value = round_off(value);
        }
        self.precision = (value as u8).min(Self::PRECISION_MAX);
    }

    fn exec_deb_mode(&mut self) {
        self.advance(); // DEB_MODE
        match self.cur {
            Token::On => {
                self.advance();
                self.debug_mode = true;
            }
            Token::Off => {
                self.advance();
                self.debug_mode = false;
            }
            _ => self.report(ErrorKind::OnOffMissing),
        }
    }

    fn exec_end(&mut self) {
        self.advance(); // END
        self.halted = true;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::interp::Interpreter;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(src, Vec::new(), Cursor::new(Vec::new()));
        interp.run();
        String::from_utf8(interp.into_output()).unwrap()
    }

    #[test]
    fn assignment_and_print() {
        assert_eq!(run("10 X = 2 + 3\n20 PRINT X\n30 END\n"), "5\n");
    }

    #[test]
    fn if_then_endif_taken_branch() {
        let out = run("10 X = 1\n20 IF X = 1 THEN\n30 PRINT \"yes\"\n40 ENDIF\n50 END\n");
        assert_eq!(out, "yes\n");
    }

    #[test]
    fn if_then_else_untaken_branch_runs_else() {
        let out =
            run("10 X = 0\n20 IF X = 1 THEN\n30 PRINT \"yes\"\n40 ELSE\n50 PRINT \"no\"\n60 ENDIF\n70 END\n");
        assert_eq!(out, "no\n");
    }

    #[test]
    fn goto_jumps_forward() {
        let out = run("10 GOTO 30\n20 PRINT \"skipped\"\n30 PRINT \"here\"\n40 END\n");
        assert_eq!(out, "here\n");
    }

    #[test]
    fn gosub_return_round_trip() {
        let out = run(
            "10 GOSUB 100\n20 PRINT \"back\"\n30 END\n100 PRINT \"sub\"\n110 RETURN\n",
        );
        assert_eq!(out, "sub\nback\n");
    }

    #[test]
    fn for_next_loop_counts() {
        let out = run("10 FOR I = 1 TO 3\n20 PRINT I\n30 NEXT\n40 END\n");
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn while_wend_loop() {
        let out = run("10 X = 0\n20 WHILE X < 3\n30 PRINT X\n40 X = X + 1\n50 WEND\n60 END\n");
        assert_eq!(out, "0\n1\n2\n");
    }

    #[test]
    fn do_until_runs_body_then_checks() {
        let out = run("10 X = 0\n20 DO\n30 PRINT X\n40 X = X + 1\n50 UNTIL X >= 2\n60 END\n");
        assert_eq!(out, "0\n1\n");
    }

    #[test]
    fn next_without_for_reports() {
        let mut interp = Interpreter::new("10 NEXT\n20 END\n", Vec::new(), Cursor::new(Vec::new()));
        interp.run();
        assert_eq!(interp.error_count(), 1);
    }

    #[test]
    fn print_comma_is_space_semicolon_is_tab() {
        let out = run("10 PRINT 1, 2; 3\n20 END\n");
        assert_eq!(out, "1 2\t3\n");
    }

    #[test]
    fn precision_clamps_above_six() {
        let out = run("10 PRECISION 7\n20 PRINT 1 / 4\n30 END\n");
        assert_eq!(out, "0.250000\n");
    }

    #[test]
    fn input_reads_a_value_with_default_prompt() {
        let mut interp = Interpreter::new(
            "10 INPUT X\n20 PRINT X\n30 END\n",
            Vec::new(),
            Cursor::new(b"42\n".to_vec()),
        );
        interp.run();
        let out = String::from_utf8(interp.into_output()).unwrap();
        assert_eq!(out, "? 42\n");
    }

    #[test]
    fn input_with_string_prompt() {
        let mut interp = Interpreter::new(
            "10 INPUT \"value\", X\n20 PRINT X\n30 END\n",
            Vec::new(),
            Cursor::new(b"7\n".to_vec()),
        );
        interp.run();
        let out = String::from_utf8(interp.into_output()).unwrap();
        assert_eq!(out, "value 7\n");
    }

    #[test]
    fn break_jumps_past_nearest_terminator() {
        let out = run("10 FOR I = 1 TO 5\n20 PRINT I\n30 BREAK\n40 NEXT\n50 PRINT 99\n60 END\n");
        assert_eq!(out, "1\n99\n");
    }
}
