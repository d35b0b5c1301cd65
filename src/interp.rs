//! The interpreter: owns every piece of mutable state a running program
//! touches, and drives it from the first token to END/EOF/abort.
//!
//! Kept generic over its output sink and input source (`W: Write`,
//! `R: BufRead`) so the core never hardcodes a stdio stream; tests drive
//! it against `Vec<u8>`/`Cursor<&[u8]>` instead of real terminals.

use std::io::{BufRead, Write};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::errors::{Diagnostics, ErrorKind};
use crate::label::LabelTable;
use crate::lexer::Lexer;
use crate::stack::BoundedStack;
use crate::token::Token;
use crate::util::Line;
use crate::vars::VarStore;

/// Cap matching the original's nesting limits for GOSUB/FOR/WHILE/DO.
pub const NEST_CAPACITY: usize = 32;

/// A pushed return point: where to resume, and the source line for
/// diagnostics once execution resumes there.
#[derive(Clone, Copy, Debug)]
pub struct GosubFrame {
    pub return_pos: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct ForFrame {
    pub var: char,
    pub limit: f64,
    pub step: f64,
    pub body_pos: usize,
}

/// The condition is captured once, on WHILE: a single variable, a
/// relational operator, and the already-evaluated right-hand value.
/// WEND re-fetches the variable and re-applies the operator rather than
/// re-parsing or re-evaluating any expression.
#[derive(Clone, Debug)]
pub struct WhileFrame {
    pub var: char,
    pub op: Token,
    pub rhs: f64,
    pub body_pos: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct DoFrame {
    pub body_pos: usize,
}

pub struct Interpreter<W: Write, R: BufRead> {
    pub(crate) lexer: Lexer,
    pub(crate) cur: Token,
    /// Byte offset where `cur` started, so a caller can jump back to the
    /// start of the token currently in hand (e.g. re-evaluating a WHILE
    /// condition from WEND).
    pub(crate) cur_start: usize,
    pub(crate) line: Line,
    pub(crate) vars: VarStore,
    pub(crate) labels: LabelTable,
    pub(crate) diag: Diagnostics,
    pub(crate) gosub_stack: BoundedStack<GosubFrame>,
    pub(crate) for_stack: BoundedStack<ForFrame>,
    pub(crate) while_stack: BoundedStack<WhileFrame>,
    pub(crate) do_stack: BoundedStack<DoFrame>,
    pub(crate) rng: StdRng,
    pub(crate) precision: u8,
    pub(crate) debug_mode: bool,
    pub(crate) out: W,
    pub(crate) input: R,
    pub(crate) halted: bool,
}

impl<W: Write, R: BufRead> Interpreter<W, R> {
    /// Builds an interpreter over `source`, running the label-scan
    /// preprocessor pass before any statement executes.
    pub fn new(source: &str, out: W, input: R) -> Self {
        let mut interp = Self {
            lexer: Lexer::new(source),
            cur: Token::Eof,
            cur_start: 0,
            line: Line::START,
            vars: VarStore::new(),
            labels: LabelTable::new(),
            diag: Diagnostics::new(),
            gosub_stack: BoundedStack::new(NEST_CAPACITY),
            for_stack: BoundedStack::new(NEST_CAPACITY),
            while_stack: BoundedStack::new(NEST_CAPACITY),
            do_stack: BoundedStack::new(NEST_CAPACITY),
            rng: StdRng::from_entropy(),
            precision: 0,
            debug_mode: false,
            out,
            input,
            halted: false,
        };
        interp.scan_labels();
        interp.lexer.set_position(0);
        interp.line = Line::START;
        interp.advance();
        interp
    }

    /// First pass over the whole source: records every numeric-label
    /// line start so GOTO/GOSUB can jump without a second scan at
    /// runtime. A label is a line whose first token is a bare `Num`
    /// immediately followed by `:`... the original format is simply a
    /// leading number token at the start of a line, recorded by cursor.
    fn scan_labels(&mut self) {
        self.lexer.set_position(0);
        let mut line = Line::START;
        let mut at_line_start = true;
        loop {
            let tok = self.lexer.read_token(&mut self.out, &mut self.diag);
            match tok {
                Token::Eof => break,
                Token::Eol => {
                    line.advance();
                    at_line_start = true;
                }
                Token::Num(text) if at_line_start => {
                    at_line_start = false;
                    if self.labels.contains(&text) {
                        self.diag.report(&mut self.out, line, ErrorKind::LblDupl);
                    } else if self.labels.is_full() {
                        self.diag.report(&mut self.out, line, ErrorKind::LblFull);
                    } else {
                        self.labels.insert(&text, self.lexer.position(), line);
                    }
                }
                _ => {
                    at_line_start = false;
                }
            }
        }
    }

    /// Advances `cur` to the next token, tracking `line` as EOLs pass.
    pub(crate) fn advance(&mut self) {
        self.cur_start = self.lexer.position();
        self.cur = self.lexer.read_token(&mut self.out, &mut self.diag);
        self.line = self.lexer.line();
    }

    /// Scans forward (consuming tokens) until `cur` matches one of
    /// `targets`, without stepping past the match. Returns the index
    /// into `targets` and the byte offset where that token starts, or
    /// `None` at EOF. Used by BREAK/CONTINUE to find the textually
    /// nearest loop terminator regardless of nesting.
    pub(crate) fn find_forward(&mut self, targets: &[Token]) -> Option<(usize, usize)> {
        while self.cur != Token::Eof {
            if let Some(idx) = targets.iter().position(|t| *t == self.cur) {
                return Some((idx, self.cur_start));
            }
            self.advance();
        }
        None
    }

    pub(crate) fn report(&mut self, kind: ErrorKind) {
        self.diag.report(&mut self.out, self.line, kind);
    }

    pub(crate) fn should_abort(&self) -> bool {
        self.diag.should_abort()
    }

    /// Skips tokens up to and including the next occurrence of `target`,
    /// ignoring nesting — matching the original's flat `skip_until`.
    pub(crate) fn skip_until(&mut self, target: &Token) {
        while self.cur != *target && self.cur != Token::Eof {
            self.advance();
        }
        if self.cur == *target {
            self.advance();
        }
    }

    /// Skips to the next occurrence of either `a` or `b`, returning
    /// which one stopped the scan (or `None` at EOF).
    pub(crate) fn skip_until2(&mut self, a: &Token, b: &Token) -> Option<usize> {
        while self.cur != *a && self.cur != *b && self.cur != Token::Eof {
            self.advance();
        }
        if self.cur == *a {
            self.advance();
            Some(0)
        } else if self.cur == *b {
            self.advance();
            Some(1)
        } else {
            None
        }
    }

    /// Three-way variant of [`skip_until2`](Self::skip_until2).
    pub(crate) fn skip_until3(&mut self, a: &Token, b: &Token, c: &Token) -> Option<usize> {
        while self.cur != *a && self.cur != *b && self.cur != *c && self.cur != Token::Eof {
            self.advance();
        }
        if self.cur == *a {
            self.advance();
            Some(0)
        } else if self.cur == *b {
            self.advance();
            Some(1)
        } else if self.cur == *c {
            self.advance();
            Some(2)
        } else {
            None
        }
    }

    /// Runs the program to completion: EOF, an `END` statement, or the
    /// diagnostic error budget being exhausted.
    pub fn run(&mut self) {
        while self.cur != Token::Eof && !self.halted && !self.should_abort() {
            if self.cur == Token::Eol {
                self.advance();
                continue;
            }
            self.exec_statement();
        }
        if !self.halted && !self.should_abort() {
            self.report(ErrorKind::EndMissing);
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn error_count(&self) -> u32 {
        self.diag.count()
    }

    /// `true` once the error threshold was reached and the run was cut
    /// short. A program that reports errors below the threshold but
    /// still reaches END/EOF is a normal completion, not an abort.
    pub fn aborted(&self) -> bool {
        self.should_abort()
    }
}
