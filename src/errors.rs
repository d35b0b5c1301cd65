//! Diagnostics: error kinds and the reporting sink.

use std::io::Write;

use crate::util::Line;

/// Number of reported errors after which the interpreter aborts.
pub const MAX_ERRORS: u32 = 10;

/// All diagnosable conditions, grouped the way spec.md §7 groups them.
///
/// Message text is a direct port of the original `ErrTable` so that
/// `"ERROR: Line = {line}, Msg = {kind}."` reproduces the original
/// program's diagnostic lines exactly.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ErrorKind {
    // --- syntax / shape ---
    #[error("equal sign = expected")]
    EqMissing,
    #[error("comma , expected")]
    CommaMissing,
    #[error("variable expected")]
    VarMissing,
    #[error("relational operator expected")]
    RelOpMissing,
    #[error("closing quote \" missing:")]
    QuoteMissing,
    #[error("left parenthesis ( missing")]
    LparMissing,
    #[error("right parenthesis ) missing")]
    RparMissing,
    #[error("END missing")]
    EndMissing,
    #[error("TO expected")]
    ToMissing,
    #[error("STEP expected")]
    StepMissing,
    #[error("THEN expected")]
    ThenMissing,
    #[error("NEXT expected")]
    NextMissing,
    #[error("WEND expected")]
    WendMissing,
    #[error("ON or OFF expected")]
    OnOffMissing,
    #[error("label missing")]
    LblMissing,
    #[error("no expression present")]
    ExprMissing,

    // --- recognition ---
    #[error("unbalanced parentheses")]
    UnbalPar,
    #[error("not a variable")]
    NotVar,
    #[error("not a relational operator")]
    NotRelOp,
    #[error("unrecognized token")]
    UnrecToken,
    #[error("unexpected token")]
    UnexpToken,
    #[error("illegal var name")]
    IllVarName,
    #[error("illegal var name in FOR loop")]
    IllVarNameFor,

    // --- domain ---
    #[error("RANDOMIZE argument cannot be negative")]
    RandArgNeg,
    #[error("RANDOMIZE argument must be integer")]
    RandArgInt,
    #[error("RND() argument canot be negative")]
    RndArgNeg,
    #[error("RND() argument must be integer")]
    RndArgInt,
    #[error("wrong RND() arguments: must be a < b")]
    RndWrongArg,
    #[error("division by 0 is illegal")]
    DivZero,
    #[error("negative exponent is illegal")]
    ExpNeg,
    #[error("exponent must be integer number")]
    ExpNotInt,
    #[error("SQR() argument cannot be negative")]
    SqrArgNeg,
    #[error("LOG() argument must be non-negative")]
    LogArgNeg,
    #[error("% operands must be integers")]
    ModOpndNotInt,
    #[error("PRECISION argument cannot be negative")]
    PrecArgNeg,
    #[error("PRECISION argument must be integer")]
    PrecArgInt,

    // --- control-flow shape ---
    #[error("too many nested FORs")]
    TooManyForNest,
    #[error("NEXT without FOR")]
    NextWithoutFor,
    #[error("step is zero")]
    StepZero,
    #[error("too many nested WHILEs")]
    TooManyWhileNest,
    #[error("WEND without WHILE")]
    WendWithoutWhile,
    #[error("too many nested DOs")]
    TooManyDoNest,
    #[error("UNTIL without DO")]
    UntilWithoutDo,
    #[error("too many nested GOSUBs")]
    TooManyGosubNest,
    #[error("RETURN without GOSUB")]
    RetWithoutGosub,

    // --- capacity ---
    #[error("label table full")]
    LblFull,
    #[error("label table empty")]
    LblEmpty,
    #[error("duplicate label")]
    LblDupl,
    #[error("undefined label")]
    LblUndef,
}

/// Reports diagnosed conditions and tracks the error budget.
///
/// Never unwinds: callers report and return a safe default, then carry
/// on. `Diagnostics` itself only decides *when the program must stop*
/// (the error-count threshold); it is up to the driver to check
/// [`Diagnostics::should_abort`] after each statement and halt the run.
pub struct Diagnostics {
    count: u32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Reports `kind` at `line` to `out`, formatted per spec.md §6.
    pub fn report<W: Write>(&mut self, out: &mut W, line: Line, kind: ErrorKind) {
        let _ = writeln!(out, "ERROR: Line = {line}, Msg = {kind}.");
        tracing::debug!(%line, %kind, "diagnostic reported");
        self.count += 1;
        if self.count == MAX_ERRORS {
            let _ = writeln!(out, "Too many errors. Program aborted.");
        }
    }

    /// `true` once the error threshold has been reached.
    pub fn should_abort(&self) -> bool {
        self.count >= MAX_ERRORS
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_format_and_count() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new();
        diag.report(&mut out, Line(3), ErrorKind::DivZero);
        assert_eq!(diag.count(), 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ERROR: Line = 3, Msg = division by 0 is illegal.\n"
        );
    }

    #[test]
    fn aborts_after_threshold() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new();
        for _ in 0..MAX_ERRORS {
            diag.report(&mut out, Line(1), ErrorKind::UnrecToken);
        }
        assert!(diag.should_abort());
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("Too many errors. Program aborted.\n"));
    }

    #[test]
    fn does_not_abort_below_threshold() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new();
        for _ in 0..MAX_ERRORS - 1 {
            diag.report(&mut out, Line(1), ErrorKind::UnrecToken);
        }
        assert!(!diag.should_abort());
    }
}
