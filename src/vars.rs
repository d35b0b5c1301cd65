//! The 26 predefined double-valued variable cells, A through Z.

use crate::errors::{Diagnostics, ErrorKind};
use crate::util::Line;
use std::io::Write;

#[derive(Debug)]
pub struct VarStore {
    cells: [f64; 26],
}

impl VarStore {
    pub fn new() -> Self {
        Self { cells: [0.0; 26] }
    }

    /// Sets `var`'s cell to `value`. `var` must be an ASCII letter;
    /// anything else reports `IllVarName` and is a no-op, mirroring the
    /// original's "report and continue" policy.
    pub fn set<W: Write>(&mut self, out: &mut W, diag: &mut Diagnostics, line: Line, var: char, value: f64) {
        match Self::index(var) {
            Some(i) => self.cells[i] = value,
            None => diag.report(out, line, ErrorKind::IllVarName),
        }
    }

    /// Gets `var`'s current value, defaulting to `0.0` and reporting
    /// `IllVarName` if `var` is not a letter.
    pub fn get<W: Write>(&self, out: &mut W, diag: &mut Diagnostics, line: Line, var: char) -> f64 {
        match Self::index(var) {
            Some(i) => self.cells[i],
            None => {
                diag.report(out, line, ErrorKind::IllVarName);
                0.0
            }
        }
    }

    fn index(var: char) -> Option<usize> {
        let upper = var.to_ascii_uppercase();
        if upper.is_ascii_alphabetic() {
            Some((upper as u8 - b'A') as usize)
        } else {
            None
        }
    }
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new();
        let mut vars = VarStore::new();
        vars.set(&mut out, &mut diag, Line(1), 'i', 5.0);
        assert_eq!(vars.get(&mut out, &mut diag, Line(1), 'I'), 5.0);
        assert_eq!(diag.count(), 0);
    }

    #[test]
    fn defaults_to_zero() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new();
        let vars = VarStore::new();
        assert_eq!(vars.get(&mut out, &mut diag, Line(1), 'Z'), 0.0);
    }
}
