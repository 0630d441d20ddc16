use regex::Regex;

/// Cleavage rule used to score how specifically a peptide was digested
#[derive(Debug, Clone)]
pub struct Enzyme {
    // Skip cleaving if the site is followed by this AA
    pub skip_suffix: Option<u8>,
    // Residues after (or before, if not `c_terminal`) which the enzyme cuts
    regex: Regex,
    // Cleave at c-terminal?
    pub c_terminal: bool,
}

impl Default for Enzyme {
    fn default() -> Self {
        Self::trypsin()
    }
}

impl Enzyme {
    /// Cleaves after K or R, except before P
    pub fn trypsin() -> Self {
        Enzyme {
            skip_suffix: Some(b'P'),
            regex: Regex::new("^[KR]$").expect("valid regex"),
            c_terminal: true,
        }
    }

    fn cleaves(&self, residue: u8) -> bool {
        let buf = [residue.to_ascii_uppercase()];
        std::str::from_utf8(&buf)
            .map(|s| self.regex.is_match(s))
            .unwrap_or(false)
    }

    /// Is there a cleavage site between residues `left` and `right`?
    /// `-` marks a protein terminus, which always counts as one.
    pub fn is_site(&self, left: u8, right: u8) -> bool {
        if left == b'-' || right == b'-' {
            return true;
        }
        let right = right.to_ascii_uppercase();
        let (cut, next) = match self.c_terminal {
            true => (left, right),
            false => (right, right),
        };
        if !self.cleaves(cut) {
            return false;
        }
        match (self.c_terminal, self.skip_suffix) {
            (true, Some(skip)) => next != skip,
            _ => true,
        }
    }

    /// Number of tryptic-like termini (0, 1 or 2) of a peptide, given its
    /// flanking residues. Peptides reported without context count as fully
    /// specific.
    pub fn cleavage_state(&self, prefix: Option<char>, clean: &str, suffix: Option<char>) -> u8 {
        let (first, last) = match (clean.as_bytes().first(), clean.as_bytes().last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return 0,
        };
        let mut ntt = 0;
        match prefix {
            Some(p) if !self.is_site(p as u8, first) => {}
            _ => ntt += 1,
        }
        match suffix {
            Some(s) if !self.is_site(last, s as u8) => {}
            _ => ntt += 1,
        }
        ntt
    }
}
