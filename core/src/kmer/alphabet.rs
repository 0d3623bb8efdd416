//! Nucleotide alphabets with ambiguity letters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const IUPAC_LETTERS: &[u8; 15] = b"acgtryswkmbdhvn";

// 4-bit masks over {a=1, c=2, g=4, t=8}
const IUPAC_MASKS: [u8; 15] = [1, 2, 4, 8, 5, 10, 6, 9, 12, 3, 14, 13, 11, 7, 15];

const GAPPED_LETTERS: &[u8; 5] = b"acgtn";
const GAPPED_MASKS: [u8; 5] = [1, 2, 4, 8, 15];

/// Alphabet used to spell k-mer classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alphabet {
    /// Plain `acgt`
    Nucleotide,
    /// `acgt` plus the wildcard `n`
    GappedNucleotide,
    /// Full IUPAC nucleotide code
    IupacNucleotide,
}

impl Alphabet {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nucleotide => "nucleotide",
            Self::GappedNucleotide => "gapped-nucleotide",
            Self::IupacNucleotide => "iupac-nucleotide",
        }
    }

    /// Letters in code order.
    pub fn letters(&self) -> &'static [u8] {
        match self {
            Self::Nucleotide => &IUPAC_LETTERS[..4],
            Self::GappedNucleotide => GAPPED_LETTERS,
            Self::IupacNucleotide => IUPAC_LETTERS,
        }
    }

    fn masks(&self) -> &'static [u8] {
        match self {
            Self::Nucleotide => &IUPAC_MASKS[..4],
            Self::GappedNucleotide => &GAPPED_MASKS,
            Self::IupacNucleotide => &IUPAC_MASKS,
        }
    }

    pub fn size(&self) -> usize {
        self.letters().len()
    }

    /// Code of a letter (case-insensitive).
    pub fn code(&self, letter: u8) -> Option<u8> {
        let letter = letter.to_ascii_lowercase();
        self.letters()
            .iter()
            .position(|&l| l == letter)
            .map(|c| c as u8)
    }

    pub fn letter(&self, code: u8) -> u8 {
        self.letters()[code as usize]
    }

    /// Whether the code stands for more than one base.
    pub fn is_ambiguous(&self, code: u8) -> bool {
        code >= 4
    }

    /// Code of the complementary letter.
    pub fn complement(&self, code: u8) -> u8 {
        let m = self.masks()[code as usize];
        let c = ((m & 1) << 3) | ((m & 8) >> 3) | ((m & 2) << 1) | ((m & 4) >> 1);
        self.masks()
            .iter()
            .position(|&x| x == c)
            .expect("alphabet closed under complement") as u8
    }

    /// Ambiguity codes covering the plain base `base` (a code in `0..4`).
    pub fn ambiguous_covers(&self, base: u8) -> impl Iterator<Item = u8> + '_ {
        let bit = self.masks()[base as usize];
        self.masks()
            .iter()
            .enumerate()
            .skip(4)
            .filter(move |(_, &m)| m & bit != 0)
            .map(|(c, _)| c as u8)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Alphabet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nucleotide" => Ok(Self::Nucleotide),
            "gapped-nucleotide" => Ok(Self::GappedNucleotide),
            "iupac-nucleotide" => Ok(Self::IupacNucleotide),
            other => Err(format!("invalid alphabet: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_is_involution() {
        for alphabet in [
            Alphabet::Nucleotide,
            Alphabet::GappedNucleotide,
            Alphabet::IupacNucleotide,
        ] {
            for c in 0..alphabet.size() as u8 {
                assert_eq!(alphabet.complement(alphabet.complement(c)), c);
            }
        }
        let a = Alphabet::IupacNucleotide;
        let comp = |l: u8| a.letter(a.complement(a.code(l).unwrap()));
        assert_eq!(comp(b'a'), b't');
        assert_eq!(comp(b'c'), b'g');
        assert_eq!(comp(b'r'), b'y');
        assert_eq!(comp(b's'), b's');
        assert_eq!(comp(b'n'), b'n');
    }

    #[test]
    fn test_ambiguous_covers() {
        let a = Alphabet::IupacNucleotide;
        let covers: Vec<u8> = a.ambiguous_covers(0).map(|c| a.letter(c)).collect();
        assert_eq!(covers, b"rwmdhvn".to_vec());
        let g = Alphabet::GappedNucleotide;
        assert_eq!(g.ambiguous_covers(2).collect::<Vec<_>>(), vec![4]);
        assert_eq!(Alphabet::Nucleotide.ambiguous_covers(1).count(), 0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("gapped-nucleotide".parse::<Alphabet>(), Ok(Alphabet::GappedNucleotide));
        assert_eq!(Alphabet::IupacNucleotide.to_string(), "iupac-nucleotide");
        assert!("protein".parse::<Alphabet>().is_err());
        assert_eq!(Alphabet::Nucleotide.code(b'G'), Some(2));
    }
}
