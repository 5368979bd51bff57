use crate::error::SolverError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[inline(always)]
pub fn is_dna_base(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T')
}

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

/// Watson-Crick pairing only; G·T wobbles are not part of the model.
#[inline(always)]
pub fn is_complementary(a: u8, b: u8) -> bool {
    is_dna_base(a) && complement(a) == b
}

#[derive(Deserialize)]
struct RawStrand {
    name: String,
    sequence: String,
}

/// A named DNA strand. Sequences are upper-cased and restricted to A/C/G/T.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawStrand")]
pub struct Strand {
    name: String,
    sequence: String,
}

impl Strand {
    pub fn new(sequence: &str, name: &str) -> Result<Self, SolverError> {
        let sequence = sequence.trim().to_ascii_uppercase();
        if sequence.is_empty() {
            return Err(SolverError::InvalidStrand {
                name: name.to_string(),
                reason: "sequence is empty".to_string(),
            });
        }
        if let Some(bad) = sequence.bytes().find(|b| !is_dna_base(*b)) {
            return Err(SolverError::InvalidStrand {
                name: name.to_string(),
                reason: format!("unexpected character '{}'", bad as char),
            });
        }
        Ok(Self {
            name: name.to_string(),
            sequence,
        })
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.sequence.as_bytes()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

impl TryFrom<RawStrand> for Strand {
    type Error = SolverError;

    fn try_from(raw: RawStrand) -> Result<Self, Self::Error> {
        Strand::new(&raw.sequence, &raw.name)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sequence)
    }
}

/// An unordered multiset of strands expected to associate.
///
/// Strands are kept in canonical order so that two complexes listing the
/// same members in a different order compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Strand>", into = "Vec<Strand>")]
pub struct Complex {
    strands: Vec<Strand>,
}

impl Complex {
    pub fn new<I: IntoIterator<Item = Strand>>(strands: I) -> Self {
        let mut strands: Vec<Strand> = strands.into_iter().collect();
        strands.sort();
        Self { strands }
    }

    #[inline(always)]
    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.strands.len()
    }

    pub fn count(&self, strand: &Strand) -> usize {
        self.strands.iter().filter(|s| *s == strand).count()
    }

    /// Member sequences in canonical order, separated by `+`.
    pub fn sequence(&self) -> String {
        self.strands
            .iter()
            .map(Strand::sequence)
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn name(&self) -> String {
        let names = self
            .strands
            .iter()
            .map(Strand::name)
            .collect::<Vec<_>>()
            .join("+");
        format!("({names})")
    }
}

impl From<Vec<Strand>> for Complex {
    fn from(strands: Vec<Strand>) -> Self {
        Complex::new(strands)
    }
}

impl From<Complex> for Vec<Strand> {
    fn from(complex: Complex) -> Self {
        complex.strands
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
