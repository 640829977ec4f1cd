use std::fmt::{Display, Formatter};
use std::ops::Index;

/// Token counts, one per place, in the canonical place order of a net.
///
/// Markings compare lexicographically, which is the canonical order
/// used whenever a set of markings is enumerated.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Marking(Vec<u8>);

impl Marking {
    pub fn new(tokens: Vec<u8>) -> Self {
        Self(tokens)
    }

    /// Marking with every place set from `bits` (`true` is one token).
    pub fn from_bits(bits: &[bool]) -> Self {
        Self(bits.iter().map(|&b| b as u8).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[u8] {
        &self.0
    }

    pub fn is_marked(&self, place: usize) -> bool {
        self.0[place] > 0
    }

    /// Indices of the places holding a token.
    pub fn marked_places(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().filter(|(_, &t)| t > 0).map(|(i, _)| i)
    }
}

impl From<Vec<u8>> for Marking {
    fn from(tokens: Vec<u8>) -> Self {
        Self(tokens)
    }
}

impl Index<usize> for Marking {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Display for Marking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, ")")
    }
}
