use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::Nucleotide;

/// Errors raised while parsing or formatting changes and haplotypes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Change is missing the `position:mutation` separator.
    #[error("missing ':' separator in change '{0}'")]
    MissingSeparator(String),

    /// Position is not a non-negative integer.
    #[error("invalid position '{0}'")]
    InvalidPosition(String),

    /// Substitution sides are not single base characters.
    #[error("invalid substitution '{0}'")]
    InvalidSubstitution(String),

    /// Base symbol outside A/T/C/G and 0..3.
    #[error("invalid base '{0}'")]
    InvalidBase(String),

    /// Numeric nucleotide code outside 0..3.
    #[error("unknown nucleotide code {0}")]
    UnknownCode(u8),

    /// Insertion without any inserted bases.
    #[error("empty insertion in '{0}'")]
    EmptyInsertion(String),

    /// Deletion length missing, non-numeric or zero.
    #[error("invalid deletion length in '{0}'")]
    InvalidDeletion(String),

    /// Mutation string matches none of the known forms.
    #[error("unknown mutation '{0}'")]
    UnknownMutation(String),
}

/// Edit relative to the reference at a single anchor position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mutation {
    /// Point substitution `from->to`.
    Substitution {
        /// Reference base.
        from: Nucleotide,
        /// Observed base.
        to: Nucleotide,
    },
    /// Bases inserted immediately after the anchor position.
    Insertion(String),
    /// Number of reference bases removed starting at the anchor position.
    Deletion(u32),
}

impl Mutation {
    /// Construct a substitution.
    pub fn substitution(from: Nucleotide, to: Nucleotide) -> Self {
        Mutation::Substitution { from, to }
    }

    /// Returns `true` for substitutions.
    pub fn is_substitution(&self) -> bool {
        matches!(self, Mutation::Substitution { .. })
    }

    /// Returns `true` for insertions.
    pub fn is_insertion(&self) -> bool {
        matches!(self, Mutation::Insertion(_))
    }

    /// Returns `true` for deletions.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Mutation::Deletion(_))
    }
}

impl FromStr for Mutation {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((from, to)) = s.split_once("->") {
            let (from, to) = match (single_char(from), single_char(to)) {
                (Some(from), Some(to)) => (from, to),
                _ => return Err(FormatError::InvalidSubstitution(s.to_string())),
            };
            return Ok(Mutation::Substitution {
                from: Nucleotide::from_symbol(from)?,
                to: Nucleotide::from_symbol(to)?,
            });
        }

        if let Some(length) = s.strip_prefix("del") {
            return match length.parse::<u32>() {
                Ok(length) if length > 0 => Ok(Mutation::Deletion(length)),
                _ => Err(FormatError::InvalidDeletion(s.to_string())),
            };
        }

        if let Some(bases) = s.strip_prefix('i') {
            if bases.is_empty() {
                return Err(FormatError::EmptyInsertion(s.to_string()));
            }
            return Ok(Mutation::Insertion(bases.to_string()));
        }

        Err(FormatError::UnknownMutation(s.to_string()))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Substitution { from, to } => write!(f, "{from}->{to}"),
            Mutation::Insertion(bases) => write!(f, "i{bases}"),
            Mutation::Deletion(length) => write!(f, "del{length}"),
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// A single positional edit, `position` being a 0-based reference offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Change {
    /// 0-based anchor position in the reference.
    pub position: usize,
    /// Edit applied at the anchor.
    pub mutation: Mutation,
}

impl Change {
    /// Construct a new change.
    pub fn new(position: usize, mutation: Mutation) -> Self {
        Self { position, mutation }
    }
}

impl FromStr for Change {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (position, mutation) = s
            .split_once(':')
            .ok_or_else(|| FormatError::MissingSeparator(s.to_string()))?;
        let position = position
            .parse::<usize>()
            .map_err(|_| FormatError::InvalidPosition(position.to_string()))?;
        Ok(Change {
            position,
            mutation: mutation.parse()?,
        })
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.position, self.mutation)
    }
}

/// Parse a change of the form `123:A->G`, `123:iACGT` or `123:del3`.
pub fn parse_change(s: &str) -> Result<Change, FormatError> {
    s.parse()
}

/// Render a change back to its string form. Numeric base codes are always
/// written as letters.
pub fn format_change(change: &Change) -> String {
    change.to_string()
}
