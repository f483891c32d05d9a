//! `old -> new` substitution rules.

use music_understand::{ChordSymbol, ChordSymbolError};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_until;

type PResult<T> = Result<T, ErrMode<ContextError>>;

pub const SEPARATOR: &str = "->";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubstitutionError {
    #[error("expected a single '->' but found {count}")]
    TooManyArrows { count: usize },

    #[error("nothing to match on the left of '->'")]
    EmptyPattern,

    #[error("no chord on the right of '->'")]
    EmptyTarget,

    #[error("'{target}' is not a chord reharm understands: {source}")]
    UnknownChord {
        target: String,
        #[source]
        source: ChordSymbolError,
    },
}

/// Replace every chord whose name contains `pattern` with `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    pattern: String,
    pattern_lower: String,
    pub target: ChordSymbol,
}

impl SubstitutionRule {
    pub fn new(pattern: &str, target: ChordSymbol) -> Self {
        Self {
            pattern: pattern.to_string(),
            pattern_lower: pattern.to_lowercase(),
            target,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Case-insensitive substring test against a chord name.
    pub fn matches(&self, chord_name: &str) -> bool {
        chord_name.to_lowercase().contains(&self.pattern_lower)
    }
}

fn rule_halves<'i>(input: &mut &'i str) -> PResult<(&'i str, &'i str)> {
    let pattern = take_until(0.., SEPARATOR).parse_next(input)?;
    SEPARATOR.parse_next(input)?;
    Ok((pattern, std::mem::take(input)))
}

/// Parse a substitution request.
///
/// `Ok(None)` when the text has no `->` at all (no substitution wanted).
pub fn parse_request(input: &str) -> Result<Option<SubstitutionRule>, SubstitutionError> {
    let count = input.matches(SEPARATOR).count();
    if count == 0 {
        return Ok(None);
    }
    if count > 1 {
        return Err(SubstitutionError::TooManyArrows { count });
    }

    let (pattern, target) = rule_halves
        .parse(input)
        .map_err(|_| SubstitutionError::TooManyArrows { count })?;
    let (pattern, target) = (pattern.trim(), target.trim());

    if pattern.is_empty() {
        return Err(SubstitutionError::EmptyPattern);
    }
    if target.is_empty() {
        return Err(SubstitutionError::EmptyTarget);
    }

    let symbol = ChordSymbol::parse(target).map_err(|source| SubstitutionError::UnknownChord {
        target: target.to_string(),
        source,
    })?;

    Ok(Some(SubstitutionRule::new(pattern, symbol)))
}
