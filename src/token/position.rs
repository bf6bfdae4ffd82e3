use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};

/// Positions covered by one annotated token.
///
/// Positions are token ordinals and never negative: `validate` rejects
/// negative values, and the codec only encodes specs that pass `validate`.
/// Round trips through the codec therefore hold for non-negative positions
/// only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSpec {
    Single(i32),
    Range { start: i32, end: i32 },  // Inclusive on both sides
    Set(Vec<i32>),                   // Discontinuous annotations
}

/// Allowed extra distance on one side of a containment check, as a
/// `[minimum, maximum]` range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tolerance {
    pub minimum: u32,
    pub maximum: u32,
}

impl Tolerance {
    pub const ZERO: Tolerance = Tolerance { minimum: 0, maximum: 0 };

    pub fn new(minimum: u32, maximum: u32) -> Result<Self> {
        if minimum > maximum {
            return Err(Error::invalid_argument(format!(
                "Tolerance minimum {} exceeds maximum {}", minimum, maximum
            )));
        }
        Ok(Tolerance { minimum, maximum })
    }

    pub fn exact(distance: u32) -> Self {
        Tolerance { minimum: distance, maximum: distance }
    }

    pub fn is_zero(&self) -> bool {
        self.maximum == 0
    }

    /// Component-wise sum, saturating.
    pub fn plus(&self, other: Tolerance) -> Tolerance {
        Tolerance {
            minimum: self.minimum.saturating_add(other.minimum),
            maximum: self.maximum.saturating_add(other.maximum),
        }
    }
}

impl PositionSpec {
    pub fn single(position: i32) -> Self {
        PositionSpec::Single(position)
    }

    pub fn range(start: i32, end: i32) -> Result<Self> {
        let spec = PositionSpec::Range { start, end };
        spec.validate()?;
        Ok(spec)
    }

    /// Sorts and deduplicates; an empty set is rejected.
    pub fn set(mut positions: Vec<i32>) -> Result<Self> {
        positions.sort_unstable();
        positions.dedup();
        let spec = PositionSpec::Set(positions);
        spec.validate()?;
        Ok(spec)
    }

    pub fn min_position(&self) -> i32 {
        match self {
            PositionSpec::Single(p) => *p,
            PositionSpec::Range { start, .. } => *start,
            // Set invariant: never empty
            PositionSpec::Set(positions) => positions.first().copied().unwrap_or_default(),
        }
    }

    pub fn max_position(&self) -> i32 {
        match self {
            PositionSpec::Single(p) => *p,
            PositionSpec::Range { end, .. } => *end,
            PositionSpec::Set(positions) => positions.last().copied().unwrap_or_default(),
        }
    }

    /// Number of positions actually covered (gaps excluded).
    pub fn len(&self) -> usize {
        match self {
            PositionSpec::Single(_) => 1,
            PositionSpec::Range { start, end } => (end - start) as usize + 1,
            PositionSpec::Set(positions) => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// True when every position between min and max is covered. A `Set`
    /// stays a `Set` even when this holds.
    pub fn is_contiguous(&self) -> bool {
        match self {
            PositionSpec::Single(_) | PositionSpec::Range { .. } => true,
            PositionSpec::Set(positions) => positions.windows(2).all(|w| w[1] == w[0] + 1),
        }
    }

    pub fn covers(&self, position: i32) -> bool {
        match self {
            PositionSpec::Single(p) => *p == position,
            PositionSpec::Range { start, end } => *start <= position && position <= *end,
            PositionSpec::Set(positions) => positions.binary_search(&position).is_ok(),
        }
    }

    pub fn positions(&self) -> Box<dyn Iterator<Item = i32> + '_> {
        match self {
            PositionSpec::Single(p) => Box::new(std::iter::once(*p)),
            PositionSpec::Range { start, end } => Box::new(*start..=*end),
            PositionSpec::Set(positions) => Box::new(positions.iter().copied()),
        }
    }

    /// Interval overlap on `[min, max]`.
    pub fn overlaps(&self, other: &PositionSpec) -> bool {
        overlaps(self, other)
    }

    pub fn contains(&self, inner: &PositionSpec, left: Tolerance, right: Tolerance) -> bool {
        contains(self, inner, left, right)
    }

    /// Validity check used before encoding: positions must be non-negative
    /// and the variant invariants must hold.
    pub fn validate(&self) -> Result<()> {
        match self {
            PositionSpec::Single(p) if *p < 0 => {
                Err(Error::invalid_argument(format!("Negative position {}", p)))
            }
            PositionSpec::Range { start, end } if *start < 0 || start > end => {
                Err(Error::invalid_argument(format!("Invalid position range {}..{}", start, end)))
            }
            PositionSpec::Set(positions) => {
                if positions.is_empty() {
                    return Err(Error::invalid_argument("Empty position set"));
                }
                if positions[0] < 0 || positions.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(Error::invalid_argument("Position set must be non-negative and strictly increasing"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

pub fn min(p: &PositionSpec) -> i32 {
    p.min_position()
}

pub fn max(p: &PositionSpec) -> i32 {
    p.max_position()
}

pub fn overlaps(a: &PositionSpec, b: &PositionSpec) -> bool {
    a.min_position() <= b.max_position() && b.min_position() <= a.max_position()
}

/// Inner's `[min, max]` lies inside outer's interval widened by the maximum
/// of each tolerance.
pub fn contains(outer: &PositionSpec, inner: &PositionSpec, left: Tolerance, right: Tolerance) -> bool {
    let lo = outer.min_position() as i64 - left.maximum as i64;
    let hi = outer.max_position() as i64 + right.maximum as i64;
    lo <= inner.min_position() as i64 && inner.max_position() as i64 <= hi
}
