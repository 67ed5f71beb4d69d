//! Dice formulas and the randomness source used during preview.
//!
//! Formulas are sums of dice and flat terms: `"2d4+1"`, `"-1d3"`,
//! `"1d4+1d2-1"`, `"d6"`, `"3"`. Every random draw the pipeline makes goes
//! through a [`DiceRoller`], including uniform target selection via
//! [`DiceRoller::pick`], so a seeded roller makes a whole resolution
//! reproducible.

use crate::error::DiceError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;
const MAX_REDRAWS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Dice { count: u32, sides: u32, sign: i32 },
    Flat(i32),
}

impl Term {
    /// Smallest and largest value of this term alone.
    fn bounds(self) -> (i32, i32) {
        match self {
            Term::Dice { count, sides, sign } if sign < 0 => {
                (-((count * sides) as i32), -(count as i32))
            }
            Term::Dice { count, sides, .. } => (count as i32, (count * sides) as i32),
            Term::Flat(v) => (v, v),
        }
    }
}

/// A parsed dice formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceFormula {
    source: String,
    terms: Vec<Term>,
}

impl DiceFormula {
    pub fn parse(formula: &str) -> Result<Self, DiceError> {
        let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }

        let invalid = |term: &str| DiceError::InvalidTerm {
            formula: formula.to_string(),
            term: term.to_string(),
        };

        // Split into signed chunks, keeping the sign with each chunk.
        let mut chunks: Vec<(i32, String)> = Vec::new();
        let mut sign = 1;
        let mut current = String::new();
        for c in compact.chars() {
            match c {
                '+' | '-' => {
                    if !current.is_empty() {
                        chunks.push((sign, std::mem::take(&mut current)));
                    } else if !chunks.is_empty() {
                        return Err(invalid(&c.to_string()));
                    }
                    sign = if c == '-' { -1 } else { 1 };
                }
                _ => current.push(c),
            }
        }
        if current.is_empty() {
            return Err(invalid(&compact));
        }
        chunks.push((sign, current));

        let mut terms = Vec::with_capacity(chunks.len());
        for (sign, chunk) in chunks {
            let lower = chunk.to_ascii_lowercase();
            if let Some((count, sides)) = lower.split_once('d') {
                let count = if count.is_empty() {
                    1
                } else {
                    count.parse::<u32>().map_err(|_| invalid(&chunk))?
                };
                let sides = sides.parse::<u32>().map_err(|_| invalid(&chunk))?;
                if sides == 0 || count > MAX_DICE || sides > MAX_SIDES {
                    return Err(DiceError::OutOfRange(formula.to_string()));
                }
                terms.push(Term::Dice { count, sides, sign });
            } else {
                let value = lower.parse::<i32>().map_err(|_| invalid(&chunk))?;
                terms.push(Term::Flat(sign * value));
            }
        }

        // Every running total, rolled or bounding, must fit in an i32.
        let (mut low, mut high) = (0i32, 0i32);
        for term in &terms {
            let (lo, hi) = term.bounds();
            match (low.checked_add(lo), high.checked_add(hi)) {
                (Some(l), Some(h)) => (low, high) = (l, h),
                _ => return Err(DiceError::OutOfRange(formula.to_string())),
            }
        }

        Ok(Self {
            source: compact,
            terms,
        })
    }

    /// Smallest possible result.
    pub fn min(&self) -> i32 {
        self.terms.iter().map(|t| t.bounds().0).sum()
    }

    /// Largest possible result.
    pub fn max(&self) -> i32 {
        self.terms.iter().map(|t| t.bounds().1).sum()
    }

    pub fn is_constant(&self) -> bool {
        self.terms
            .iter()
            .all(|t| matches!(t, Term::Flat(_) | Term::Dice { sides: 1, .. }))
    }

    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        self.terms
            .iter()
            .map(|t| match *t {
                Term::Dice { count, sides, sign } => {
                    let total: i32 = (0..count).map(|_| rng.gen_range(1..=sides) as i32).sum();
                    sign * total
                }
                Term::Flat(v) => v,
            })
            .sum()
    }
}

impl FromStr for DiceFormula {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Source of randomness for previews and recurring modifiers.
pub trait DiceRoller {
    fn roll(&mut self, formula: &str) -> Result<i32, DiceError>;

    /// Uniformly pick an index in `0..len`. `None` when `len == 0` or the
    /// roller fails.
    ///
    /// Pools larger than one die pick a block of `MAX_SIDES` candidates and
    /// then a member, redrawing when the member lies past the end of the
    /// last, shorter block.
    fn pick(&mut self, len: usize) -> Option<usize> {
        let block = MAX_SIDES as usize;
        match len {
            0 => None,
            1 => Some(0),
            _ if len <= block => {
                let value = self.roll(&format!("1d{len}")).ok()?;
                Some((value.max(1) as usize - 1).min(len - 1))
            }
            _ => {
                let blocks = len.div_ceil(block);
                for _ in 0..MAX_REDRAWS {
                    let index = self.pick(blocks)? * block + self.pick(block)?;
                    if index < len {
                        return Some(index);
                    }
                }
                Some(len - 1)
            }
        }
    }
}

/// Draw up to `n` distinct indices from `0..len`, in draw order.
pub fn pick_distinct(dice: &mut dyn DiceRoller, len: usize, n: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..len).collect();
    let mut chosen = Vec::with_capacity(n.min(len));
    while chosen.len() < n {
        let Some(i) = dice.pick(pool.len()) else {
            break;
        };
        chosen.push(pool.remove(i));
    }
    chosen
}

/// Deterministic roller backed by a seeded [`StdRng`].
pub struct SeededRoller {
    rng: StdRng,
}

impl SeededRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceRoller for SeededRoller {
    fn roll(&mut self, formula: &str) -> Result<i32, DiceError> {
        let parsed = DiceFormula::parse(formula)?;
        Ok(parsed.roll_with(&mut self.rng))
    }
}
