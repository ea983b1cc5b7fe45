//! Markings of a Data Petri Net
//!
//! A marking assigns a [`TokenCount`] to every place of the net. During
//! coverability analysis a place may be accelerated to ω, which stands for an
//! unbounded number of tokens.

use std::{collections::BTreeMap, fmt};

use crate::{
    PlaceId,
    partial_ord::{PartialOrdCompResult, PartialOrder},
};

/// Number of tokens in a place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenCount {
    /// Concrete number of tokens
    Finite(u32),
    /// Unbounded number of tokens
    Omega,
}

impl TokenCount {
    /// Check whether the count is ω
    pub fn is_omega(&self) -> bool {
        matches!(self, TokenCount::Omega)
    }

    /// Check whether the place holds at least `weight` tokens
    pub fn covers(&self, weight: u32) -> bool {
        match self {
            TokenCount::Finite(n) => *n >= weight,
            TokenCount::Omega => true,
        }
    }

    /// Remove `weight` tokens
    ///
    /// Panics if fewer than `weight` tokens are present.
    fn consume(self, weight: u32) -> Self {
        match self {
            TokenCount::Finite(n) => TokenCount::Finite(
                n.checked_sub(weight)
                    .unwrap_or_else(|| panic!("cannot consume {weight} tokens from {n}")),
            ),
            TokenCount::Omega => TokenCount::Omega,
        }
    }

    /// Add `weight` tokens
    fn produce(self, weight: u32) -> Self {
        match self {
            TokenCount::Finite(n) => TokenCount::Finite(
                n.checked_add(weight)
                    .unwrap_or_else(|| panic!("cannot add {weight} tokens to {n}")),
            ),
            TokenCount::Omega => TokenCount::Omega,
        }
    }
}

impl PartialOrder for TokenCount {
    fn part_cmp(&self, other: &Self) -> PartialOrdCompResult {
        self.cmp(other).into()
    }
}

impl From<u32> for TokenCount {
    fn from(value: u32) -> Self {
        TokenCount::Finite(value)
    }
}

impl fmt::Display for TokenCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCount::Finite(n) => write!(f, "{n}"),
            TokenCount::Omega => write!(f, "ω"),
        }
    }
}

/// Distribution of tokens over the places of a net
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marking {
    tokens: BTreeMap<PlaceId, TokenCount>,
}

impl Marking {
    /// Create a new marking from the token count of every place
    pub fn new<I, P, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<PlaceId>,
        T: Into<TokenCount>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(p, t)| (p.into(), t.into()))
                .collect(),
        }
    }

    /// Tokens in `place`; places unknown to the marking hold no tokens
    pub fn tokens(&self, place: &str) -> TokenCount {
        self.tokens
            .get(place)
            .copied()
            .unwrap_or(TokenCount::Finite(0))
    }

    /// Iterate over all places and their token counts
    pub fn iter(&self) -> impl Iterator<Item = (&PlaceId, &TokenCount)> {
        self.tokens.iter()
    }

    /// Places that hold at least one token
    pub fn marked_places(&self) -> impl Iterator<Item = &PlaceId> {
        self.tokens
            .iter()
            .filter(|(_, t)| **t != TokenCount::Finite(0))
            .map(|(p, _)| p)
    }

    /// Check whether some place has been accelerated to ω
    pub fn has_omega(&self) -> bool {
        self.tokens.values().any(|t| t.is_omega())
    }

    /// Check whether every place of the preset holds enough tokens
    pub fn enables<'a>(&self, preset: impl IntoIterator<Item = (&'a PlaceId, u32)>) -> bool {
        preset
            .into_iter()
            .all(|(place, weight)| self.tokens(place).covers(weight))
    }

    /// Compute the marking after consuming `preset` and producing `postset`
    ///
    /// Panics if the preset is not covered by this marking or if a finite
    /// token count exceeds `u32::MAX`.
    pub fn fire<'a, 'b>(
        &self,
        preset: impl IntoIterator<Item = (&'a PlaceId, u32)>,
        postset: impl IntoIterator<Item = (&'b PlaceId, u32)>,
    ) -> Self {
        let mut tokens = self.tokens.clone();
        for (place, weight) in preset {
            let entry = tokens.entry(place.clone()).or_insert(TokenCount::Finite(0));
            *entry = entry.consume(weight);
        }
        for (place, weight) in postset {
            let entry = tokens.entry(place.clone()).or_insert(TokenCount::Finite(0));
            *entry = entry.produce(weight);
        }
        Self { tokens }
    }

    /// Set every place in which `self` exceeds `smaller` to ω
    ///
    /// Returns the accelerated marking together with the accelerated places.
    pub fn accelerate(&self, smaller: &Marking) -> (Self, Vec<PlaceId>) {
        let mut accelerated = Vec::new();
        let tokens = self
            .tokens
            .iter()
            .map(|(place, count)| {
                if *count > smaller.tokens(place) && !count.is_omega() {
                    accelerated.push(place.clone());
                    (place.clone(), TokenCount::Omega)
                } else {
                    (place.clone(), *count)
                }
            })
            .collect();
        (Self { tokens }, accelerated)
    }

    /// Check whether `self` coincides with `final_marking` on the places of
    /// `final_marking` and leaves every other place empty
    pub fn is_final(&self, final_marking: &Marking) -> bool {
        self.tokens
            .iter()
            .all(|(place, count)| *count == final_marking.tokens(place))
            && final_marking
                .tokens
                .iter()
                .all(|(place, count)| *count == self.tokens(place))
    }

    /// Check whether `self` marks every final place with at least the
    /// required tokens without being the final marking
    pub fn strictly_covers_final(&self, final_marking: &Marking) -> bool {
        final_marking
            .iter()
            .all(|(place, count)| self.tokens(place) >= *count)
            && !self.is_final(final_marking)
    }
}

impl PartialOrder for Marking {
    fn part_cmp(&self, other: &Self) -> PartialOrdCompResult {
        self.tokens.part_cmp(&other.tokens)
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marked = self
            .tokens
            .iter()
            .filter(|(_, t)| **t != TokenCount::Finite(0))
            .map(|(p, t)| match t {
                TokenCount::Finite(1) => p.to_string(),
                _ => format!("{t}{p}"),
            })
            .collect::<Vec<_>>();
        write!(f, "[{}]", marked.join(", "))
    }
}
