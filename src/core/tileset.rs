//! Sets of tile identities (equivalently, grid cells) as 25-bit masks.

use std::fmt;

use crate::core::puzzle::TILE_COUNT;
use crate::error::Error;

/// Bit mask over the 25 tiles of a 5×5 puzzle. Bit `i` is set iff tile `i`
/// belongs to the set. Tile 0 is the blank ("zero tile").
///
/// The same type doubles as a set of grid cells: a tile's number is its home
/// cell, and most of the index machinery works with cell sets ("maps").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileSet(u32);

pub const ZERO_TILE: u8 = 0;

const FULL_MASK: u32 = (1 << TILE_COUNT) - 1;

impl TileSet {
    pub const EMPTY: TileSet = TileSet(0);
    pub const FULL: TileSet = TileSet(FULL_MASK);

    #[inline]
    pub const fn from_bits(bits: u32) -> TileSet {
        debug_assert!(bits & !FULL_MASK == 0);
        TileSet(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn has(self, tile: u8) -> bool {
        self.0 & (1 << tile) != 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Smallest member. Meaningless on the empty set.
    #[inline]
    pub const fn least(self) -> u8 {
        debug_assert!(self.0 != 0);
        self.0.trailing_zeros() as u8
    }

    #[inline]
    #[must_use]
    pub const fn add(self, tile: u8) -> TileSet {
        TileSet(self.0 | 1 << tile)
    }

    #[inline]
    #[must_use]
    pub const fn remove(self, tile: u8) -> TileSet {
        TileSet(self.0 & !(1 << tile))
    }

    #[inline]
    #[must_use]
    pub const fn remove_least(self) -> TileSet {
        TileSet(self.0 & (self.0 - 1))
    }

    #[inline]
    #[must_use]
    pub const fn complement(self) -> TileSet {
        TileSet(!self.0 & FULL_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn intersect(self, other: TileSet) -> TileSet {
        TileSet(self.0 & other.0)
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: TileSet) -> TileSet {
        TileSet(self.0 | other.0)
    }

    /// The set of all tiles numbered strictly below `tile`.
    #[inline]
    pub const fn below(tile: u8) -> TileSet {
        TileSet((1 << tile) - 1)
    }

    /// The `n` smallest tiles.
    #[inline]
    pub const fn least_n(n: u32) -> TileSet {
        TileSet((1 << n) - 1)
    }

    /// Select the `n`-th smallest member (0-based).
    #[inline]
    pub fn select(self, mut n: u32) -> u8 {
        let mut rest = self;
        while n > 0 {
            rest = rest.remove_least();
            n -= 1;
        }
        rest.least()
    }

    /// Parity of the sum of all member positions.
    ///
    /// Every sliding move relocates one occupied cell by ±1 or ±5, so this
    /// parity flips on each abstract move; together with the solved map's
    /// parity it anchors distance parities for the bit-packed tables.
    #[inline]
    pub const fn parity(self) -> bool {
        // Odd-indexed bits contribute odd summands.
        const ODD_CELLS: u32 = 0x00AA_AAAA & FULL_MASK;
        (self.0 & ODD_CELLS).count_ones() & 1 != 0
    }

    #[inline]
    pub fn iter(self) -> Iter {
        Iter(self)
    }

    /// Canonical textual form: ascending, comma-separated, two digits per
    /// tile. This string names pattern database files on disk.
    pub fn list_string(self) -> String {
        let mut out = String::with_capacity(3 * self.count() as usize);
        for tile in self.iter() {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(&format!("{tile:02}"));
        }
        out
    }

    /// Inverse of [`TileSet::list_string`]. Accepts tiles in any order and
    /// without padding, but rejects duplicates and out-of-range numbers.
    pub fn parse_list(s: &str) -> Result<TileSet, Error> {
        let mut ts = TileSet::EMPTY;
        for part in s.split(',') {
            let part = part.trim();
            let tile: u8 = part
                .parse()
                .map_err(|_| Error::usage(format!("bad tile number {part:?} in {s:?}")))?;
            if tile as usize >= TILE_COUNT {
                return Err(Error::usage(format!("tile {tile} out of range in {s:?}")));
            }
            if ts.has(tile) {
                return Err(Error::usage(format!("duplicate tile {tile} in {s:?}")));
            }
            ts = ts.add(tile);
        }
        Ok(ts)
    }
}

pub struct Iter(TileSet);

impl Iterator for Iter {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        if self.0.is_empty() {
            None
        } else {
            let tile = self.0.least();
            self.0 = self.0.remove_least();
            Some(tile)
        }
    }
}

impl fmt::Display for TileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.list_string())
    }
}
