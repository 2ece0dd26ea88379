//! The eight dihedral symmetries of the 5×5 grid.
//!
//! A symmetry acts on grid cells; a tileset or a whole configuration can be
//! pushed through it ("morphed"). Symmetric tileset requests are folded onto
//! one canonical image so that a single database file on disk serves all of
//! them.

use crate::core::puzzle::{Puzzle, GRID_WIDTH, TILE_COUNT};
use crate::core::tileset::TileSet;

pub const SYMMETRY_COUNT: usize = 8;

/// `SYMMETRIES[m][cell]` is the image of `cell` under symmetry `m`.
/// Symmetry 0 is the identity; symmetry 1 is the main-diagonal transposition,
/// the only non-trivial symmetry fixing cell 0.
pub const SYMMETRIES: [[u8; TILE_COUNT]; SYMMETRY_COUNT] = {
    let mut tables = [[0u8; TILE_COUNT]; SYMMETRY_COUNT];
    let w = GRID_WIDTH as usize;
    let mut m = 0;
    while m < SYMMETRY_COUNT {
        let mut cell = 0;
        while cell < TILE_COUNT {
            let r = cell / w;
            let c = cell % w;
            let e = w - 1;
            let (nr, nc) = match m {
                0 => (r, c),
                1 => (c, r),
                2 => (r, e - c),
                3 => (e - c, r),
                4 => (e - r, c),
                5 => (c, e - r),
                6 => (e - r, e - c),
                _ => (e - c, e - r),
            };
            tables[m][cell] = (nr * w + nc) as u8;
            cell += 1;
        }
        m += 1;
    }
    tables
};

/// Image of a cell set under symmetry `m`.
pub fn morph(ts: TileSet, m: usize) -> TileSet {
    let mut out = TileSet::EMPTY;
    for cell in ts.iter() {
        out = out.add(SYMMETRIES[m][cell as usize]);
    }
    out
}

/// The symmetry producing the numerically smallest image of `ts`.
///
/// Two restrictions keep the folded databases meaningful:
/// - a set containing the zero tile may only use symmetries fixing cell 0
///   (the blank's home cell anchors its equivalence classes), and
/// - a set without the zero tile may not be renamed onto cell 0, which is
///   reserved for the blank in file names and query transforms.
pub fn canonical_automorphism(ts: TileSet) -> usize {
    let mut best = 0;
    let mut best_image = ts;
    for m in 0..SYMMETRY_COUNT {
        if ts.has(0) {
            if SYMMETRIES[m][0] != 0 {
                continue;
            }
        } else if ts.has(preimage(m, 0)) {
            continue;
        }
        let image = morph(ts, m);
        if image < best_image {
            best = m;
            best_image = image;
        }
    }
    best
}

/// The cell mapped onto `cell` by symmetry `m`.
#[inline]
fn preimage(m: usize, cell: u8) -> u8 {
    let mut from = 0;
    while SYMMETRIES[m][from as usize] != cell {
        from += 1;
    }
    from
}

impl Puzzle {
    /// Conjugate the configuration by symmetry `m`: cells move under the
    /// symmetry and non-blank tiles are renamed to match their new home
    /// cells. The blank stays tile 0; if the renaming would collide with it,
    /// the colliding tile takes the blank's image name instead. Tiles of any
    /// set `ts` avoiding that collision end up exactly on the cells
    /// `morph(ts, m)`, with distances to the goal preserved.
    #[must_use]
    pub fn morphed(&self, m: usize) -> Puzzle {
        let sym = &SYMMETRIES[m];
        let mut tiles = [0u8; TILE_COUNT];
        for tile in 0..TILE_COUNT {
            let renamed = if tile == 0 {
                0
            } else {
                match sym[tile] {
                    0 => sym[0],
                    other => other,
                }
            };
            tiles[renamed as usize] = sym[self.tile_location(tile as u8) as usize];
        }
        Puzzle::from_tiles(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetries_are_permutations() {
        for table in SYMMETRIES.iter() {
            let mut seen = [false; TILE_COUNT];
            for &cell in table {
                assert!(!seen[cell as usize]);
                seen[cell as usize] = true;
            }
        }
        assert_eq!(SYMMETRIES[0], core::array::from_fn(|i| i as u8));
        assert_eq!(SYMMETRIES[1][5], 1);
    }

    #[test]
    fn canonical_automorphism_is_order_independent() {
        let a = TileSet::parse_list("01,05").unwrap();
        let b = TileSet::parse_list("05,01").unwrap();
        let ma = canonical_automorphism(a);
        let mb = canonical_automorphism(b);
        assert_eq!(morph(a, ma).list_string(), morph(b, mb).list_string());
    }

    #[test]
    fn zero_aware_sets_keep_the_blank_home() {
        let ts = TileSet::parse_list("0,07,11").unwrap();
        let m = canonical_automorphism(ts);
        assert_eq!(SYMMETRIES[m][0], 0);
        assert!(morph(ts, m).has(0));
    }
}
