//! Structured indices for partial puzzle configurations.
//!
//! A pattern database abstracts a configuration down to the tiles of one
//! [`TileSet`]. The abstraction is addressed by a triple:
//!
//! - `maprank`: colex rank of the set of cells occupied by the non-zero
//!   tiles of the set (the "map"),
//! - `pidx`: a factorial-base number telling which tile sits on which mapped
//!   cell (inversion counts),
//! - `eqidx`: if the blank is tracked, which connected region of the map's
//!   complement it occupies; `-1` otherwise.
//!
//! The triple is in bijection with the abstract state space, which is what
//! lets a database live in a flat byte array.

use std::fmt;

use crate::core::puzzle::{neighbors, Puzzle, TILE_COUNT};
use crate::core::rank::{combination_count, next_combination, rank, unrank, FACTORIALS, MAX_TILES};
use crate::core::tileset::{TileSet, ZERO_TILE};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub maprank: u32,
    pub pidx: u32,
    /// Equivalence class of the blank, `-1` when the tileset does not track
    /// the zero tile.
    pub eqidx: i32,
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.pidx, self.maprank, self.eqidx)
    }
}

/// Per-maprank data for zero-aware tilesets: how the complement of the map
/// splits into regions the blank can roam without disturbing a tracked tile.
#[derive(Debug, Clone)]
pub struct MaprankInfo {
    /// Equivalence-class tables preceding this maprank, in units of classes.
    pub offset: u32,
    pub n_eqclass: u8,
    /// Cell → class id; `-1` on the mapped cells themselves.
    pub eqclasses: [i8; TILE_COUNT],
}

impl MaprankInfo {
    /// Cells belonging to equivalence class `eqidx`.
    pub fn class_members(&self, eqidx: i32) -> impl Iterator<Item = u8> + '_ {
        self.eqclasses
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c as i32 == eqidx)
            .map(|(cell, _)| cell as u8)
    }

    /// The canonical blank cell of a class: its smallest member.
    pub fn canonical_cell(&self, eqidx: i32) -> u8 {
        self.class_members(eqidx)
            .next()
            .expect("equivalence class without members")
    }
}

/// Everything derived from a tileset that index computations need: sizes,
/// the solved map's parity, and (for zero-aware sets) the per-maprank
/// equivalence-class tables. Immutable once built and freely shared.
#[derive(Debug, Clone)]
pub struct IndexAux {
    ts: TileSet,
    tsnz: TileSet,
    n_tile: u32,
    n_maprank: u32,
    n_perm: u32,
    solved_parity: bool,
    idxt: Vec<MaprankInfo>,
}

impl IndexAux {
    pub fn new(ts: TileSet) -> Result<IndexAux, Error> {
        let tsnz = ts.remove(ZERO_TILE);
        let n_tile = tsnz.count();
        if n_tile as usize > MAX_TILES {
            return Err(Error::usage(format!(
                "tileset {ts} has {n_tile} tiles, the limit is {MAX_TILES}"
            )));
        }

        let n_maprank = combination_count(n_tile);
        let mut idxt = Vec::new();
        if ts.has(ZERO_TILE) {
            idxt.try_reserve_exact(n_maprank as usize)
                .map_err(|_| Error::Resource {
                    stage: "index_aux",
                    structure: "equivalence class tables",
                })?;
            let mut map = TileSet::least_n(n_tile);
            let mut offset = 0u32;
            for i in 0..n_maprank {
                let (n_eqclass, eqclasses) = populate_eqclasses(map);
                idxt.push(MaprankInfo {
                    offset,
                    n_eqclass,
                    eqclasses,
                });
                offset += n_eqclass as u32;
                if i + 1 < n_maprank {
                    map = next_combination(map);
                }
            }
        }

        Ok(IndexAux {
            ts,
            tsnz,
            n_tile,
            n_maprank,
            n_perm: FACTORIALS[n_tile as usize],
            // The solved map is the non-zero tileset itself.
            solved_parity: tsnz.parity(),
            idxt,
        })
    }

    #[inline]
    pub fn tileset(&self) -> TileSet {
        self.ts
    }

    #[inline]
    pub fn has_zero(&self) -> bool {
        self.ts.has(ZERO_TILE)
    }

    /// The tracked tiles without the blank.
    #[inline]
    pub fn nonzero_tileset(&self) -> TileSet {
        self.tsnz
    }

    #[inline]
    pub fn n_tile(&self) -> u32 {
        self.n_tile
    }

    #[inline]
    pub fn n_maprank(&self) -> u32 {
        self.n_maprank
    }

    #[inline]
    pub fn n_perm(&self) -> u32 {
        self.n_perm
    }

    #[inline]
    pub fn solved_parity(&self) -> bool {
        self.solved_parity
    }

    #[inline]
    pub fn maprank_info(&self, maprank: u32) -> &MaprankInfo {
        &self.idxt[maprank as usize]
    }

    /// Entries in the table for `maprank`.
    #[inline]
    pub fn table_entries(&self, maprank: u32) -> u64 {
        let classes = if self.has_zero() {
            self.idxt[maprank as usize].n_eqclass as u64
        } else {
            1
        };
        classes * self.n_perm as u64
    }

    /// Entries preceding the table for `maprank` in storage order.
    #[inline]
    pub fn table_offset(&self, maprank: u32) -> u64 {
        let tables = if self.has_zero() {
            self.idxt[maprank as usize].offset as u64
        } else {
            maprank as u64
        };
        tables * self.n_perm as u64
    }

    /// Total entries across all tables; equally the size in bytes of the
    /// on-disk format, which is fully determined by the tileset.
    pub fn total_entries(&self) -> u64 {
        if self.has_zero() {
            let last = self.idxt.last().expect("zero-aware aux without tables");
            (last.offset as u64 + last.n_eqclass as u64) * self.n_perm as u64
        } else {
            self.n_maprank as u64 * self.n_perm as u64
        }
    }

    /// Flat position of `idx` within the concatenated tables.
    #[inline]
    pub fn entry_offset(&self, idx: &Index) -> u64 {
        let base = self.table_offset(idx.maprank);
        if self.has_zero() {
            base + idx.eqidx as u64 * self.n_perm as u64 + idx.pidx as u64
        } else {
            base + idx.pidx as u64
        }
    }

    /// The cells occupied by the tracked non-zero tiles in `p`.
    #[inline]
    pub fn tile_map(&self, p: &Puzzle) -> TileSet {
        let mut map = TileSet::EMPTY;
        for tile in self.tsnz.iter() {
            map = map.add(p.tile_location(tile));
        }
        map
    }

    /// Abstract `p` down to this tileset.
    pub fn compute_index(&self, p: &Puzzle) -> Index {
        let map = self.tile_map(p);
        let maprank = rank(map);
        let pidx = index_permutation(self.tsnz, map, p);
        let eqidx = if self.has_zero() {
            self.idxt[maprank as usize].eqclasses[p.zero_location() as usize] as i32
        } else {
            -1
        };
        Index {
            maprank,
            pidx,
            eqidx,
        }
    }

    /// A representative configuration of the abstract state `idx`: tracked
    /// tiles where the index dictates, untracked tiles packed in ascending
    /// order onto the remaining cells, and the blank (if tracked) on the
    /// canonical cell of its class.
    pub fn invert_index(&self, idx: &Index) -> Puzzle {
        let map = unrank(self.n_tile, idx.maprank);
        let mut p = unindex_permutation(self.tsnz, map, idx.pidx);
        if self.has_zero() {
            let target = self.idxt[idx.maprank as usize].canonical_cell(idx.eqidx);
            p.swap_cells(p.zero_location(), target);
        }
        p
    }

    /// Index of the solved configuration.
    pub fn solved_index(&self) -> Index {
        self.compute_index(&Puzzle::solved())
    }
}

/// Inversion-count encoding of which tracked tile occupies which mapped
/// cell. Digits are taken tile by tile in ascending tile order; each digit
/// is the number of still-unclaimed mapped cells below the tile's cell.
fn index_permutation(ts: TileSet, mut map: TileSet, p: &Puzzle) -> u32 {
    if ts.is_empty() {
        return 0;
    }

    let mut n_tiles = ts.count();
    let mut rest = ts;

    let cell = p.tile_location(rest.least());
    let mut pidx = map.intersect(TileSet::below(cell)).count();
    map = map.remove(cell);
    rest = rest.remove_least();

    let mut factor = 1;
    while !rest.is_empty() {
        factor *= n_tiles;
        n_tiles -= 1;
        let cell = p.tile_location(rest.least());
        pidx += factor * map.intersect(TileSet::below(cell)).count();
        map = map.remove(cell);
        rest = rest.remove_least();
    }

    pidx
}

/// Inverse of [`index_permutation`], extended to a full configuration by
/// packing the untracked tiles in ascending order onto the unmapped cells.
fn unindex_permutation(ts: TileSet, mut map: TileSet, mut pidx: u32) -> Puzzle {
    let mut tiles = [0u8; TILE_COUNT];
    let mut n_tiles = ts.count();
    let mut cmap = map.complement();

    for tile in 0..TILE_COUNT as u8 {
        if ts.has(tile) {
            let digit = pidx % n_tiles;
            pidx /= n_tiles;
            n_tiles -= 1;
            let cell = map.select(digit);
            map = map.remove(cell);
            tiles[tile as usize] = cell;
        } else {
            tiles[tile as usize] = cmap.least();
            cmap = cmap.remove_least();
        }
    }

    Puzzle::from_tiles(tiles)
}

/// Partition the complement of `map` into regions connected under grid
/// adjacency. Returns the class count and the cell → class table.
fn populate_eqclasses(map: TileSet) -> (u8, [i8; TILE_COUNT]) {
    let mut classes = [-1i8; TILE_COUNT];
    let mut n_class = 0i8;
    let mut stack = [0u8; TILE_COUNT];

    for start in 0..TILE_COUNT as u8 {
        if map.has(start) || classes[start as usize] >= 0 {
            continue;
        }
        classes[start as usize] = n_class;
        stack[0] = start;
        let mut top = 1;
        while top > 0 {
            top -= 1;
            let cell = stack[top];
            for &next in neighbors(cell) {
                if !map.has(next) && classes[next as usize] < 0 {
                    classes[next as usize] = n_class;
                    stack[top] = next;
                    top += 1;
                }
            }
        }
        n_class += 1;
    }

    (n_class as u8, classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eqclasses_split_on_a_full_wall() {
        // Cells 5..10 form the second row; it separates the first row from
        // the rest of the grid.
        let mut map = TileSet::EMPTY;
        for cell in 5..10 {
            map = map.add(cell);
        }
        let (n, classes) = populate_eqclasses(map);
        assert_eq!(n, 2);
        assert_eq!(classes[0], 0);
        assert_eq!(classes[4], 0);
        assert_eq!(classes[10], 1);
        assert_eq!(classes[24], 1);
        assert_eq!(classes[7], -1);
    }

    #[test]
    fn permutation_index_is_a_bijection() {
        let ts = TileSet::parse_list("01,02,03").unwrap();
        let aux = IndexAux::new(ts).unwrap();
        let map = TileSet::parse_list("4,9,14").unwrap();
        let maprank = rank(map);

        let mut seen = vec![false; aux.n_perm() as usize];
        for pidx in 0..aux.n_perm() {
            let idx = Index {
                maprank,
                pidx,
                eqidx: -1,
            };
            let p = aux.invert_index(&idx);
            let back = aux.compute_index(&p);
            assert_eq!(back, idx);
            assert!(!seen[back.pidx as usize]);
            seen[back.pidx as usize] = true;
        }
    }

    #[test]
    fn solved_index_addresses_a_zero_cell() {
        let aux = IndexAux::new(TileSet::parse_list("0,01,02").unwrap()).unwrap();
        let idx = aux.solved_index();
        assert_eq!(idx.eqidx, 0);
        assert!(aux.entry_offset(&idx) < aux.total_entries());
    }
}
