//! Bit-packed databases: four bits per abstract state.
//!
//! A packed table stores every distance mod 16, two entries per byte, low
//! nibble first. That is enough for search: after one move the true value
//! sits within one of the previous value, so the nibble pins it exactly.
//! A from-scratch lookup recovers the true distance by walking the abstract
//! space towards the goal, following successors whose nibble decreases by
//! one (mod 16) at each step.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::core::puzzle::Puzzle;
use crate::core::tileset::TileSet;
use crate::error::Error;
use crate::index::{Index, IndexAux};
use crate::pdb::generate::for_each_successor;
use crate::pdb::{PatternDb, UNREACHED};

pub struct BitPdb {
    aux: IndexAux,
    solved: Index,
    data: Box<[u8]>,
}

impl BitPdb {
    /// Pack a fully generated database.
    pub fn from_pdb(pdb: &PatternDb) -> Result<BitPdb, Error> {
        let aux = pdb.aux().clone();
        let bytes = pdb.bytes();
        let mut data = Vec::new();
        data.try_reserve_exact(packed_len(&aux))
            .map_err(|_| Error::Resource {
                stage: "bitpdb_from_pdb",
                structure: "nibble table",
            })?;
        data.resize(packed_len(&aux), 0);

        for (i, &v) in bytes.iter().enumerate() {
            if v == UNREACHED {
                return Err(Error::Verify {
                    reason: format!("cannot pack unreached cell at offset {i}"),
                });
            }
            data[i / 2] |= (v % 16) << ((i % 2) * 4);
        }

        let solved = aux.solved_index();
        Ok(BitPdb {
            aux,
            solved,
            data: data.into_boxed_slice(),
        })
    }

    /// Read a packed table from disk; the length must match the tileset.
    pub fn load(ts: TileSet, path: &Path) -> Result<BitPdb, Error> {
        let aux = IndexAux::new(ts)?;
        let expected = packed_len(&aux);
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::io("bitpdb_load", path, e)
            }
        })?;
        let len = file
            .metadata()
            .map_err(|e| Error::io("bitpdb_load", path, e))?
            .len();
        if len != expected as u64 {
            return Err(Error::Malformed {
                path: path.display().to_string(),
                expected: expected as u64,
                actual: len,
            });
        }
        let mut data = Vec::new();
        data.try_reserve_exact(expected)
            .map_err(|_| Error::Resource {
                stage: "bitpdb_load",
                structure: "nibble table",
            })?;
        file.read_to_end(&mut data)
            .map_err(|e| Error::io("bitpdb_load", path, e))?;
        let solved = aux.solved_index();
        Ok(BitPdb {
            aux,
            solved,
            data: data.into_boxed_slice(),
        })
    }

    pub fn store(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::io("bitpdb_store", path, e))?;
        let mut w = BufWriter::new(file);
        w.write_all(&self.data)
            .map_err(|e| Error::io("bitpdb_store", path, e))?;
        w.flush().map_err(|e| Error::io("bitpdb_store", path, e))
    }

    #[inline]
    pub fn aux(&self) -> &IndexAux {
        &self.aux
    }

    #[inline]
    pub fn tileset(&self) -> TileSet {
        self.aux.tileset()
    }

    /// The stored nibble: the true distance mod 16.
    #[inline]
    pub fn lookup(&self, idx: &Index) -> u8 {
        let offset = self.aux.entry_offset(idx) as usize;
        (self.data[offset / 2] >> ((offset % 2) * 4)) & 0xf
    }

    /// Recover the true distance given a previous value no more than 7 away:
    /// the congruent value nearest to `old_h`. One puzzle move changes the
    /// heuristic by at most 1, which keeps differential search well inside
    /// the window.
    pub fn diff_lookup(&self, p: &Puzzle, old_h: u8) -> u8 {
        let stored = self.lookup(&self.aux.compute_index(p)) as i32;
        let delta = (stored - old_h as i32).rem_euclid(16);
        let mut h = old_h as i32 + delta;
        if delta > 8 && h >= 16 {
            h -= 16;
        }
        debug_assert_eq!(
            (h & 1) != 0,
            self.aux.tile_map(p).parity() != self.aux.solved_parity(),
            "recovered distance disagrees with the parity anchor"
        );
        h as u8
    }

    /// Exact distance from scratch: descend the abstract space, each step to
    /// a successor whose nibble is one less mod 16, until the goal state.
    /// The number of steps is the distance. Fails only on a corrupt table.
    pub fn lookup_puzzle(&self, p: &Puzzle) -> Result<u8, Error> {
        let mut idx = self.aux.compute_index(p);
        let mut dist: u32 = 0;

        while idx != self.solved {
            let want = self.lookup(&idx).wrapping_sub(1) & 0xf;
            let mut next = None;
            for_each_successor(&self.aux, &idx, &mut |succ| {
                if next.is_none() && self.lookup(&succ) == want {
                    next = Some(succ);
                }
            });
            idx = next.ok_or_else(|| Error::Verify {
                reason: format!("no descending successor from {idx}"),
            })?;
            dist += 1;
            if dist >= UNREACHED as u32 {
                return Err(Error::Verify {
                    reason: "descent does not terminate".to_string(),
                });
            }
        }

        Ok(dist as u8)
    }
}

#[inline]
fn packed_len(aux: &IndexAux) -> usize {
    (aux.total_entries() as usize + 1) / 2
}
