//! Breadth-first construction and consistency checking.
//!
//! Generation runs in rounds: round `r` scans every cell holding `r`,
//! enumerates its abstract successors, and publishes `r + 1` into any
//! successor cell still `UNREACHED`. Workers split the maprank range and
//! only meet at the driver's join barrier between rounds, so relaxed atomics
//! on the cells are sufficient: two workers racing on a successor write the
//! same round value, and a stale `UNREACHED` read at worst repeats a bounded
//! amount of work in the next round.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::core::puzzle::neighbors;
use crate::error::Error;
use crate::index::{Index, IndexAux};
use crate::parallel::ParallelDriver;
use crate::pdb::{load_relaxed, set_if_unreached, PatternDb, UNREACHED};

/// What a finished generation looked like.
#[derive(Debug, Clone)]
pub struct GenerationStats {
    /// Number of expansion rounds, which equals the abstraction's diameter.
    pub rounds: u32,
    /// `histogram[d]` cells ended up at distance `d`.
    pub histogram: Vec<u64>,
}

impl GenerationStats {
    pub fn max_distance(&self) -> u8 {
        self.histogram
            .iter()
            .rposition(|&n| n > 0)
            .unwrap_or(0) as u8
    }
}

/// Visit the abstract successors of the state `idx`.
///
/// For a zero-aware tileset these are the configurations one legal blank
/// move away, taken from every blank cell in the state's equivalence class;
/// moves that only shuffle untracked tiles stay inside the same class and
/// are skipped. Without the zero tile, any tracked tile may step onto any
/// adjacent unmapped cell.
pub(super) fn for_each_successor(aux: &IndexAux, idx: &Index, f: &mut dyn FnMut(Index)) {
    let mut p = aux.invert_index(idx);

    if aux.has_zero() {
        let ts = aux.tileset();
        let info = aux.maprank_info(idx.maprank);
        for zero_cell in info.class_members(idx.eqidx) {
            p.swap_cells(p.zero_location(), zero_cell);
            for &dst in neighbors(zero_cell) {
                let tile = p.tile_at(dst);
                if tile == 0 || !ts.has(tile) {
                    continue;
                }
                p.do_move(dst);
                f(aux.compute_index(&p));
                p.do_move(zero_cell);
            }
        }
    } else {
        let map = aux.tile_map(&p);
        for tile in aux.nonzero_tileset().iter() {
            let from = p.tile_location(tile);
            for &dst in neighbors(from) {
                if map.has(dst) {
                    continue;
                }
                p.swap_cells(from, dst);
                f(aux.compute_index(&p));
                p.swap_cells(dst, from);
            }
        }
    }
}

/// Iterate every index of one maprank table.
fn for_each_index_in_table(aux: &IndexAux, maprank: u32, f: &mut dyn FnMut(Index, u64)) {
    let base = aux.table_offset(maprank);
    let n_perm = aux.n_perm() as u64;
    let classes = if aux.has_zero() {
        aux.maprank_info(maprank).n_eqclass as i32
    } else {
        1
    };
    for class in 0..classes {
        let eqidx = if aux.has_zero() { class } else { -1 };
        for pidx in 0..n_perm {
            let idx = Index {
                maprank,
                pidx: pidx as u32,
                eqidx,
            };
            f(idx, base + class as u64 * n_perm + pidx);
        }
    }
}

impl PatternDb {
    /// Fill the database with exact distances by parallel breadth-first
    /// expansion from the solved configuration.
    pub fn generate(&self, driver: &ParallelDriver) -> Result<GenerationStats, Error> {
        let cells = self.cells()?;
        self.clear()?;

        let aux = self.aux();
        let solved = aux.solved_index();
        cells[aux.entry_offset(&solved) as usize].store(0, Ordering::Relaxed);

        let mut round: u32 = 0;
        loop {
            if round + 1 >= UNREACHED as u32 {
                // 254 is the largest storable distance; no abstraction of
                // this puzzle family gets close.
                return Err(Error::Verify {
                    reason: "abstract diameter exceeds the byte encoding".to_string(),
                });
            }
            let updated = AtomicU64::new(0);
            driver.run(aux.n_maprank() as usize, |range| {
                let mut local = 0u64;
                for maprank in range {
                    for_each_index_in_table(aux, maprank as u32, &mut |idx, offset| {
                        if load_relaxed(cells, offset) != round as u8 {
                            return;
                        }
                        for_each_successor(aux, &idx, &mut |succ| {
                            let dst = aux.entry_offset(&succ);
                            if set_if_unreached(cells, dst, (round + 1) as u8) {
                                local += 1;
                            }
                        });
                    });
                }
                updated.fetch_add(local, Ordering::Relaxed);
            });

            let fresh = updated.load(Ordering::Relaxed);
            if fresh == 0 {
                break;
            }
            round += 1;
            log::info!(
                target: "puzzle24::pdb",
                "tileset {}: round {round}, {fresh} new entries",
                aux.tileset()
            );
        }

        let histogram = self.histogram();
        Ok(GenerationStats {
            rounds: round,
            histogram: histogram.to_vec(),
        })
    }

    /// Check the breadth-first laws over the whole store: a single zero cell
    /// (the solved state), no `UNREACHED` cells, and every cell at distance
    /// `d > 0` one move away from some cell at `d - 1`.
    pub fn verify(&self, driver: &ParallelDriver) -> Result<(), Error> {
        let aux = self.aux();
        let bytes = self.bytes();
        let solved_offset = aux.entry_offset(&aux.solved_index());
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        driver.run(aux.n_maprank() as usize, |range| {
            let mut report = |reason: String| {
                let mut slot = first_error.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(Error::Verify { reason });
                }
            };
            for maprank in range {
                if first_error.lock().unwrap().is_some() {
                    return;
                }
                for_each_index_in_table(aux, maprank as u32, &mut |idx, offset| {
                    let value = bytes[offset as usize];
                    match value {
                        UNREACHED => report(format!("cell {idx} was never reached")),
                        0 => {
                            if offset != solved_offset {
                                report(format!("cell {idx} is 0 but not the solved state"));
                            }
                        }
                        d => {
                            let mut ok = false;
                            for_each_successor(aux, &idx, &mut |succ| {
                                let v = bytes[aux.entry_offset(&succ) as usize];
                                ok |= v == d - 1;
                            });
                            if !ok {
                                report(format!(
                                    "cell {idx} at {d} has no predecessor at {}",
                                    d - 1
                                ));
                            }
                        }
                    }
                });
            }
        });

        match first_error.into_inner().unwrap() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Distribution of stored values, `UNREACHED` included.
    pub fn histogram(&self) -> [u64; 256] {
        let mut counts = [0u64; 256];
        for &b in self.bytes() {
            counts[b as usize] += 1;
        }
        counts
    }

    /// Collapse every distance to its residue mod 16, the information the
    /// bit-packed form keeps. A reduced database only supports differential
    /// lookups; full lookups become meaningless.
    pub fn reduce(&self) -> Result<(), Error> {
        let cells = self.cells()?;
        for cell in cells {
            let v = cell.load(Ordering::Relaxed);
            if v != UNREACHED {
                cell.store(v % 16, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Fold a zero-aware database into plain-geometry tables: each
    /// (maprank, pidx) cell receives the minimum distance over the blank's
    /// equivalence classes, with the class attaining it recorded in the top
    /// two bits. The low six bits stay admissible for plain lookups.
    pub fn identify(&self) -> Result<PatternDb, Error> {
        let aux = self.aux();
        if !aux.has_zero() {
            return Err(Error::usage(
                "identify needs a database that accounts for the zero tile",
            ));
        }

        let out = PatternDb::allocate(aux.tileset().remove(0))?;
        let out_cells = out.cells()?;
        let bytes = self.bytes();
        let n_perm = aux.n_perm() as u64;

        for maprank in 0..aux.n_maprank() {
            let info = aux.maprank_info(maprank);
            if info.n_eqclass > 4 {
                return Err(Error::usage(format!(
                    "identify supports at most 4 equivalence classes, maprank {maprank} has {}",
                    info.n_eqclass
                )));
            }
            let base = aux.table_offset(maprank);
            let out_base = out.aux().table_offset(maprank);
            for pidx in 0..n_perm {
                let mut best = UNREACHED;
                let mut best_class = 0u8;
                for class in 0..info.n_eqclass {
                    let v = bytes[(base + class as u64 * n_perm + pidx) as usize];
                    if v < best {
                        best = v;
                        best_class = class;
                    }
                }
                if best >= 64 {
                    return Err(Error::Verify {
                        reason: format!(
                            "identify cannot pack distance {best} into six bits"
                        ),
                    });
                }
                out_cells[(out_base + pidx) as usize]
                    .store(best | (best_class << 6), Ordering::Relaxed);
            }
        }

        Ok(out)
    }
}
