//! Finite-state move pruning.
//!
//! A pruner is a deterministic automaton walked alongside the search: one
//! transition table per blank cell, one row per state, one column per move
//! direction (in the ascending up, left, right, down order of
//! [`neighbors`]). A transition into [`FSM_MATCH`] marks the move sequence
//! as redundant (some shorter sequence reaches the same configuration), so
//! the search skips that branch.
//!
//! Two machines are built in: [`Fsm::dummy`] admits everything and
//! [`Fsm::simple`] rejects immediate move reversals. Richer machines come
//! from files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::core::puzzle::{neighbors, GRID_WIDTH, TILE_COUNT};
use crate::error::Error;

/// Every table's starting state.
pub const FSM_BEGIN: u32 = 0;
/// Transition target marking the move sequence as redundant.
pub const FSM_MATCH: u32 = u32::MAX;
/// Filler for transitions that cannot be taken (illegal direction at this
/// cell, or a row that no move sequence can reach).
pub const FSM_UNASSIGNED: u32 = u32::MAX - 1;

pub struct Fsm {
    /// `tables[cell]` holds the states used while the blank is on `cell`;
    /// transition values are row numbers in the destination cell's table.
    tables: Vec<Vec<[u32; 4]>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Left,
    Right,
    Down,
}

impl Direction {
    fn between(from: u8, to: u8) -> Direction {
        match to as i32 - from as i32 {
            d if d == -(GRID_WIDTH as i32) => Direction::Up,
            -1 => Direction::Left,
            1 => Direction::Right,
            d if d == GRID_WIDTH as i32 => Direction::Down,
            _ => unreachable!("cells are not adjacent"),
        }
    }

    fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
        }
    }

    /// State reached after moving the blank this way: 1 = came from above,
    /// 2 = from the left, 3 = from the right, 4 = from below.
    fn arrival_state(self) -> u32 {
        match self {
            Direction::Down => 1,
            Direction::Right => 2,
            Direction::Left => 3,
            Direction::Up => 4,
        }
    }

    /// Whether a blank on `cell` can have arrived from this state's side.
    fn arrival_possible(state: u32, cell: u8) -> bool {
        let row = cell / GRID_WIDTH;
        let col = cell % GRID_WIDTH;
        match state {
            1 => row > 0,
            2 => col > 0,
            3 => col + 1 < GRID_WIDTH,
            4 => row + 1 < GRID_WIDTH,
            _ => true,
        }
    }
}

impl Fsm {
    /// The trivial pruner: accepts every move sequence.
    pub fn dummy() -> Fsm {
        Fsm {
            tables: (0..TILE_COUNT).map(|_| vec![[FSM_BEGIN; 4]]).collect(),
        }
    }

    /// Rejects length-2 loops: a move straight back to where the blank just
    /// came from.
    pub fn simple() -> Fsm {
        let tables = (0..TILE_COUNT as u8)
            .map(|cell| {
                let mut rows = vec![[FSM_UNASSIGNED; 4]; 5];
                for state in 0..5u32 {
                    if !Direction::arrival_possible(state, cell) {
                        continue;
                    }
                    for (mi, &dst) in neighbors(cell).iter().enumerate() {
                        let dir = Direction::between(cell, dst);
                        rows[state as usize][mi] =
                            if state != 0 && dir.opposite().arrival_state() == state {
                                FSM_MATCH
                            } else {
                                dir.arrival_state()
                            };
                    }
                }
                rows
            })
            .collect();
        Fsm { tables }
    }

    /// Follow one transition. `cell` is the blank's cell before the move,
    /// `move_index` the column of the destination in its move list.
    #[inline]
    pub fn step(&self, cell: u8, state: u32, move_index: usize) -> u32 {
        let next = self.tables[cell as usize][state as usize][move_index];
        debug_assert!(next != FSM_UNASSIGNED, "transition out of an unreachable state");
        if next == FSM_UNASSIGNED {
            FSM_BEGIN
        } else {
            next
        }
    }

    #[inline]
    pub fn states(&self, cell: u8) -> usize {
        self.tables[cell as usize].len()
    }

    /// Read a machine from its binary file: 25 little-endian
    /// `(row count, byte offset)` pairs, then the tables as rows of four
    /// `u32` transitions.
    pub fn load(path: &Path) -> Result<Fsm, Error> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::io("fsm_load", path, e)
            }
        })?;
        let mut r = BufReader::new(file);

        let mut header = [(0u32, 0u32); TILE_COUNT];
        for entry in header.iter_mut() {
            *entry = (read_u32(&mut r, path)?, read_u32(&mut r, path)?);
        }

        // Offsets may point anywhere past the header; sharing one table
        // between cells is legal and simply loads it twice.
        let mut tables = Vec::with_capacity(TILE_COUNT);
        for &(rows, offset) in header.iter() {
            r.seek(SeekFrom::Start(offset as u64))
                .map_err(|e| Error::io("fsm_load", path, e))?;
            let mut table = Vec::new();
            table
                .try_reserve_exact(rows as usize)
                .map_err(|_| Error::Resource {
                    stage: "fsm_load",
                    structure: "state table",
                })?;
            for _ in 0..rows {
                let mut row = [0u32; 4];
                for slot in row.iter_mut() {
                    *slot = read_u32(&mut r, path)?;
                }
                table.push(row);
            }
            tables.push(table);
        }

        let fsm = Fsm { tables };
        fsm.validate(path)?;
        Ok(fsm)
    }

    /// Write the binary form read back by [`Fsm::load`].
    pub fn store(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::io("fsm_store", path, e))?;
        let mut w = BufWriter::new(file);

        let mut offset = (TILE_COUNT * 8) as u32;
        for table in &self.tables {
            write_u32(&mut w, table.len() as u32, path)?;
            write_u32(&mut w, offset, path)?;
            offset += table.len() as u32 * 16;
        }
        for table in &self.tables {
            for row in table {
                for &v in row {
                    write_u32(&mut w, v, path)?;
                }
            }
        }
        w.flush().map_err(|e| Error::io("fsm_store", path, e))
    }

    /// Every legal-move transition must reject, stay unassigned, or land on
    /// a row the destination table actually has.
    fn validate(&self, path: &Path) -> Result<(), Error> {
        for cell in 0..TILE_COUNT as u8 {
            if self.tables[cell as usize].is_empty() {
                return Err(Error::Verify {
                    reason: format!("fsm {}: cell {cell} has no states", path.display()),
                });
            }
            for (state, row) in self.tables[cell as usize].iter().enumerate() {
                for (mi, &dst) in neighbors(cell).iter().enumerate() {
                    let v = row[mi];
                    if v != FSM_MATCH
                        && v != FSM_UNASSIGNED
                        && v as usize >= self.tables[dst as usize].len()
                    {
                        return Err(Error::Verify {
                            reason: format!(
                                "fsm {}: cell {cell} state {state} move {mi} targets row {v}, \
                                 destination has {} rows",
                                path.display(),
                                self.tables[dst as usize].len()
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_u32(r: &mut impl Read, path: &Path) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|e| Error::io("fsm_load", path, e))?;
    Ok(u32::from_le_bytes(buf))
}

fn write_u32(w: &mut impl Write, v: u32, path: &Path) -> Result<(), Error> {
    w.write_all(&v.to_le_bytes())
        .map_err(|e| Error::io("fsm_store", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_rejects_exactly_the_reversal() {
        let fsm = Fsm::simple();
        // Blank on 0 moves right to 1; moving back left is the reversal.
        let state = fsm.step(0, FSM_BEGIN, 0);
        assert_ne!(state, FSM_MATCH);
        let back = crate::core::puzzle::neighbors(1)
            .iter()
            .position(|&n| n == 0)
            .unwrap();
        assert_eq!(fsm.step(1, state, back), FSM_MATCH);
        // The other moves from cell 1 stay admissible.
        for mi in 0..neighbors(1).len() {
            if mi != back {
                assert_ne!(fsm.step(1, state, mi), FSM_MATCH);
            }
        }
    }

    #[test]
    fn dummy_admits_everything() {
        let fsm = Fsm::dummy();
        for cell in 0..TILE_COUNT as u8 {
            for mi in 0..neighbors(cell).len() {
                assert_eq!(fsm.step(cell, FSM_BEGIN, mi), FSM_BEGIN);
            }
        }
    }
}
