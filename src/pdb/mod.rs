//! Pattern databases: exact abstract distances in a flat byte array.
//!
//! A database owns one byte per abstract state, addressed through
//! [`IndexAux::entry_offset`]. Tables are concatenated in ascending maprank
//! order, which is also the headerless on-disk format: the file length is
//! fully determined by the tileset, so opening a file is validated by size
//! alone.
//!
//! The backing memory is either an owned allocation (for generation) or a
//! mapping of the on-disk file. Cells are individually atomic so generation
//! workers may race on them; all accesses are relaxed, see
//! [`generate`](mod@crate::pdb::generate).

pub mod bitpdb;
mod generate;

pub use generate::GenerationStats;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::core::puzzle::Puzzle;
use crate::core::tileset::TileSet;
use crate::error::Error;
use crate::index::{Index, IndexAux};

/// Sentinel for a cell no breadth-first round has reached yet.
pub const UNREACHED: u8 = u8::MAX;

/// How to map a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Shared read-only mapping; lookups only.
    ReadOnly,
    /// Private copy-on-write mapping; writable without touching the file.
    Private,
    /// Shared writable mapping, for regenerating in place.
    Shared,
}

enum Backing {
    Owned(Box<[AtomicU8]>),
    Mapped(Mmap),
    MappedMut(MmapMut),
}

pub struct PatternDb {
    aux: IndexAux,
    backing: Backing,
}

impl PatternDb {
    /// Allocate an owned database with every cell `UNREACHED`.
    pub fn allocate(ts: TileSet) -> Result<PatternDb, Error> {
        let aux = IndexAux::new(ts)?;
        let entries = usize::try_from(aux.total_entries()).map_err(|_| Error::Resource {
            stage: "pdb_allocate",
            structure: "entry table",
        })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(entries)
            .map_err(|_| Error::Resource {
                stage: "pdb_allocate",
                structure: "entry table",
            })?;
        cells.extend((0..entries).map(|_| AtomicU8::new(UNREACHED)));
        Ok(PatternDb {
            aux,
            backing: Backing::Owned(cells.into_boxed_slice()),
        })
    }

    /// Map an existing database file. The file length must match the
    /// tileset exactly.
    pub fn mmap(ts: TileSet, path: &Path, mode: MapMode) -> Result<PatternDb, Error> {
        let aux = IndexAux::new(ts)?;
        // Only a shared mapping writes through to the file.
        let file = open_checked(path, &aux, mode == MapMode::Shared)?;
        let backing = match mode {
            // Mapping a file whose length we just validated; the usual mmap
            // caveat (truncation by another process) applies.
            MapMode::ReadOnly => Backing::Mapped(unsafe {
                MmapOptions::new()
                    .map(&file)
                    .map_err(|e| Error::io("pdb_mmap", path, e))?
            }),
            MapMode::Private => Backing::MappedMut(unsafe {
                MmapOptions::new()
                    .map_copy(&file)
                    .map_err(|e| Error::io("pdb_mmap", path, e))?
            }),
            MapMode::Shared => Backing::MappedMut(unsafe {
                MmapOptions::new()
                    .map_mut(&file)
                    .map_err(|e| Error::io("pdb_mmap", path, e))?
            }),
        };
        Ok(PatternDb { aux, backing })
    }

    /// Read a database file into owned memory.
    pub fn load(ts: TileSet, path: &Path) -> Result<PatternDb, Error> {
        let aux = IndexAux::new(ts)?;
        let mut file = open_checked(path, &aux, false)?;
        let entries = aux.total_entries() as usize;
        let mut raw = Vec::new();
        raw.try_reserve_exact(entries).map_err(|_| Error::Resource {
            stage: "pdb_load",
            structure: "entry table",
        })?;
        file.read_to_end(&mut raw)
            .map_err(|e| Error::io("pdb_load", path, e))?;
        if raw.len() != entries {
            return Err(Error::Malformed {
                path: path.display().to_string(),
                expected: entries as u64,
                actual: raw.len() as u64,
            });
        }
        let cells = raw.into_iter().map(AtomicU8::new).collect::<Box<[_]>>();
        Ok(PatternDb {
            aux,
            backing: Backing::Owned(cells),
        })
    }

    /// Write all tables to `path` in storage order.
    pub fn store(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::io("pdb_store", path, e))?;
        let mut w = BufWriter::new(file);
        w.write_all(self.bytes())
            .map_err(|e| Error::io("pdb_store", path, e))?;
        w.flush().map_err(|e| Error::io("pdb_store", path, e))
    }

    #[inline]
    pub fn aux(&self) -> &IndexAux {
        &self.aux
    }

    #[inline]
    pub fn tileset(&self) -> TileSet {
        self.aux.tileset()
    }

    /// Whether the backing memory accepts writes.
    #[inline]
    pub fn writable(&self) -> bool {
        !matches!(self.backing, Backing::Mapped(_))
    }

    /// Distance stored for `idx`, `UNREACHED` if the cell was never filled.
    #[inline]
    pub fn lookup(&self, idx: &Index) -> u8 {
        self.bytes()[self.aux.entry_offset(idx) as usize]
    }

    /// Abstract `p` and look its cell up.
    #[inline]
    pub fn lookup_puzzle(&self, p: &Puzzle) -> u8 {
        self.lookup(&self.aux.compute_index(p))
    }

    /// Reset every cell to `UNREACHED`. Requires writable backing.
    pub fn clear(&self) -> Result<(), Error> {
        let cells = self.cells()?;
        for cell in cells {
            cell.store(UNREACHED, Ordering::Relaxed);
        }
        Ok(())
    }

    /// The whole store as plain bytes (the on-disk image).
    ///
    /// Reading through this view while generation workers write is not
    /// allowed; use the atomic accessors inside generation.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            // An AtomicU8 slice has the layout of its bytes.
            Backing::Owned(cells) => unsafe {
                std::slice::from_raw_parts(cells.as_ptr().cast::<u8>(), cells.len())
            },
            Backing::Mapped(map) => map,
            Backing::MappedMut(map) => map,
        }
    }

    /// Atomic view of the cells; fails on a read-only mapping.
    #[inline]
    pub(crate) fn cells(&self) -> Result<&[AtomicU8], Error> {
        match &self.backing {
            Backing::Owned(cells) => Ok(cells),
            // A writable mapping aliases cleanly as atomic bytes.
            Backing::MappedMut(map) => Ok(unsafe {
                std::slice::from_raw_parts(map.as_ptr().cast::<AtomicU8>(), map.len())
            }),
            Backing::Mapped(_) => Err(Error::usage(
                "operation needs a writable database, this one is mapped read-only",
            )),
        }
    }
}

#[inline]
pub(crate) fn load_relaxed(cells: &[AtomicU8], offset: u64) -> u8 {
    cells[offset as usize].load(Ordering::Relaxed)
}

/// Publish `value` into an untouched cell. Relaxed ordering is enough:
/// racing writers of the same round write the same value, and rounds are
/// separated by the driver's join barrier.
#[inline]
pub(crate) fn set_if_unreached(cells: &[AtomicU8], offset: u64, value: u8) -> bool {
    cells[offset as usize]
        .compare_exchange(UNREACHED, value, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
}

fn open_checked(path: &Path, aux: &IndexAux, write: bool) -> Result<File, Error> {
    let file = OpenOptions::new()
        .read(true)
        .write(write)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::io("pdb_open", path, e)
            }
        })?;
    let len = file
        .metadata()
        .map_err(|e| Error::io("pdb_open", path, e))?
        .len();
    if len != aux.total_entries() {
        return Err(Error::Malformed {
            path: path.display().to_string(),
            expected: aux.total_entries(),
            actual: len,
        });
    }
    Ok(file)
}
