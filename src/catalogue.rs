//! Catalogues: many databases composed into one admissible heuristic.
//!
//! A catalogue groups databases into heuristics. Within a group the values
//! add up (the groups listed in catalogue files are tile-disjoint, which
//! keeps the sum admissible); across groups the maximum wins. During search
//! only the databases whose pattern contains the moved tile (or the blank)
//! are looked up again; the rest keep their cached partial values.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::core::puzzle::Puzzle;
use crate::core::tileset::TileSet;
use crate::error::Error;
use crate::heuristic::{open_heuristic, Heuristic, HeuristicOptions};
use crate::parallel::ParallelDriver;

/// Most databases a catalogue may hold; partial values are a fixed-size
/// array so search frames can copy them cheaply.
pub const CATALOGUE_PDBS_LEN: usize = 64;
/// Most heuristic groups a catalogue may hold.
pub const HEURISTICS_LEN: usize = 32;

pub struct Catalogue {
    pdbs: Vec<Heuristic>,
    /// One bitmap per heuristic group: which databases add up.
    parts: Vec<u64>,
}

/// Cached per-database values for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct PartialHvals {
    hvals: [u8; CATALOGUE_PDBS_LEN],
}

impl Default for PartialHvals {
    fn default() -> Self {
        PartialHvals {
            hvals: [0; CATALOGUE_PDBS_LEN],
        }
    }
}

impl PartialHvals {
    #[inline]
    pub fn value(&self, pdb: usize) -> u8 {
        self.hvals[pdb]
    }
}

impl Catalogue {
    /// Read a catalogue description: one heuristic group per line, groups
    /// written as `+`-separated tileset lists, `#` comments and blank lines
    /// ignored. Databases named by several groups are loaded once.
    pub fn load(
        cat_path: &Path,
        heudir: Option<&Path>,
        type_str: &str,
        opts: &HeuristicOptions,
        driver: &ParallelDriver,
    ) -> Result<Catalogue, Error> {
        let text = fs::read_to_string(cat_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    path: cat_path.display().to_string(),
                }
            } else {
                Error::io("catalogue_load", cat_path, e)
            }
        })?;

        let mut pdbs: Vec<Heuristic> = Vec::new();
        let mut parts: Vec<u64> = Vec::new();
        let mut by_tileset: FxHashMap<u32, usize> = FxHashMap::default();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if parts.len() == HEURISTICS_LEN {
                return Err(Error::usage(format!(
                    "{}:{}: more than {HEURISTICS_LEN} heuristics",
                    cat_path.display(),
                    lineno + 1
                )));
            }

            let mut bitmap = 0u64;
            for part in line.split('+') {
                let ts = TileSet::parse_list(part.trim()).map_err(|e| {
                    Error::usage(format!("{}:{}: {e}", cat_path.display(), lineno + 1))
                })?;
                let slot = match by_tileset.get(&ts.bits()) {
                    Some(&i) => i,
                    None => {
                        if pdbs.len() == CATALOGUE_PDBS_LEN {
                            return Err(Error::usage(format!(
                                "{}:{}: more than {CATALOGUE_PDBS_LEN} databases",
                                cat_path.display(),
                                lineno + 1
                            )));
                        }
                        let heu = open_heuristic(heudir, ts, type_str, opts, driver)?;
                        pdbs.push(heu);
                        by_tileset.insert(ts.bits(), pdbs.len() - 1);
                        pdbs.len() - 1
                    }
                };
                bitmap |= 1 << slot;
            }
            parts.push(bitmap);
        }

        log::debug!(
            target: "puzzle24::catalogue",
            "{}: {} heuristics over {} databases",
            cat_path.display(),
            parts.len(),
            pdbs.len()
        );
        Ok(Catalogue { pdbs, parts })
    }

    #[inline]
    pub fn n_pdbs(&self) -> usize {
        self.pdbs.len()
    }

    #[inline]
    pub fn n_heuristics(&self) -> usize {
        self.parts.len()
    }

    /// Look up every database and fill `ph`; returns the catalogue value.
    pub fn partial_hvals(&self, ph: &mut PartialHvals, p: &Puzzle) -> Result<u8, Error> {
        for (i, heu) in self.pdbs.iter().enumerate() {
            ph.hvals[i] = heu.h(p)?;
        }
        Ok(self.ph_hval(ph))
    }

    /// Refresh `ph` after one move of `moved_tile`, looking up only the
    /// databases whose value can have changed. This is the search hot path.
    pub fn diff_hvals(&self, ph: &mut PartialHvals, p: &Puzzle, moved_tile: u8) -> u8 {
        for (i, heu) in self.pdbs.iter().enumerate() {
            let pattern = heu.pattern();
            if pattern.has(moved_tile) || pattern.has(0) {
                ph.hvals[i] = heu.h_diff(p, ph.hvals[i]);
            }
        }
        self.ph_hval(ph)
    }

    /// Catalogue value for `p` via a throwaway partial-value buffer.
    pub fn hval(&self, p: &Puzzle) -> Result<u8, Error> {
        let mut ph = PartialHvals::default();
        self.partial_hvals(&mut ph, p)
    }

    /// The maximum over heuristic groups of the sum of their parts.
    #[inline]
    pub fn ph_hval(&self, ph: &PartialHvals) -> u8 {
        let mut best = 0u32;
        for &parts in &self.parts {
            let mut sum = 0u32;
            let mut bits = parts;
            while bits != 0 {
                sum += ph.hvals[bits.trailing_zeros() as usize] as u32;
                bits &= bits - 1;
            }
            best = best.max(sum);
        }
        best.min(u8::MAX as u32) as u8
    }
}
