//! Opening, creating and querying heuristics by tileset and type string.
//!
//! A heuristic is one database in one of its representations. The loader
//! folds the requested tileset onto its canonical symmetry image (so one
//! file on disk serves all symmetric requests), then tries, in order: an
//! exact representation match on disk, a similar representation if allowed,
//! and finally building the database from scratch if allowed.

use std::path::{Path, PathBuf};

use crate::core::puzzle::Puzzle;
use crate::core::symmetry::{canonical_automorphism, morph};
use crate::core::tileset::{TileSet, ZERO_TILE};
use crate::error::Error;
use crate::index::IndexAux;
use crate::parallel::ParallelDriver;
use crate::pdb::bitpdb::BitPdb;
use crate::pdb::{MapMode, PatternDb};

/// What the loader may do to satisfy a request.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicOptions {
    /// Build and (if a directory is given) persist missing databases.
    pub create: bool,
    /// Chat about progress at info level instead of debug.
    pub verbose: bool,
    /// Fold the tileset onto its canonical symmetry image.
    pub allow_morph: bool,
    /// Accept another representation of the requested heuristic, e.g. a
    /// bit-packed file where a full one was asked for.
    pub accept_similar: bool,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        HeuristicOptions {
            create: false,
            verbose: false,
            allow_morph: true,
            accept_similar: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Representation {
    Full,
    Identified,
    Bits,
}

impl Representation {
    fn suffix(self) -> &'static str {
        match self {
            Representation::Full => "pdb",
            Representation::Identified => "ipdb",
            Representation::Bits => "bpdb",
        }
    }
}

struct DriverSpec {
    type_str: &'static str,
    repr: Representation,
    zero_aware: bool,
    /// Only tried when the caller accepts similar representations.
    similar: bool,
}

const DRIVERS: &[DriverSpec] = &[
    DriverSpec {
        type_str: "pdb",
        repr: Representation::Full,
        zero_aware: false,
        similar: false,
    },
    DriverSpec {
        type_str: "ipdb",
        repr: Representation::Identified,
        zero_aware: false,
        similar: false,
    },
    DriverSpec {
        type_str: "zpdb",
        repr: Representation::Full,
        zero_aware: true,
        similar: false,
    },
    DriverSpec {
        type_str: "bpdb",
        repr: Representation::Bits,
        zero_aware: false,
        similar: false,
    },
    DriverSpec {
        type_str: "zbpdb",
        repr: Representation::Bits,
        zero_aware: true,
        similar: false,
    },
    DriverSpec {
        type_str: "pdb",
        repr: Representation::Bits,
        zero_aware: false,
        similar: true,
    },
    DriverSpec {
        type_str: "zpdb",
        repr: Representation::Bits,
        zero_aware: true,
        similar: true,
    },
    DriverSpec {
        type_str: "bpdb",
        repr: Representation::Full,
        zero_aware: false,
        similar: true,
    },
    DriverSpec {
        type_str: "zbpdb",
        repr: Representation::Full,
        zero_aware: true,
        similar: true,
    },
];

enum HeuristicKind {
    Full(PatternDb),
    /// Zero-aware generation folded into plain geometry; the top two bits of
    /// every entry carry the blank class, the low six the distance.
    Identified(PatternDb),
    Bits(BitPdb),
}

/// A loaded heuristic: a database plus the symmetry every query is pushed
/// through before the lookup.
pub struct Heuristic {
    kind: HeuristicKind,
    morphism: usize,
    /// Tiles the value depends on, in query coordinates. Contains the zero
    /// tile iff blank movement alone can change the value.
    pattern: TileSet,
}

impl Heuristic {
    /// Tiles whose movement can change this heuristic's value.
    #[inline]
    pub fn pattern(&self) -> TileSet {
        self.pattern
    }

    /// Heuristic value from scratch. Only the bit-packed representation can
    /// fail here, and only on a corrupt table.
    pub fn h(&self, p: &Puzzle) -> Result<u8, Error> {
        let morphed;
        let q = if self.morphism == 0 {
            p
        } else {
            morphed = p.morphed(self.morphism);
            &morphed
        };
        match &self.kind {
            HeuristicKind::Full(pdb) => Ok(pdb.lookup_puzzle(q)),
            HeuristicKind::Identified(pdb) => Ok(pdb.lookup_puzzle(q) & 0x3f),
            HeuristicKind::Bits(bits) => bits.lookup_puzzle(q),
        }
    }

    /// Heuristic value given the value before the last move. Infallible:
    /// the bit-packed representation reconstructs from the old value.
    pub fn h_diff(&self, p: &Puzzle, old_h: u8) -> u8 {
        let morphed;
        let q = if self.morphism == 0 {
            p
        } else {
            morphed = p.morphed(self.morphism);
            &morphed
        };
        match &self.kind {
            HeuristicKind::Full(pdb) => pdb.lookup_puzzle(q),
            HeuristicKind::Identified(pdb) => pdb.lookup_puzzle(q) & 0x3f,
            HeuristicKind::Bits(bits) => bits.diff_lookup(q, old_h),
        }
    }
}

/// Resolve a heuristic for `ts` of type `type_str`, searching `heudir`.
///
/// The zero tile in `ts` is ignored; whether the blank is accounted for is
/// decided by the type string alone (`zpdb`, `zbpdb`).
pub fn open_heuristic(
    heudir: Option<&Path>,
    ts: TileSet,
    type_str: &str,
    opts: &HeuristicOptions,
    driver: &ParallelDriver,
) -> Result<Heuristic, Error> {
    let ts = ts.remove(ZERO_TILE);
    let (morphism, zmorphism) = if opts.allow_morph {
        (
            canonical_automorphism(ts),
            canonical_automorphism(ts.add(ZERO_TILE)),
        )
    } else {
        (0, 0)
    };

    let mut type_match = false;

    for pass_similar in [false, true] {
        if pass_similar && !opts.accept_similar {
            break;
        }
        for spec in DRIVERS {
            if spec.similar != pass_similar || spec.type_str != type_str {
                continue;
            }
            type_match = true;
            match try_open(heudir, ts, spec, morphism, zmorphism, opts) {
                Ok(heu) => return Ok(heu),
                Err(Error::NotFound { .. }) => {}
                Err(e) => {
                    // A present-but-unusable file: remember it in the log
                    // and keep probing the remaining representations.
                    log::warn!(target: "puzzle24::heuristic", "{e}");
                }
            }
        }
    }

    if !type_match {
        return Err(Error::usage(format!("unknown heuristic type {type_str:?}")));
    }

    if opts.create {
        for spec in DRIVERS {
            if spec.similar || spec.type_str != type_str {
                continue;
            }
            return create(heudir, ts, spec, morphism, zmorphism, opts, driver);
        }
    }

    Err(Error::NotFound {
        path: format!(
            "{}/{}.{}",
            heudir.map_or_else(|| "-".to_string(), |d| d.display().to_string()),
            morph(ts, morphism).list_string(),
            type_str
        ),
    })
}

/// The morphism, on-disk tileset and query pattern a driver works with.
fn driver_tilesets(ts: TileSet, spec: &DriverSpec, morphism: usize, zmorphism: usize) -> Layout {
    if spec.zero_aware || spec.repr == Representation::Identified {
        // Blank-sensitive generation anchors cell 0, so the zero-preserving
        // morphism applies.
        let zts = morph(ts.add(ZERO_TILE), zmorphism);
        let file_ts = if spec.zero_aware {
            zts
        } else {
            zts.remove(ZERO_TILE)
        };
        Layout {
            morphism: zmorphism,
            file_ts,
            generate_ts: zts,
            pattern: if spec.zero_aware {
                ts.add(ZERO_TILE)
            } else {
                ts
            },
        }
    } else {
        let mts = morph(ts, morphism);
        Layout {
            morphism,
            file_ts: mts,
            generate_ts: mts,
            pattern: ts,
        }
    }
}

struct Layout {
    morphism: usize,
    /// Names the file and dictates its geometry.
    file_ts: TileSet,
    /// What generation allocates (includes the blank for identified PDBs).
    generate_ts: TileSet,
    /// Query-coordinate relevance set.
    pattern: TileSet,
}

fn file_path(dir: &Path, layout: &Layout, repr: Representation) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        layout.file_ts.list_string(),
        repr.suffix()
    ))
}

fn try_open(
    heudir: Option<&Path>,
    ts: TileSet,
    spec: &DriverSpec,
    morphism: usize,
    zmorphism: usize,
    opts: &HeuristicOptions,
) -> Result<Heuristic, Error> {
    let dir = heudir.ok_or(Error::NotFound {
        path: "-".to_string(),
    })?;
    let layout = driver_tilesets(ts, spec, morphism, zmorphism);
    let path = file_path(dir, &layout, spec.repr);

    let kind = match spec.repr {
        Representation::Full => {
            HeuristicKind::Full(PatternDb::mmap(layout.file_ts, &path, MapMode::ReadOnly)?)
        }
        Representation::Identified => {
            HeuristicKind::Identified(PatternDb::mmap(layout.file_ts, &path, MapMode::ReadOnly)?)
        }
        Representation::Bits => HeuristicKind::Bits(BitPdb::load(layout.file_ts, &path)?),
    };

    loader_log(opts, format_args!("loaded {}", path.display()));
    Ok(Heuristic {
        kind,
        morphism: layout.morphism,
        pattern: layout.pattern,
    })
}

fn create(
    heudir: Option<&Path>,
    ts: TileSet,
    spec: &DriverSpec,
    morphism: usize,
    zmorphism: usize,
    opts: &HeuristicOptions,
    driver: &ParallelDriver,
) -> Result<Heuristic, Error> {
    let layout = driver_tilesets(ts, spec, morphism, zmorphism);
    loader_log(
        opts,
        format_args!("creating {} for tileset {}", spec.type_str, layout.file_ts),
    );

    let pdb = PatternDb::allocate(layout.generate_ts)?;
    let stats = pdb.generate(driver)?;
    loader_log(
        opts,
        format_args!(
            "generated {} in {} rounds, max distance {}",
            layout.file_ts,
            stats.rounds,
            stats.max_distance()
        ),
    );

    let kind = match spec.repr {
        Representation::Full => HeuristicKind::Full(pdb),
        Representation::Identified => HeuristicKind::Identified(pdb.identify()?),
        Representation::Bits => HeuristicKind::Bits(BitPdb::from_pdb(&pdb)?),
    };

    // Persist if we can; a failed write leaves the in-memory heuristic
    // perfectly usable, so it only costs a warning.
    if let Some(dir) = heudir {
        let path = file_path(dir, &layout, spec.repr);
        let stored = match &kind {
            HeuristicKind::Full(pdb) | HeuristicKind::Identified(pdb) => pdb.store(&path),
            HeuristicKind::Bits(bits) => bits.store(&path),
        };
        match stored {
            Ok(()) => loader_log(opts, format_args!("wrote {}", path.display())),
            Err(e) => log::warn!(target: "puzzle24::heuristic", "{e}"),
        }
    }

    Ok(Heuristic {
        kind,
        morphism: layout.morphism,
        pattern: layout.pattern,
    })
}

fn loader_log(opts: &HeuristicOptions, message: std::fmt::Arguments<'_>) {
    if opts.verbose {
        log::info!(target: "puzzle24::heuristic", "{message}");
    } else {
        log::debug!(target: "puzzle24::heuristic", "{message}");
    }
}

/// Expected on-disk size in bytes of a full database for `ts`.
pub fn full_pdb_file_size(ts: TileSet) -> Result<u64, Error> {
    Ok(IndexAux::new(ts)?.total_entries())
}
