//! # puzzle24
//!
//! A solver for the 24-puzzle (5×5 sliding tiles) built around additive
//! pattern database heuristics and IDA* search.
//!
//! ## Architecture
//!
//! The codebase is structured as layered components:
//!
//! - [`core`]: allocation-free primitives ([`core::tileset::TileSet`],
//!   [`core::puzzle::Puzzle`], subset ranking, grid symmetries).
//! - [`index`]: the bijection between partial configurations and dense
//!   integers, which is what lets a database live in a flat byte array.
//! - [`pdb`]: pattern databases: parallel breadth-first generation,
//!   verification, the headerless on-disk format (owned or memory-mapped),
//!   and the 4-bit packed representation.
//! - [`parallel`]: the chunked-range thread-pool primitive generation runs
//!   on.
//! - [`heuristic`]: resolving databases on disk by tileset and type string,
//!   with canonical symmetry folding and an optional build-on-miss.
//! - [`catalogue`]: composing many databases into one admissible heuristic
//!   (sums within groups, maximum across groups) with differential updates.
//! - [`search`]: the IDA* driver and the finite-state move pruner.
//!
//! ## Quick start
//!
//! ```no_run
//! use puzzle24::catalogue::Catalogue;
//! use puzzle24::core::puzzle::Puzzle;
//! use puzzle24::heuristic::HeuristicOptions;
//! use puzzle24::parallel::ParallelDriver;
//! use puzzle24::search::fsm::Fsm;
//! use puzzle24::search::ida::IdaSolver;
//! use std::path::Path;
//!
//! let driver = ParallelDriver::single_threaded();
//! let opts = HeuristicOptions { create: true, ..HeuristicOptions::default() };
//! let cat = Catalogue::load(
//!     Path::new("catalogue.cat"),
//!     Some(Path::new("pdbs")),
//!     "pdb",
//!     &opts,
//!     &driver,
//! ).unwrap();
//!
//! let mut p = Puzzle::solved();
//! p.apply_moves(&[5, 6]);
//! let fsm = Fsm::simple();
//! let result = IdaSolver::new(&cat, &fsm).solve(&p).unwrap();
//! ```

pub mod catalogue;
pub mod core;
pub mod error;
pub mod heuristic;
pub mod index;
pub mod parallel;
pub mod pdb;
pub mod search;

pub use error::Error;
