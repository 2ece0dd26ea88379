//! Low-level, allocation-free primitives.
//!
//! These types are intentionally compact because the indexing and search
//! layers churn through them in tight loops:
//!
//! - [`tileset`]: 25-bit sets of tile identities / grid cells.
//! - [`puzzle`]: a configuration as a pair of inverse permutations.
//! - [`rank`]: colex ranking of k-subsets, the address space of the tables.
//! - [`symmetry`]: the dihedral symmetries used to fold database files.

pub mod puzzle;
pub mod rank;
pub mod symmetry;
pub mod tileset;
