use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use puzzle24::core::puzzle::{neighbors, Puzzle};
use puzzle24::core::rank::{combination_count, rank, unrank};
use puzzle24::core::symmetry::{canonical_automorphism, morph};
use puzzle24::core::tileset::TileSet;
use puzzle24::index::IndexAux;

fn random_moves(rng: &mut StdRng, p: &mut Puzzle, count: usize) {
    for _ in 0..count {
        let options = neighbors(p.zero_location());
        let dst = options[rng.gen_range(0..options.len())];
        p.do_move(dst);
    }
}

fn random_tileset(rng: &mut StdRng, tiles: usize, with_zero: bool) -> TileSet {
    let mut ts = if with_zero {
        TileSet::EMPTY.add(0)
    } else {
        TileSet::EMPTY
    };
    while ts.count() < tiles as u32 + with_zero as u32 {
        ts = ts.add(rng.gen_range(1..25));
    }
    ts
}

#[test]
fn rank_unrank_round_trips_on_random_masks() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2000 {
        let k = rng.gen_range(0..=12);
        let mut map = TileSet::EMPTY;
        while map.count() < k {
            map = map.add(rng.gen_range(0..25));
        }
        let r = rank(map);
        assert!(r < combination_count(k));
        assert_eq!(unrank(k, r), map);
    }
}

#[test]
fn index_round_trips_for_random_configurations() {
    let mut rng = StdRng::seed_from_u64(99);
    for case in 0..300 {
        let with_zero = case % 2 == 0;
        let tiles = rng.gen_range(1..=4);
        let ts = random_tileset(&mut rng, tiles, with_zero);
        let aux = IndexAux::new(ts).unwrap();

        let mut p = Puzzle::solved();
        let walk = rng.gen_range(0..80);
        random_moves(&mut rng, &mut p, walk);

        let idx = aux.compute_index(&p);
        assert!(idx.maprank < aux.n_maprank());
        assert!(idx.pidx < aux.n_perm());
        if with_zero {
            let classes = aux.maprank_info(idx.maprank).n_eqclass as i32;
            assert!(idx.eqidx >= 0 && idx.eqidx < classes);
        } else {
            assert_eq!(idx.eqidx, -1);
        }

        // The representative must land in the same abstract state.
        let repr = aux.invert_index(&idx);
        assert_eq!(aux.compute_index(&repr), idx);

        // And the representative agrees with the original on every tracked
        // tile (the blank up to its equivalence class).
        for tile in ts.iter().filter(|&t| t != 0) {
            assert_eq!(repr.tile_location(tile), p.tile_location(tile));
        }
        if with_zero {
            let info = aux.maprank_info(idx.maprank);
            let class_of = |cell: u8| info.eqclasses[cell as usize];
            assert_eq!(class_of(repr.zero_location()), class_of(p.zero_location()));
        }
    }
}

#[test]
fn entry_offsets_stay_dense_and_distinct() {
    let aux = IndexAux::new(TileSet::parse_list("0,01,02").unwrap()).unwrap();
    let mut seen = vec![false; aux.total_entries() as usize];
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let mut p = Puzzle::solved();
        let walk = rng.gen_range(0..60);
        random_moves(&mut rng, &mut p, walk);
        let offset = aux.entry_offset(&aux.compute_index(&p)) as usize;
        assert!(offset < seen.len());
        seen[offset] = true;
    }
    // Not all cells get hit by 500 walks, but plenty must be.
    assert!(seen.iter().filter(|&&s| s).count() > 50);
}

#[test]
fn canonical_automorphism_folds_symmetric_requests_together() {
    // {5} is the transpose image of {1}; both must name the same file.
    let a = TileSet::parse_list("05").unwrap();
    let b = TileSet::parse_list("01").unwrap();
    let fa = morph(a, canonical_automorphism(a));
    let fb = morph(b, canonical_automorphism(b));
    assert_eq!(fa.list_string(), fb.list_string());
    assert_eq!(fa.list_string(), "01");
}

#[test]
fn file_size_arithmetic_matches_the_tileset() {
    // C(25, 6) × 6! bytes for a six-tile database.
    let ts = TileSet::parse_list("01,02,03,06,07,08").unwrap();
    let aux = IndexAux::new(ts).unwrap();
    assert_eq!(aux.total_entries(), 177_100 * 720);
}
