use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use puzzle24::catalogue::{Catalogue, PartialHvals};
use puzzle24::core::puzzle::{neighbors, Puzzle};
use puzzle24::core::tileset::TileSet;
use puzzle24::error::Error;
use puzzle24::heuristic::{full_pdb_file_size, open_heuristic, HeuristicOptions};
use puzzle24::parallel::ParallelDriver;
use puzzle24::search::fsm::Fsm;
use puzzle24::search::ida::{IdaSolver, SolveResult};

fn unique_temp_dir(name: &str) -> PathBuf {
    let base = std::env::temp_dir().join("puzzle24_tests").join(name);
    let _ = fs::create_dir_all(&base);

    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for i in 0..1000u32 {
        let p = base.join(format!("{pid}-{nanos}-{i}"));
        if fs::create_dir(&p).is_ok() {
            return p;
        }
    }

    panic!(
        "failed to create a unique temp dir under {}",
        base.display()
    );
}

fn create_options() -> HeuristicOptions {
    HeuristicOptions {
        create: true,
        ..HeuristicOptions::default()
    }
}

/// A small catalogue over cheap tilesets, built fresh in `dir`.
fn small_catalogue(dir: &PathBuf, type_str: &str) -> Catalogue {
    let cat_path = dir.join("test.cat");
    fs::write(
        &cat_path,
        "# two additive groups and a lone database\n\
         01,02+03,04\n\
         05,06\n",
    )
    .unwrap();
    let driver = ParallelDriver::new(2).unwrap();
    Catalogue::load(&cat_path, Some(dir.as_path()), type_str, &create_options(), &driver).unwrap()
}

fn solved_after(moves: &[u8]) -> Puzzle {
    let mut p = Puzzle::solved();
    p.apply_moves(moves);
    p
}

fn solve_len(cat: &Catalogue, fsm: &Fsm, p: &Puzzle) -> usize {
    match IdaSolver::new(cat, fsm).solve(p).unwrap() {
        SolveResult::Solved(outcome) => {
            // The reported path must actually solve the puzzle.
            let mut check = *p;
            check.apply_moves(&outcome.path);
            assert!(check.is_solved());
            outcome.path.len()
        }
        SolveResult::Unsolvable => panic!("solvable puzzle reported unsolvable"),
    }
}

/// True distances for every configuration within `depth` moves of solved.
fn bfs_distances(depth: u8) -> HashMap<Puzzle, u8> {
    let mut dist = HashMap::new();
    let mut frontier = vec![Puzzle::solved()];
    dist.insert(Puzzle::solved(), 0u8);
    for d in 0..depth {
        let mut next = Vec::new();
        for p in frontier {
            for &dst in neighbors(p.zero_location()) {
                let mut q = p;
                q.do_move(dst);
                if !dist.contains_key(&q) {
                    dist.insert(q, d + 1);
                    next.push(q);
                }
            }
        }
        frontier = next;
    }
    dist
}

#[test]
fn catalogue_loads_groups_and_dedupes() {
    let dir = unique_temp_dir("catalogue_load");
    let cat_path = dir.join("dup.cat");
    fs::write(&cat_path, "01,02\n01,02+03,04\n").unwrap();
    let driver = ParallelDriver::new(1).unwrap();
    let cat = Catalogue::load(&cat_path, Some(dir.as_path()), "pdb", &create_options(), &driver)
        .unwrap();
    assert_eq!(cat.n_heuristics(), 2);
    // {1,2} is shared between the groups.
    assert_eq!(cat.n_pdbs(), 2);
}

#[test]
fn solved_puzzle_needs_no_moves() {
    let dir = unique_temp_dir("solved");
    let cat = small_catalogue(&dir, "pdb");
    let fsm = Fsm::simple();
    assert_eq!(solve_len(&cat, &fsm, &Puzzle::solved()), 0);
}

#[test]
fn undone_move_is_still_solved() {
    let dir = unique_temp_dir("undone");
    let cat = small_catalogue(&dir, "pdb");
    // Blank down and straight back up: the configuration is the goal again,
    // so both pruners must report length 0.
    let p = solved_after(&[5, 0]);
    assert_eq!(solve_len(&cat, &Fsm::simple(), &p), 0);
    assert_eq!(solve_len(&cat, &Fsm::dummy(), &p), 0);
}

#[test]
fn scrambles_solve_within_the_scramble_length() {
    let dir = unique_temp_dir("scrambles");
    let cat = small_catalogue(&dir, "pdb");
    let fsm = Fsm::simple();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..5 {
        let moves: Vec<u8> = {
            let mut p = Puzzle::solved();
            (0..30)
                .map(|_| {
                    let options = neighbors(p.zero_location());
                    let dst = options[rng.gen_range(0..options.len())];
                    p.do_move(dst);
                    dst
                })
                .collect()
        };
        let p = solved_after(&moves);
        assert!(solve_len(&cat, &fsm, &p) <= 30);
    }
}

#[test]
fn search_is_optimal_against_breadth_first_distances() {
    let dir = unique_temp_dir("optimal");
    let cat = small_catalogue(&dir, "pdb");
    let fsm = Fsm::simple();
    let dist = bfs_distances(6);

    let mut rng = StdRng::seed_from_u64(17);
    let all: Vec<(&Puzzle, &u8)> = dist.iter().collect();
    for _ in 0..40 {
        let (p, &d) = all[rng.gen_range(0..all.len())];
        assert_eq!(solve_len(&cat, &fsm, p), d as usize, "at\n{p}");
    }
}

#[test]
fn pruners_agree_on_optimal_lengths() {
    let dir = unique_temp_dir("pruners");
    let cat = small_catalogue(&dir, "pdb");
    let mut rng = StdRng::seed_from_u64(29);
    for _ in 0..10 {
        let p = {
            let mut q = Puzzle::solved();
            for _ in 0..rng.gen_range(0..10) {
                let options = neighbors(q.zero_location());
                q.do_move(options[rng.gen_range(0..options.len())]);
            }
            q
        };
        assert_eq!(
            solve_len(&cat, &Fsm::simple(), &p),
            solve_len(&cat, &Fsm::dummy(), &p)
        );
    }
}

#[test]
fn unsolvable_configurations_are_detected() {
    let dir = unique_temp_dir("unsolvable");
    let cat = small_catalogue(&dir, "pdb");
    let fsm = Fsm::simple();

    // Swap two adjacent tiles of the goal: unreachable by legal moves.
    let mut grid: Vec<u8> = (0..25).collect();
    grid.swap(1, 2);
    let p = Puzzle::from_grid(&grid).unwrap();
    match IdaSolver::new(&cat, &fsm).solve(&p).unwrap() {
        SolveResult::Unsolvable => {}
        SolveResult::Solved(_) => panic!("unsolvable puzzle reported solved"),
    }
}

#[test]
fn differential_updates_match_full_lookups() {
    let dir = unique_temp_dir("differential");
    let cat = small_catalogue(&dir, "bpdb");
    let mut rng = StdRng::seed_from_u64(43);

    let mut p = Puzzle::solved();
    let mut ph = PartialHvals::default();
    cat.partial_hvals(&mut ph, &p).unwrap();

    for _ in 0..200 {
        let options = neighbors(p.zero_location());
        let dst = options[rng.gen_range(0..options.len())];
        let moved_tile = p.tile_at(dst);
        p.do_move(dst);

        let diff_h = cat.diff_hvals(&mut ph, &p, moved_tile);

        let mut fresh = PartialHvals::default();
        let full_h = cat.partial_hvals(&mut fresh, &p).unwrap();
        assert_eq!(diff_h, full_h);
        for i in 0..cat.n_pdbs() {
            assert_eq!(ph.value(i), fresh.value(i));
        }
    }
}

#[test]
fn blank_aware_catalogue_solves_optimally() {
    let dir = unique_temp_dir("zpdb_cat");
    let cat_path = dir.join("z.cat");
    fs::write(&cat_path, "01,02\n05,06\n").unwrap();
    let driver = ParallelDriver::new(2).unwrap();
    let cat = Catalogue::load(&cat_path, Some(dir.as_path()), "zpdb", &create_options(), &driver)
        .unwrap();

    let fsm = Fsm::simple();
    let dist = bfs_distances(5);
    let mut rng = StdRng::seed_from_u64(53);
    let all: Vec<(&Puzzle, &u8)> = dist.iter().collect();
    for _ in 0..20 {
        let (p, &d) = all[rng.gen_range(0..all.len())];
        assert_eq!(solve_len(&cat, &fsm, p), d as usize);
    }
}

#[test]
fn loader_honours_create_and_reports_not_found() {
    let dir = unique_temp_dir("loader");
    let driver = ParallelDriver::new(1).unwrap();
    let ts = TileSet::parse_list("01,02").unwrap();

    // Missing file without create.
    match open_heuristic(
        Some(dir.as_path()),
        ts,
        "pdb",
        &HeuristicOptions::default(),
        &driver,
    ) {
        Err(Error::NotFound { .. }) => {}
        Err(e) => panic!("expected NotFound, got {e}"),
        Ok(_) => panic!("expected NotFound, got a heuristic"),
    }

    // With create the loader builds, persists and serves the database.
    let heu = open_heuristic(Some(dir.as_path()), ts, "pdb", &create_options(), &driver).unwrap();
    assert_eq!(heu.h(&Puzzle::solved()).unwrap(), 0);
    let path = dir.join("01,02.pdb");
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        full_pdb_file_size(ts).unwrap()
    );

    // Now the file exists, a plain open succeeds too.
    open_heuristic(
        Some(dir.as_path()),
        ts,
        "pdb",
        &HeuristicOptions::default(),
        &driver,
    )
    .unwrap();

    // Unknown type strings are a usage error, not a miss.
    match open_heuristic(Some(dir.as_path()), ts, "qpdb", &create_options(), &driver) {
        Err(Error::Usage { .. }) => {}
        Err(e) => panic!("expected Usage, got {e}"),
        Ok(_) => panic!("expected Usage, got a heuristic"),
    }
}

#[test]
fn loader_accepts_similar_representations() {
    let dir = unique_temp_dir("similar");
    let driver = ParallelDriver::new(1).unwrap();
    let ts = TileSet::parse_list("01,02").unwrap();

    // Persist only the bit-packed form.
    open_heuristic(Some(dir.as_path()), ts, "bpdb", &create_options(), &driver).unwrap();
    assert!(dir.join("01,02.bpdb").exists());
    assert!(!dir.join("01,02.pdb").exists());

    // A full-table request misses unless similar forms are accepted.
    match open_heuristic(
        Some(dir.as_path()),
        ts,
        "pdb",
        &HeuristicOptions::default(),
        &driver,
    ) {
        Err(Error::NotFound { .. }) => {}
        Err(e) => panic!("expected NotFound, got {e}"),
        Ok(_) => panic!("expected NotFound, got a heuristic"),
    }

    let opts = HeuristicOptions {
        accept_similar: true,
        ..HeuristicOptions::default()
    };
    let heu = open_heuristic(Some(dir.as_path()), ts, "pdb", &opts, &driver).unwrap();
    assert_eq!(heu.h(&Puzzle::solved()).unwrap(), 0);
}

#[test]
fn symmetric_tilesets_share_one_file() {
    let dir = unique_temp_dir("morph");
    let driver = ParallelDriver::new(1).unwrap();

    // {5} folds onto {1} under the main-diagonal transposition.
    let five = TileSet::parse_list("05").unwrap();
    let one = TileSet::parse_list("01").unwrap();
    open_heuristic(Some(dir.as_path()), five, "pdb", &create_options(), &driver).unwrap();
    assert!(dir.join("01.pdb").exists());
    assert!(!dir.join("05.pdb").exists());

    // The folded file satisfies the other request without creating.
    let heu = open_heuristic(
        Some(dir.as_path()),
        one,
        "pdb",
        &HeuristicOptions::default(),
        &driver,
    )
    .unwrap();
    assert_eq!(heu.h(&Puzzle::solved()).unwrap(), 0);

    // Morphed lookups still track the right tile: move tile 5 away from
    // home and the {5} heuristic must notice.
    let morphed = open_heuristic(
        Some(dir.as_path()),
        five,
        "pdb",
        &HeuristicOptions::default(),
        &driver,
    )
    .unwrap();
    let mut p = Puzzle::solved();
    p.apply_moves(&[5, 10]);
    assert!(morphed.h(&p).unwrap() > 0);
    assert_eq!(heu.h(&p).unwrap(), 0);
}
