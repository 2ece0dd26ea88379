use std::path::Path;
use std::process::exit;

use puzzle24::catalogue::Catalogue;
use puzzle24::core::puzzle::Puzzle;
use puzzle24::heuristic::HeuristicOptions;
use puzzle24::parallel::ParallelDriver;
use puzzle24::search::fsm::Fsm;
use puzzle24::search::ida::{IdaSolver, SolveResult};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SolveReport {
    solvable: bool,
    length: Option<usize>,
    /// The blank's destination cells, in order.
    path: Vec<u8>,
    expanded: u64,
    bounds: Vec<u8>,
}

fn usage() -> ! {
    eprintln!(
        "Usage: solve <catalogue> <pdbdir> <type> <board> [jobs]\n\n\
         <catalogue>  heuristic groups, one per line, tileset lists joined by '+'\n\
         <pdbdir>     directory holding (or receiving) pattern database files\n\
         <type>       database type: pdb, ipdb, zpdb, bpdb, zbpdb\n\
         <board>      25 comma-separated tiles in row-major order, 0 = blank\n\
         [jobs]       worker threads for database generation (default 1)"
    );
    exit(2);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 && args.len() != 6 {
        usage();
    }

    let jobs: usize = match args.get(5) {
        None => 1,
        Some(s) => s.parse().unwrap_or_else(|_| {
            eprintln!("Bad worker count: {s}");
            exit(2);
        }),
    };

    let board: Vec<u8> = args[4]
        .split(',')
        .map(|t| {
            t.trim().parse().unwrap_or_else(|_| {
                eprintln!("Bad tile number: {t}");
                exit(2);
            })
        })
        .collect();

    let puzzle = Puzzle::from_grid(&board).unwrap_or_else(|e| {
        eprintln!("{e}");
        exit(2);
    });

    let driver = ParallelDriver::new(jobs).unwrap_or_else(|e| {
        eprintln!("{e}");
        exit(2);
    });

    let opts = HeuristicOptions {
        create: true,
        verbose: true,
        ..HeuristicOptions::default()
    };
    let catalogue = Catalogue::load(
        Path::new(&args[1]),
        Some(Path::new(&args[2])),
        &args[3],
        &opts,
        &driver,
    )
    .unwrap_or_else(|e| {
        eprintln!("{e}");
        exit(1);
    });

    let fsm = Fsm::simple();
    let solver = IdaSolver::new(&catalogue, &fsm);
    let report = match solver.solve(&puzzle) {
        Ok(SolveResult::Solved(outcome)) => SolveReport {
            solvable: true,
            length: Some(outcome.path.len()),
            path: outcome.path,
            expanded: outcome.expanded,
            bounds: outcome.bounds,
        },
        Ok(SolveResult::Unsolvable) => SolveReport {
            solvable: false,
            length: None,
            path: Vec::new(),
            expanded: 0,
            bounds: Vec::new(),
        },
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("cannot serialize report: {e}");
            exit(1);
        }
    }
}
