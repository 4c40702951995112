//! Walks one address through a fresh address space: allocate, store a word,
//! load it back, print the translation and tear everything down.
//!
//! ```text
//! mmu-demo [VA] [VALUE] [GEOMETRY]
//! ```
//!
//! `VA` and `VALUE` accept `0x` hex or decimal (default `0x123456` and `42`).
//! `GEOMETRY` is one of `4K/3` (default), `4K/4`, `4K/5`, `64/2`.
//! Set `MMU_LOG` to `trace`, `debug`, `info`, `warn`, `error` or `off`.

mod logger;

use crate::logger::StderrLogger;
use log::{LevelFilter, error, info};
use mmu_addresses::{
    DefaultGeometry, PageGeometry, Pages4KLevels3, Pages4KLevels4, Pages4KLevels5, Pages64Levels2,
    VirtualAddress,
};
use mmu_alloc::{FrameArena, Vmm, VmmError};
use std::env;
use std::process::ExitCode;

const DEFAULT_VA: u64 = 0x12_3456;
const DEFAULT_VALUE: u64 = 42;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("not a number: {0:?}")]
    InvalidNumber(String),
    #[error("unknown geometry {0:?}, expected one of 4K/3, 4K/4, 4K/5, 64/2")]
    UnknownGeometry(String),
    #[error(transparent)]
    Vmm(#[from] VmmError),
    #[error("loaded {loaded:#X} after storing {stored:#X}")]
    Mismatch { stored: u64, loaded: u64 },
}

/// What a successful run observed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Outcome {
    loaded: u64,
    pages: usize,
    freed: usize,
}

fn main() -> ExitCode {
    let level = env::var("MMU_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = StderrLogger::new(level).init() {
        eprintln!("failed to install logger: {e}");
    }

    match run_from_args(env::args().skip(1)) {
        Ok(outcome) => {
            info!(
                "Round trip of {:#X} used {} pages, {} freed",
                outcome.loaded, outcome.pages, outcome.freed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_from_args(mut args: impl Iterator<Item = String>) -> Result<Outcome, DemoError> {
    let va = args.next().map_or(Ok(DEFAULT_VA), |a| parse_number(&a))?;
    let value = args.next().map_or(Ok(DEFAULT_VALUE), |a| parse_number(&a))?;
    let geometry = args
        .next()
        .unwrap_or_else(|| DefaultGeometry::as_str().to_owned());

    let va = VirtualAddress::new(va);
    match geometry.as_str() {
        g if g == Pages4KLevels3::as_str() => run::<Pages4KLevels3>(va, value),
        g if g == Pages4KLevels4::as_str() => run::<Pages4KLevels4>(va, value),
        g if g == Pages4KLevels5::as_str() => run::<Pages4KLevels5>(va, value),
        g if g == Pages64Levels2::as_str() => run::<Pages64Levels2>(va, value),
        _ => Err(DemoError::UnknownGeometry(geometry)),
    }
}

fn run<G: PageGeometry>(va: VirtualAddress, value: u64) -> Result<Outcome, DemoError> {
    let mut vmm = Vmm::<G, _>::new(FrameArena::new());

    let leaf = vmm.allocate(va)?;
    info!("Mapped {va} to leaf page {leaf}");

    vmm.store(va, value)?;
    let loaded = vmm.load(va)?;
    let pa = vmm.translate(va).ok_or(VmmError::Unmapped { va })?;

    println!("{va} -> {pa} ({} geometry)", G::as_str());
    println!("stored {value:#X}, loaded {loaded:#X}");

    let pages = vmm.address_space().page_count();
    let freed = vmm.release();
    println!("released {freed} of {pages} pages");

    if loaded != value {
        return Err(DemoError::Mismatch {
            stored: value,
            loaded,
        });
    }
    Ok(Outcome {
        loaded,
        pages,
        freed,
    })
}

fn parse_number(s: &str) -> Result<u64, DemoError> {
    let digits = s.replace('_', "");
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|_| DemoError::InvalidNumber(s.to_owned()))
}
