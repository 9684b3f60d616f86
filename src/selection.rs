//! Random next-file selection with the pool-wide no-immediate-repeat rule.

use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, RngExt, SeedableRng};

/// Creates the pool's selection rng from an OS-sourced seed.
///
/// StdRng instead of ThreadRng so the rng can live inside the pool and move
/// across the manager thread boundary.
pub fn new_selection_rng() -> StdRng {
    let mut seed = [0u8; 32];
    getrandom::fill(&mut seed).expect("Failed to generate random seed");
    StdRng::from_seed(seed)
}

/// Picks a uniformly random catalog member that is not currently assigned
/// elsewhere.
///
/// When every file is excluded (pool size at or above catalog size), falls
/// back to a uniform draw over the full catalog: the no-repeat rule is
/// best-effort and degrades rather than stalling, so in small catalogs the
/// same file can legitimately end up in two slots at once. Returns `None`
/// only for an empty catalog.
pub fn choose_next<'a>(
    catalog: &'a [PathBuf],
    excluded: &[PathBuf],
    rng: &mut StdRng,
) -> Option<&'a Path> {
    if catalog.is_empty() {
        return None;
    }

    let candidates: Vec<&PathBuf> = catalog
        .iter()
        .filter(|file| !excluded.contains(*file))
        .collect();
    if candidates.is_empty() {
        let index = rng.random_range(0..catalog.len());
        return Some(catalog[index].as_path());
    }

    let index = rng.random_range(0..candidates.len());
    Some(candidates[index].as_path())
}
