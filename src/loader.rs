// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::{osm, snapshot, Graph};

/// Loads a routable [Graph], preferring a [snapshot] at `cache_path` over
/// parsing the OSM `sources`.
///
/// If the snapshot is missing or corrupted, every source is ingested into
/// a fresh graph and a new snapshot is written. Sources which fail to load are
/// logged and skipped, keeping whatever the other sources contributed, but then
/// no snapshot is written. A failure to write the snapshot is logged as well.
///
/// Returns the graph, with adjacency lists already created, and whether
/// the snapshot was used.
pub fn load_graph<P: AsRef<Path>, C: AsRef<Path>>(
    sources: &[P],
    cache_path: C,
    options: &osm::Options<'_>,
) -> (Graph, bool) {
    let cache_path = cache_path.as_ref();

    if let Some(mut g) = snapshot::load_file(cache_path) {
        log::info!(
            "loaded {} nodes and {} edges from {}",
            g.node_count(),
            g.edge_count(),
            cache_path.display(),
        );
        g.create_adjacency();
        return (g, true);
    }

    let mut g = Graph::new();
    let mut failed = 0;
    for source in sources {
        let source = source.as_ref();
        log::info!("parsing {}", source.display());
        if let Err(e) = osm::add_features_from_file(&mut g, options, source) {
            log::error!("failed to load {}: {e}", source.display());
            failed += 1;
        }
    }
    g.create_adjacency();

    if failed > 0 {
        log::warn!("{failed} source(s) failed to load, not saving a snapshot of the partial graph");
        return (g, false);
    }

    match snapshot::save_file(&g, cache_path) {
        Ok(()) => log::info!("saved snapshot to {}", cache_path.display()),
        Err(e) => log::warn!("failed to save snapshot to {}: {e}", cache_path.display()),
    }

    (g, false)
}
