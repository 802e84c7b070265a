// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Binary snapshots of a [Graph], used to skip XML parsing on warm starts.
//!
//! All values are stored in native byte order, without any padding, compression
//! or version marker:
//!
//! ```text
//! [f64 min_lat][f64 min_lon][f64 max_lat][f64 max_lon]
//! [i32 node_count][i32 edge_count]
//! node_count × [i64 id][f64 lat][f64 lon]
//! edge_count × [u32 id][i64 from][i64 to]
//! ```
//!
//! Only nodes, edges and the bounding box are persisted.
//! [Graph::create_adjacency] must be called again after loading.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::{BoundingBox, Edge, EdgeId, Graph, Node, NodeId};

const HEADER_SIZE: u64 = 4 * 8 + 2 * 4;
const NODE_SIZE: u64 = 8 + 8 + 8;
const EDGE_SIZE: u64 = 4 + 8 + 8;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid {0} count: {1}")]
    InvalidCount(&'static str, i64),

    #[error("snapshot declares {expected} bytes of records, but only {available} remain")]
    Truncated { expected: u64, available: u64 },

    #[error("duplicate node {0}")]
    DuplicateNode(NodeId),

    /// The edge id is taken, its node pair is already connected,
    /// or it references a node not present in the snapshot.
    #[error("invalid edge {0}")]
    InvalidEdge(EdgeId),
}

fn count(what: &'static str, n: usize) -> Result<i32, SnapshotError> {
    i32::try_from(n).map_err(|_| SnapshotError::InvalidCount(what, n as i64))
}

/// Serializes the graph into the provided writer.
pub fn write<W: Write>(g: &Graph, mut w: W) -> Result<(), SnapshotError> {
    let node_count = count("node", g.node_count())?;
    let edge_count = count("edge", g.edge_count())?;

    w.write_f64::<NativeEndian>(g.bbox.min_lat)?;
    w.write_f64::<NativeEndian>(g.bbox.min_lon)?;
    w.write_f64::<NativeEndian>(g.bbox.max_lat)?;
    w.write_f64::<NativeEndian>(g.bbox.max_lon)?;
    w.write_i32::<NativeEndian>(node_count)?;
    w.write_i32::<NativeEndian>(edge_count)?;

    for (id, node) in g.nodes() {
        w.write_i64::<NativeEndian>(id)?;
        w.write_f64::<NativeEndian>(node.lat)?;
        w.write_f64::<NativeEndian>(node.lon)?;
    }

    for (id, edge) in g.edges() {
        w.write_u32::<NativeEndian>(id)?;
        w.write_i64::<NativeEndian>(edge.from)?;
        w.write_i64::<NativeEndian>(edge.to)?;
    }

    w.flush()?;
    Ok(())
}

struct Header {
    bbox: BoundingBox,
    nodes: usize,
    edges: usize,
}

impl Header {
    fn records_size(&self) -> u64 {
        self.nodes as u64 * NODE_SIZE + self.edges as u64 * EDGE_SIZE
    }
}

fn read_count<R: Read>(r: &mut R, what: &'static str) -> Result<usize, SnapshotError> {
    let n = r.read_i32::<NativeEndian>()?;
    usize::try_from(n).map_err(|_| SnapshotError::InvalidCount(what, n as i64))
}

fn read_header<R: Read>(r: &mut R) -> Result<Header, SnapshotError> {
    let min_lat = r.read_f64::<NativeEndian>()?;
    let min_lon = r.read_f64::<NativeEndian>()?;
    let max_lat = r.read_f64::<NativeEndian>()?;
    let max_lon = r.read_f64::<NativeEndian>()?;
    let nodes = read_count(r, "node")?;
    let edges = read_count(r, "edge")?;

    Ok(Header {
        bbox: BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        },
        nodes,
        edges,
    })
}

fn read_records<R: Read>(r: &mut R, header: Header) -> Result<Graph, SnapshotError> {
    let mut g = Graph::new();
    g.bbox = header.bbox;

    for _ in 0..header.nodes {
        let id = r.read_i64::<NativeEndian>()?;
        let lat = r.read_f64::<NativeEndian>()?;
        let lon = r.read_f64::<NativeEndian>()?;
        if !g.add_node(id, Node { lat, lon }) {
            return Err(SnapshotError::DuplicateNode(id));
        }
    }

    for _ in 0..header.edges {
        let id = r.read_u32::<NativeEndian>()?;
        let from = r.read_i64::<NativeEndian>()?;
        let to = r.read_i64::<NativeEndian>()?;
        if !g.add_edge(id, Edge { from, to }) {
            return Err(SnapshotError::InvalidEdge(id));
        }
    }

    Ok(g)
}

/// Deserializes a graph from the provided reader.
///
/// The returned graph has no adjacency lists.
pub fn read<R: Read>(mut r: R) -> Result<Graph, SnapshotError> {
    let header = read_header(&mut r)?;
    read_records(&mut r, header)
}

/// Serializes the graph into a byte buffer.
pub fn save(g: &Graph) -> Result<Vec<u8>, SnapshotError> {
    let size = HEADER_SIZE + g.node_count() as u64 * NODE_SIZE + g.edge_count() as u64 * EDGE_SIZE;
    let mut buf = Vec::with_capacity(size as usize);
    write(g, &mut buf)?;
    Ok(buf)
}

/// Deserializes a graph from a byte buffer, returning `None` if the data
/// is truncated or otherwise corrupted.
pub fn load(data: &[u8]) -> Option<Graph> {
    match try_load(data) {
        Ok(g) => Some(g),
        Err(e) => {
            log::warn!("invalid snapshot: {e}");
            None
        }
    }
}

fn try_load(mut data: &[u8]) -> Result<Graph, SnapshotError> {
    let header = read_header(&mut data)?;
    let expected = header.records_size();
    let available = data.len() as u64;
    if expected > available {
        return Err(SnapshotError::Truncated {
            expected,
            available,
        });
    }
    read_records(&mut data, header)
}

/// Writes a snapshot of the graph to a file, replacing any existing one.
pub fn save_file<P: AsRef<Path>>(g: &Graph, path: P) -> Result<(), SnapshotError> {
    let f = File::create(path)?;
    write(g, BufWriter::new(f))
}

/// Reads a snapshot from a file.
///
/// Returns `None` if the file doesn't exist or can't be decoded,
/// so that the caller can fall back to parsing the source data.
pub fn load_file<P: AsRef<Path>>(path: P) -> Option<Graph> {
    let path = path.as_ref();
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("no snapshot at {}: {e}", path.display());
            return None;
        }
    };

    match read(BufReader::new(f)) {
        Ok(g) => Some(g),
        Err(e) => {
            log::warn!("invalid snapshot {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphError;

    fn graph() -> Graph {
        let mut g = Graph::new();
        g.bbox = BoundingBox {
            min_lat: 61.49,
            max_lat: 61.51,
            min_lon: 23.74,
            max_lon: 23.78,
        };
        g.add_node(-1, Node { lat: 61.495, lon: 23.75 });
        g.add_node(2, Node { lat: 61.5000001, lon: 23.76 });
        g.add_node(i64::MAX, Node { lat: 61.505, lon: 23.777777777 });
        g.add_edge(0, Edge { from: -1, to: 2 });
        g.add_edge(u32::MAX, Edge { from: i64::MAX, to: 2 });
        g
    }

    fn assert_same(a: &Graph, b: &Graph) {
        assert_eq!(a.bbox.min_lat.to_bits(), b.bbox.min_lat.to_bits());
        assert_eq!(a.bbox.max_lat.to_bits(), b.bbox.max_lat.to_bits());
        assert_eq!(a.bbox.min_lon.to_bits(), b.bbox.min_lon.to_bits());
        assert_eq!(a.bbox.max_lon.to_bits(), b.bbox.max_lon.to_bits());

        let a_nodes: Vec<_> = a.nodes().map(|(id, n)| (id, n.lat.to_bits(), n.lon.to_bits())).collect();
        let b_nodes: Vec<_> = b.nodes().map(|(id, n)| (id, n.lat.to_bits(), n.lon.to_bits())).collect();
        assert_eq!(a_nodes, b_nodes);

        let a_edges: Vec<_> = a.edges().collect();
        let b_edges: Vec<_> = b.edges().collect();
        assert_eq!(a_edges, b_edges);
    }

    #[test]
    fn round_trip() {
        let g = graph();
        let data = save(&g).unwrap();
        let loaded = load(&data).unwrap();
        assert_same(&g, &loaded);

        let loaded = read(data.as_slice()).unwrap();
        assert_same(&g, &loaded);
    }

    #[test]
    fn layout() {
        let data = save(&graph()).unwrap();
        assert_eq!(data.len() as u64, HEADER_SIZE + 3 * NODE_SIZE + 2 * EDGE_SIZE);

        assert_eq!(data[0..8], 61.49_f64.to_ne_bytes());
        assert_eq!(data[8..16], 23.74_f64.to_ne_bytes());
        assert_eq!(data[16..24], 61.51_f64.to_ne_bytes());
        assert_eq!(data[24..32], 23.78_f64.to_ne_bytes());
        assert_eq!(data[32..36], 3_i32.to_ne_bytes());
        assert_eq!(data[36..40], 2_i32.to_ne_bytes());

        // First node, in id order
        assert_eq!(data[40..48], (-1_i64).to_ne_bytes());
        assert_eq!(data[48..56], 61.495_f64.to_ne_bytes());

        // First edge
        let edges = (HEADER_SIZE + 3 * NODE_SIZE) as usize;
        assert_eq!(data[edges..edges + 4], 0_u32.to_ne_bytes());
        assert_eq!(data[edges + 4..edges + 12], (-1_i64).to_ne_bytes());
        assert_eq!(data[edges + 12..edges + 20], 2_i64.to_ne_bytes());
    }

    #[test]
    fn empty_graph() {
        let g = Graph::new();
        let data = save(&g).unwrap();
        assert_eq!(data.len() as u64, HEADER_SIZE);

        let loaded = load(&data).unwrap();
        assert_eq!(loaded.node_count(), 0);
        assert_eq!(loaded.edge_count(), 0);
        assert!(loaded.bbox.is_empty());
    }

    #[test]
    fn adjacency_is_not_persisted() {
        let mut g = graph();
        g.create_adjacency();

        let mut loaded = load(&save(&g).unwrap()).unwrap();
        assert_eq!(loaded.get_neighbors(2), Err(GraphError::NoAdjacency(2)));

        loaded.create_adjacency();
        assert_eq!(loaded.get_neighbors(2).unwrap().len(), 2);
    }

    #[test]
    fn truncated() {
        let data = save(&graph()).unwrap();
        for len in [0, 10, HEADER_SIZE as usize, data.len() - 1] {
            assert!(load(&data[..len]).is_none(), "loaded truncated snapshot of {len} bytes");
            assert!(read(&data[..len]).is_err());
        }
    }

    #[test]
    fn huge_count() {
        let mut data = save(&Graph::new()).unwrap();
        data[32..36].copy_from_slice(&i32::MAX.to_ne_bytes());
        assert!(matches!(
            try_load(&data),
            Err(SnapshotError::Truncated { available: 0, .. })
        ));
        assert!(read(data.as_slice()).is_err());
    }

    #[test]
    fn negative_count() {
        let mut data = save(&Graph::new()).unwrap();
        data[36..40].copy_from_slice(&(-1_i32).to_ne_bytes());
        assert!(matches!(
            try_load(&data),
            Err(SnapshotError::InvalidCount("edge", -1))
        ));
    }

    #[test]
    fn dangling_edge() {
        let mut data = save(&graph()).unwrap();
        let edges = (HEADER_SIZE + 3 * NODE_SIZE) as usize;
        data[edges + 12..edges + 20].copy_from_slice(&42_i64.to_ne_bytes());
        assert!(matches!(try_load(&data), Err(SnapshotError::InvalidEdge(0))));
    }

    #[test]
    fn duplicate_node() {
        let mut data = save(&graph()).unwrap();
        data[64..72].copy_from_slice(&(-1_i64).to_ne_bytes());
        assert!(matches!(try_load(&data), Err(SnapshotError::DuplicateNode(-1))));
    }

    #[test]
    fn files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");

        assert!(load_file(&path).is_none());

        let g = graph();
        save_file(&g, &path).unwrap();
        assert_same(&g, &load_file(&path).unwrap());

        std::fs::write(&path, b"garbage").unwrap();
        assert!(load_file(&path).is_none());
    }
}
