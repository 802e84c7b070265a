// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Edge, EdgeId, Graph, Node, NodeId};

use super::{model, IngestError, Options};

/// How many times a colliding edge id is redrawn before the segment is given up.
const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Stats {
    nodes: usize,
    nodes_outside_bbox: usize,
    ways: usize,
    ways_rejected: usize,
    edges: usize,
}

/// Helper object used for storing state related to converting [OSM features](super::model::Feature)
/// into a [Graph].
pub(super) struct GraphBuilder<'a> {
    g: &'a mut Graph,
    options: &'a Options<'a>,
    stats: Stats,
}

impl<'a> GraphBuilder<'a> {
    pub(super) fn new(g: &'a mut Graph, options: &'a Options<'a>) -> Self {
        Self {
            g,
            options,
            stats: Stats::default(),
        }
    }

    /// Add all features from the provided reader.
    ///
    /// The whole document is read before the graph is touched, so a malformed
    /// file leaves the graph exactly as it was. The document must contain
    /// a `<bounds>` element, which applies to all nodes regardless of its position.
    pub(super) fn add_features<I>(&mut self, features: I) -> Result<(), IngestError>
    where
        I: Iterator<Item = Result<model::Feature, IngestError>>,
    {
        let features = features.collect::<Result<Vec<_>, _>>()?;

        let mut has_bounds = false;
        for f in &features {
            if let model::Feature::Bounds(bbox) = f {
                self.g.bbox.expand(bbox);
                has_bounds = true;
            }
        }
        if !has_bounds {
            return Err(IngestError::MissingBounds);
        }

        for f in features {
            self.add_feature(f);
        }

        log::info!(
            "added {} nodes ({} outside bounds) and {} edges from {} ways ({} rejected)",
            self.stats.nodes,
            self.stats.nodes_outside_bbox,
            self.stats.edges,
            self.stats.ways,
            self.stats.ways_rejected,
        );
        Ok(())
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Bounds(_) => {}
            model::Feature::Node(id, n) => self.add_node(id, n),
            model::Feature::Way(w) => self.add_way(w),
        }
    }

    fn add_node(&mut self, id: NodeId, n: Node) {
        if !self.g.bbox.contains(n.lat, n.lon) {
            self.stats.nodes_outside_bbox += 1;
            return;
        }

        if self.g.add_node(id, n) {
            self.stats.nodes += 1;
        } else {
            log::debug!("node {id} already exists - keeping the first definition");
        }
    }

    fn add_way(&mut self, w: model::Way) {
        self.stats.ways += 1;

        if let Some((k, v)) = w
            .tags
            .iter()
            .find(|(k, v)| !self.options.filter.allows_tag(k, v))
        {
            log::debug!("way {} rejected by tag {k}={v}", w.id);
            self.stats.ways_rejected += 1;
            return;
        }

        for pair in w.nodes.windows(2) {
            self.add_segment(w.id, pair[0], pair[1]);
        }
    }

    /// Creates an edge for a single segment of a way, unless any of the endpoints
    /// was filtered out or the two nodes are already connected.
    fn add_segment(&mut self, way_id: i64, from: NodeId, to: NodeId) {
        if from == to || !self.g.has_node(from) || !self.g.has_node(to) {
            return;
        }

        if self.g.has_edge(from, to) {
            return;
        }

        match self.free_edge_id() {
            Some(id) => {
                let added = self.g.add_edge(id, Edge { from, to });
                debug_assert!(added);
                self.stats.edges += 1;
            }
            None => log::warn!(
                "way {way_id}: no free edge id after {MAX_ID_ATTEMPTS} attempts, \
                 skipping segment {from}-{to}"
            ),
        }
    }

    fn free_edge_id(&self) -> Option<EdgeId> {
        (0..MAX_ID_ATTEMPTS)
            .map(|_| self.options.ids.next_id())
            .find(|&id| {
                let taken = self.g.get_edge(id).is_ok();
                if taken {
                    log::debug!("edge id {id} already taken, drawing another one");
                }
                !taken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{add_features_from_buffer, FileFormat};
    use super::*;
    use crate::osm::ROAD_FILTER;
    use crate::{BoundingBox, EdgeIdGenerator, FixedClock};

    const SIMPLE_XML: &[u8] = include_bytes!("test_fixtures/simple.osm");

    fn options(ids: &EdgeIdGenerator) -> Options<'_> {
        Options {
            filter: &ROAD_FILTER,
            file_format: FileFormat::Xml,
            ids,
        }
    }

    fn load(data: &[u8]) -> Graph {
        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        let mut g = Graph::new();
        add_features_from_buffer(&mut g, &options(&ids), data).unwrap();
        g
    }

    #[test]
    fn simple_graph() {
        let g = load(SIMPLE_XML);

        assert_eq!(
            g.bbox,
            BoundingBox {
                min_lat: 61.49,
                max_lat: 61.51,
                min_lon: 23.74,
                max_lon: 23.78,
            }
        );

        // -7 is outside of the bounds
        assert_eq!(g.node_count(), 7);
        assert!(!g.has_node(-7));
        for (_, n) in g.nodes() {
            assert!(g.bbox.contains(n.lat, n.lon));
        }

        assert!(g.has_edge(-1, -2));
        assert!(g.has_edge(-2, -3));
        assert!(g.has_edge(-3, -4));
        assert!(g.has_edge(-4, -5));
        assert!(g.has_edge(-5, -6));
        assert!(g.has_edge(-6, -8));
        assert_eq!(g.edge_count(), 6);

        // building=yes
        assert!(!g.has_edge(-8, -1));
        assert!(!g.has_edge(-1, -6));
        // access=private
        assert!(!g.has_edge(-4, -8));
        // -7 filtered out
        assert!(!g.has_edge(-6, -7));
    }

    #[test]
    fn edge_ids_come_from_the_generator() {
        let g = load(SIMPLE_XML);
        assert_eq!(
            g.edges().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4, 5]
        );
        assert_eq!(g.get_edge(0), Ok(Edge { from: -1, to: -2 }));
        assert_eq!(g.get_edge(4), Ok(Edge { from: -5, to: -6 }));
    }

    #[test]
    fn building_contributes_no_edges() {
        let g = load(
            br#"<osm>
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.1" lon="0.1"/>
  <node id="2" lat="0.2" lon="0.2"/>
  <node id="3" lat="0.3" lon="0.3"/>
  <way id="10">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
    <tag k="building" v="yes"/>
  </way>
</osm>"#,
        );
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn repeated_node_references() {
        let g = load(
            br#"<osm>
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.1" lon="0.1"/>
  <node id="2" lat="0.2" lon="0.2"/>
  <way id="10"><nd ref="1"/><nd ref="1"/><nd ref="2"/><nd ref="1"/></way>
</osm>"#,
        );
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(1, 2));
    }

    #[test]
    fn missing_bounds() {
        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        let mut g = Graph::new();
        let result = add_features_from_buffer(
            &mut g,
            &options(&ids),
            br#"<osm><node id="1" lat="0.1" lon="0.1"/></osm>"#,
        );
        assert!(matches!(result, Err(IngestError::MissingBounds)));
        assert_eq!(g.node_count(), 0);
        assert!(g.bbox.is_empty());

        let result = add_features_from_buffer(&mut g, &options(&ids), b"<osm></osm>");
        assert!(matches!(result, Err(IngestError::MissingBounds)));
    }

    #[test]
    fn bounds_after_nodes() {
        let g = load(
            br#"<osm>
  <node id="1" lat="0.1" lon="0.1"/>
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="2" lat="0.2" lon="0.2"/>
  <node id="3" lat="1.5" lon="1.5"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><nd ref="3"/><tag k="highway" v="primary"/></way>
</osm>"#,
        );
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(1, 2));
    }

    #[test]
    fn repeated_tag_keys() {
        let g = load(
            br#"<osm>
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.1" lon="0.1"/>
  <node id="2" lat="0.2" lon="0.2"/>
  <way id="10">
    <nd ref="1"/><nd ref="2"/>
    <tag k="access" v="private"/>
    <tag k="access" v="yes"/>
  </way>
</osm>"#,
        );
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn multiple_files() {
        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        let mut g = Graph::new();

        add_features_from_buffer(
            &mut g,
            &options(&ids),
            br#"<osm>
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.5" lon="0.5"/>
  <node id="2" lat="0.9" lon="0.9"/>
  <node id="3" lat="1.5" lon="1.5"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><tag k="highway" v="primary"/></way>
</osm>"#,
        )
        .unwrap();
        assert_eq!(g.node_count(), 2);

        add_features_from_buffer(
            &mut g,
            &options(&ids),
            br#"<osm>
  <bounds minlat="1" minlon="1" maxlat="2" maxlon="2"/>
  <node id="2" lat="0.9" lon="0.9"/>
  <node id="3" lat="1.5" lon="1.5"/>
  <way id="11"><nd ref="2"/><nd ref="3"/><tag k="highway" v="primary"/></way>
  <way id="12"><nd ref="2"/><nd ref="1"/><tag k="highway" v="primary"/></way>
</osm>"#,
        )
        .unwrap();

        assert_eq!(
            g.bbox,
            BoundingBox {
                min_lat: 0.0,
                max_lat: 2.0,
                min_lon: 0.0,
                max_lon: 2.0,
            }
        );
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert!(g.has_edge(1, 2));
        assert!(g.has_edge(2, 3));
    }

    #[test]
    fn malformed_file_keeps_previous_state() {
        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        let mut g = load(SIMPLE_XML);
        let before = (g.bbox, g.node_count(), g.edge_count());

        let result = add_features_from_buffer(
            &mut g,
            &options(&ids),
            br#"<osm>
  <bounds minlat="0" minlon="0" maxlat="90" maxlon="90"/>
  <node id="1" lat="0.5" lon="0.5"/>
  <way id="10"><nd ref="1"/></node>
</osm>"#,
        );
        assert!(result.is_err());
        assert_eq!((g.bbox, g.node_count(), g.edge_count()), before);
    }

    #[test]
    fn colliding_edge_ids_are_redrawn() {
        // Edge 0 is taken by the first file, and a fresh generator starts at 0 again.
        let mut g = load(SIMPLE_XML);
        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        add_features_from_buffer(
            &mut g,
            &options(&ids),
            br#"<osm>
  <bounds minlat="61.49" minlon="23.74" maxlat="61.51" maxlon="23.78"/>
  <way id="10"><nd ref="-1"/><nd ref="-3"/></way>
</osm>"#,
        )
        .unwrap();

        assert_eq!(g.edge_count(), 7);
        assert_eq!(g.get_edge(6), Ok(Edge { from: -1, to: -3 }));
        assert_eq!(g.get_edge(0), Ok(Edge { from: -1, to: -2 }));
    }

    #[test]
    fn gzip_input() {
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(SIMPLE_XML).unwrap();
        let compressed = encoder.finish().unwrap();

        let ids = EdgeIdGenerator::with_clock(FixedClock(0));
        let mut g = Graph::new();
        let opts = Options {
            filter: &ROAD_FILTER,
            file_format: FileFormat::Unknown,
            ids: &ids,
        };
        add_features_from_buffer(&mut g, &opts, &compressed).unwrap();
        assert_eq!(g.node_count(), 7);
        assert_eq!(g.edge_count(), 6);

        let mut g = Graph::new();
        super::super::add_features_from_io(&mut g, &opts, std::io::Cursor::new(compressed))
            .unwrap();
        assert_eq!(g.edge_count(), 6);
    }
}
