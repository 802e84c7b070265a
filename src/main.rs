use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use osmgraph::{EdgeId, Graph, Node, NodeId};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no node corresponding to the given {0} position")]
    NoNearbyNode(&'static str),

    #[error("no route between the given positions")]
    NoRoute,
}

/// Finds the shortest road route between two points and prints it as GeoJSON.
#[derive(Parser)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// Longitude of the end point
    end_lon: f64,

    /// Paths to the OSM files (.osm, .osm.gz or .osm.bz2)
    #[arg(required = true)]
    osm_files: Vec<PathBuf>,

    /// Path to the binary graph snapshot, created if missing
    #[arg(short, long, default_value = "graph.bin")]
    cache: PathBuf,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let ids = osmgraph::EdgeIdGenerator::default();
    let options = osmgraph::osm::Options {
        filter: &osmgraph::osm::ROAD_FILTER,
        file_format: osmgraph::osm::FileFormat::Unknown,
        ids: &ids,
    };
    let (g, _) = osmgraph::load_graph(&cli.osm_files, &cli.cache, &options);

    let start = g
        .find_nearest_node(cli.start_lat, cli.start_lon)
        .ok_or(CliError::NoNearbyNode("start"))?;

    let end = g
        .find_nearest_node(cli.end_lat, cli.end_lon)
        .ok_or(CliError::NoNearbyNode("end"))?;

    let route = osmgraph::find_route(&g, start, end)?.ok_or(CliError::NoRoute)?;
    log::info!("route length: {}", osmgraph::format_distance(route.distance));

    let nodes = route_nodes(&g, start, route.edges_from_source())?;

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!(
        "      \"properties\": {{\"distance\": {:.1}}},",
        route.distance
    );

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut nodes = nodes.into_iter().peekable();
    while let Some(node) = nodes.next() {
        let suffix = if nodes.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", node.lon, node.lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

/// Walks the edges of a route from its first node, collecting visited nodes.
fn route_nodes(
    g: &Graph,
    start: NodeId,
    edges: impl Iterator<Item = EdgeId>,
) -> Result<Vec<Node>, osmgraph::GraphError> {
    let mut at = start;
    let mut nodes = vec![g.get_node(at)?];

    for id in edges {
        let edge = g.get_edge(id)?;
        at = if edge.from == at { edge.to } else { edge.from };
        nodes.push(g.get_node(at)?);
    }

    Ok(nodes)
}
