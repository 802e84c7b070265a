// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use crate::osm::WayFilter;
use crate::{EdgeIdGenerator, Graph};

mod graph_builder;
mod model;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the first bytes of the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the magic bytes at the start of a file.
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }
}

/// Additional controls for interpreting OSM data as a road [Graph].
#[derive(Debug)]
pub struct Options<'a> {
    /// Which OSM ways are part of the road network.
    pub filter: &'a WayFilter<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// Source of ids for newly created edges. May be shared between
    /// concurrent ingestions into different graphs.
    pub ids: &'a EdgeIdGenerator,
}

/// Reasons for aborting ingestion of a single file.
///
/// Nodes and edges added to a [Graph] by previously ingested files are retained.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("missing <osm> root element")]
    MissingRoot,

    #[error("document ended before the closing </osm>")]
    UnexpectedEof,

    #[error("missing <bounds> element")]
    MissingBounds,

    #[error("invalid <bounds>: {0}")]
    InvalidBounds(String),
}

/// Parse OSM features from a reader into a [Graph] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn add_features_from_io<R: io::Read>(
    g: &mut Graph,
    options: &Options<'_>,
    reader: R,
) -> Result<(), IngestError> {
    match options.file_format {
        FileFormat::Unknown => {
            let mut b = io::BufReader::new(reader);
            let format = FileFormat::sniff(b.fill_buf()?);
            log::debug!("detected input format: {format:?}");
            add_features_with_format(g, options, format, b)
        }

        format => add_features_with_format(g, options, format, reader),
    }
}

fn add_features_with_format<R: io::Read>(
    g: &mut Graph,
    options: &Options<'_>,
    format: FileFormat,
    reader: R,
) -> Result<(), IngestError> {
    match format {
        FileFormat::Unknown | FileFormat::Xml => {
            let b = io::BufReader::new(reader);
            let r = xml::features_from_io(b);
            GraphBuilder::new(g, options).add_features(r)
        }

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            let b = io::BufReader::new(d);
            let r = xml::features_from_io(b);
            GraphBuilder::new(g, options).add_features(r)
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            let b = io::BufReader::new(d);
            let r = xml::features_from_io(b);
            GraphBuilder::new(g, options).add_features(r)
        }
    }
}

/// Parse OSM features from a file at the provided path into a [Graph] as per the provided [Options].
pub fn add_features_from_file<P: AsRef<Path>>(
    g: &mut Graph,
    options: &Options<'_>,
    path: P,
) -> Result<(), IngestError> {
    let f = File::open(path)?;
    add_features_from_io(g, options, f)
}

/// Parse OSM features from an in-memory buffer into a [Graph] as per the provided [Options].
pub fn add_features_from_buffer(
    g: &mut Graph,
    options: &Options<'_>,
    data: &[u8],
) -> Result<(), IngestError> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::sniff(data),
        format => format,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        let r = xml::features_from_buffer(data);
        GraphBuilder::new(g, options).add_features(r)
    } else {
        add_features_with_format(g, options, format, io::Cursor::new(data))
    }
}
