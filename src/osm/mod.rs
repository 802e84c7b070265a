// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Ingestion of [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) extracts.

mod filter;
mod reader;

pub use filter::{Rule, Values, WayFilter, ROAD_FILTER};
pub use reader::{
    add_features_from_buffer, add_features_from_file, add_features_from_io, FileFormat,
    IngestError, Options,
};
