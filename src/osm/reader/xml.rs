// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::io;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use super::model;
use super::IngestError;
use crate::{BoundingBox, Node};

pub(super) fn features_from_io<R: io::BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<model::Feature, IngestError>> {
    Reader::from_io(reader)
}

pub(super) fn features_from_buffer(
    data: &[u8],
) -> impl Iterator<Item = Result<model::Feature, IngestError>> + '_ {
    Reader::from_buffer(data)
}

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    NotSeen,
    Open,
    Closed,
}

/// Reader streams osm [Features](model::Feature) from an XML document.
///
/// The document must have an `<osm>` root element. Errors end the stream.
struct Reader<P: Parser> {
    parser: P,
    root: Root,
    done: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self {
            parser,
            root: Root::NotSeen,
            done: false,
        }
    }

    fn next_feature(&mut self) -> Result<Option<model::Feature>, IngestError> {
        let mut way: Option<model::Way> = None;

        loop {
            let event = self.parser.read_event()?;

            match event {
                Event::Empty(start) => {
                    if !enter(&mut self.root, &start, true)? {
                        continue;
                    }
                    match start.local_name().as_ref() {
                        b"bounds" => return parse_bounds(&start).map(Some),
                        b"node" => {
                            if let Some(f) = parse_node(&start) {
                                return Ok(Some(f));
                            }
                        }
                        b"way" => {
                            if let Some(w) = parse_way(&start) {
                                return Ok(Some(model::Feature::Way(w)));
                            }
                        }
                        _ => add_way_child(&mut way, &start),
                    }
                }

                Event::Start(start) => {
                    if !enter(&mut self.root, &start, false)? {
                        continue;
                    }
                    match start.local_name().as_ref() {
                        b"bounds" => return parse_bounds(&start).map(Some),
                        b"node" => {
                            // Tags on nodes are irrelevant for routing;
                            // the node is emitted right away.
                            if let Some(f) = parse_node(&start) {
                                return Ok(Some(f));
                            }
                        }
                        b"way" => way = parse_way(&start),
                        _ => add_way_child(&mut way, &start),
                    }
                }

                Event::End(end) => match end.local_name().as_ref() {
                    b"way" => {
                        if let Some(w) = way.take() {
                            return Ok(Some(model::Feature::Way(w)));
                        }
                    }
                    b"osm" if self.root == Root::Open => self.root = Root::Closed,
                    _ => {}
                },

                Event::Eof => {
                    return match self.root {
                        Root::NotSeen => Err(IngestError::MissingRoot),
                        Root::Open => Err(IngestError::UnexpectedEof),
                        Root::Closed => Ok(None),
                    };
                }

                _ => {}
            }
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_feature() {
            Ok(Some(f)) => Some(Ok(f)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

/// Tracks the `<osm>` root element. Returns `Ok(true)` if `start`
/// is an element inside the root which should be interpreted.
fn enter(root: &mut Root, start: &BytesStart<'_>, self_closing: bool) -> Result<bool, IngestError> {
    match *root {
        Root::NotSeen if start.local_name().as_ref() == b"osm" => {
            *root = if self_closing { Root::Closed } else { Root::Open };
            Ok(false)
        }
        Root::NotSeen => Err(IngestError::MissingRoot),
        Root::Open => Ok(true),
        Root::Closed => Ok(false),
    }
}

/// Returns the raw value of an attribute, if present and well-formed.
fn attribute<'s>(start: &'s BytesStart<'_>, key: &[u8]) -> Option<Cow<'s, [u8]>> {
    start
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| a.value)
}

/// Parses a numeric attribute. Absent or malformed values yield `None`.
fn numeric_attribute<T: std::str::FromStr>(start: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    let raw = attribute(start, key)?;
    from_utf8(&raw).ok()?.trim().parse().ok()
}

fn parse_bounds(start: &BytesStart<'_>) -> Result<model::Feature, IngestError> {
    let get = |key: &str| -> Result<f64, IngestError> {
        numeric_attribute::<f64>(start, key.as_bytes())
            .filter(|x| x.is_finite())
            .ok_or_else(|| IngestError::InvalidBounds(format!("missing or malformed {key}")))
    };

    let bbox = BoundingBox {
        min_lat: get("minlat")?,
        max_lat: get("maxlat")?,
        min_lon: get("minlon")?,
        max_lon: get("maxlon")?,
    };

    if bbox.is_empty() {
        return Err(IngestError::InvalidBounds(format!(
            "inverted bounds: {bbox:?}"
        )));
    }

    Ok(model::Feature::Bounds(bbox))
}

fn parse_node(start: &BytesStart<'_>) -> Option<model::Feature> {
    let id = numeric_attribute::<i64>(start, b"id");
    let lat = numeric_attribute::<f64>(start, b"lat").filter(|x| x.is_finite());
    let lon = numeric_attribute::<f64>(start, b"lon").filter(|x| x.is_finite());

    match (id, lat, lon) {
        (Some(id), Some(lat), Some(lon)) => Some(model::Feature::Node(id, Node { lat, lon })),
        _ => {
            log::debug!("skipping <node> without a valid id, lat and lon (id={id:?})");
            None
        }
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<model::Way> {
    match numeric_attribute::<i64>(start, b"id") {
        Some(id) => Some(model::Way {
            id,
            nodes: Vec::default(),
            tags: Vec::default(),
        }),
        None => {
            log::debug!("skipping <way> without a valid id");
            None
        }
    }
}

/// Attaches a `<tag>` or `<nd>` element to the way currently being read.
/// Children of other elements are ignored.
fn add_way_child(way: &mut Option<model::Way>, start: &BytesStart<'_>) {
    let Some(w) = way.as_mut() else {
        return;
    };

    match start.local_name().as_ref() {
        b"tag" => match parse_tag(start) {
            Some(tag) => w.tags.push(tag),
            None => log::debug!("skipping <tag> without a key on way {}", w.id),
        },
        b"nd" => match numeric_attribute::<i64>(start, b"ref") {
            Some(ref_) => w.nodes.push(ref_),
            None => log::debug!("skipping <nd> without a valid ref on way {}", w.id),
        },
        _ => {}
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = attr.unescape_value().ok().map(|s| s.into_owned()),
            b"v" => v = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}
