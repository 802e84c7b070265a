// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Values of a [Rule] which make a way non-routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Values<'a> {
    /// Any value of the key disqualifies the way.
    Any,

    /// Only the listed values disqualify the way.
    OneOf(&'a [&'a str]),
}

/// A single entry of a [WayFilter]: a tag key and the values which
/// disqualify a way from routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule<'a> {
    pub key: &'a str,
    pub values: Values<'a>,
}

impl<'a> Rule<'a> {
    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.key == key
            && match self.values {
                Values::Any => true,
                Values::OneOf(values) => values.contains(&value),
            }
    }
}

/// Decides which OSM ways are part of the road network.
///
/// A way is rejected in full if any of its tags matches any [Rule].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WayFilter<'a> {
    pub rules: &'a [Rule<'a>],
}

impl<'a> WayFilter<'a> {
    /// Returns the first [Rule] matching a single tag, if any.
    pub fn matching_rule(&self, key: &str, value: &str) -> Option<&Rule<'a>> {
        self.rules.iter().find(|r| r.matches(key, value))
    }

    /// Checks if a single tag is allowed on a routable way.
    pub fn allows_tag(&self, key: &str, value: &str) -> bool {
        self.matching_rule(key, value).is_none()
    }

    /// Checks if a way with the given tags is routable.
    /// Every tag is checked, including ones with a repeated key.
    pub fn is_routable<K, V, I>(&self, tags: I) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        tags.into_iter()
            .all(|(k, v)| self.allows_tag(k.as_ref(), v.as_ref()))
    }
}

/// Default [WayFilter] for road networks. Rejects areas and other non-road features,
/// private and proposed roads, and ferries and other waterborne routes.
pub const ROAD_FILTER: WayFilter = WayFilter {
    rules: &[
        Rule {
            key: "boundary",
            values: Values::Any,
        },
        Rule {
            key: "building",
            values: Values::Any,
        },
        Rule {
            key: "landuse",
            values: Values::Any,
        },
        Rule {
            key: "natural",
            values: Values::Any,
        },
        Rule {
            key: "waterway",
            values: Values::Any,
        },
        Rule {
            key: "railway",
            values: Values::Any,
        },
        Rule {
            key: "access",
            values: Values::OneOf(&["private", "no"]),
        },
        Rule {
            key: "highway",
            values: Values::OneOf(&["proposed", "ferry"]),
        },
        Rule {
            key: "route",
            values: Values::OneOf(&["boat", "ferry", "ship", "seaway"]),
        },
        Rule {
            key: "service",
            values: Values::OneOf(&["ferry"]),
        },
        Rule {
            key: "motorboat",
            values: Values::OneOf(&["yes", "designated"]),
        },
        Rule {
            key: "transport_mode",
            values: Values::OneOf(&["boat", "ship"]),
        },
    ],
};
