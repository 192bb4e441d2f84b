use crate::media::range::{MediaType, Quality, WILDCARD};
use crate::span::CharSpan;
use std::cmp::Ordering;
use std::fmt;

/// A client media range merged with a server media range.
///
/// Wildcard coordinates are specialized to the concrete side where
/// possible; `distance` counts how many such specializations happened
/// (0 to 2). Both quality factors are kept so the comparator can rank
/// client preference above server preference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinedMediaType {
    kind: CharSpan,
    subtype: CharSpan,
    client_q: Quality,
    server_q: Quality,
    distance: u8,
}

/// The outcome of combining a client range with a server range.
///
/// `Incompatible` sorts strictly below every compatible value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Combination {
    Compatible(CombinedMediaType),
    Incompatible,
}

// One coordinate (type or subtype) of the combination.
fn merge_coordinate(client: &CharSpan, server: &CharSpan, distance: &mut u8) -> Option<CharSpan> {
    let cw = *client == WILDCARD;
    let sw = *server == WILDCARD;
    match (cw, sw) {
        (true, true) => Some(client.clone()),
        (true, false) => {
            *distance += 1;
            Some(server.clone())
        }
        (false, true) => {
            *distance += 1;
            Some(client.clone())
        }
        (false, false) => {
            if client.eq_ignore_ascii_case(server) {
                Some(client.clone())
            } else {
                None
            }
        }
    }
}

/// Combine a client range with a server range per the negotiation rules.
pub fn combine(client: &MediaType, server: &MediaType) -> Combination {
    let mut distance = 0u8;
    let kind = match merge_coordinate(client.kind(), server.kind(), &mut distance) {
        Some(k) => k,
        None => return Combination::Incompatible,
    };
    let subtype = match merge_coordinate(client.subtype(), server.subtype(), &mut distance) {
        Some(s) => s,
        None => return Combination::Incompatible,
    };
    Combination::Compatible(CombinedMediaType {
        kind,
        subtype,
        client_q: client.quality(),
        server_q: server.quality(),
        distance,
    })
}

impl CombinedMediaType {
    pub fn kind(&self) -> &CharSpan {
        &self.kind
    }

    pub fn subtype(&self) -> &CharSpan {
        &self.subtype
    }

    pub fn client_quality(&self) -> Quality {
        self.client_q
    }

    pub fn server_quality(&self) -> Quality {
        self.server_q
    }

    pub fn distance(&self) -> u8 {
        self.distance
    }

    /// Wildcards remaining in the combined type/subtype, 0 to 2.
    pub fn wildcard_count(&self) -> u8 {
        (self.kind == WILDCARD) as u8 + (self.subtype == WILDCARD) as u8
    }

    /// Rank against another combined type; `Greater` means preferred.
    ///
    /// Fewer remaining wildcards, then higher client q, then higher
    /// server q, then lower distance. Values that differ only in their
    /// text compare equal, so ties are broken by the caller's stable
    /// ordering.
    pub fn compare(&self, other: &CombinedMediaType) -> Ordering {
        match other.wildcard_count().cmp(&self.wildcard_count()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match self.client_q.cmp(&other.client_q) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match self.server_q.cmp(&other.server_q) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        other.distance.cmp(&self.distance)
    }
}

/// Rank two combinations; `Incompatible` is strictly least.
pub fn compare(a: &Combination, b: &Combination) -> Ordering {
    match (a, b) {
        (Combination::Incompatible, Combination::Incompatible) => Ordering::Equal,
        (Combination::Incompatible, Combination::Compatible(_)) => Ordering::Less,
        (Combination::Compatible(_), Combination::Incompatible) => Ordering::Greater,
        (Combination::Compatible(x), Combination::Compatible(y)) => x.compare(y),
    }
}

impl fmt::Display for CombinedMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (cq={}, sq={}, d={})",
            self.kind, self.subtype, self.client_q, self.server_q, self.distance
        )
    }
}
