//! Spatial hotspot detection.
//!
//! Spatial readings are grouped by single-linkage clustering: two readings
//! closer than the radius share a cluster, and clusters chain through shared
//! members. A cluster is promoted to a [`Hotspot`] when it has at least two
//! members and its peak value strictly exceeds the severity threshold.

use std::cmp::Ordering;

use crate::models::{Hotspot, Reading};

/// Fewest members a cluster needs before it can be a hotspot.
pub const MIN_HOTSPOT_READINGS: usize = 2;

// ---

pub fn detect_hotspots(readings: &[Reading], radius: f64, threshold: f64) -> Vec<Hotspot> {
    // ---
    let spatial: Vec<&Reading> = readings.iter().filter(|r| r.is_spatial()).collect();
    if spatial.len() < MIN_HOTSPOT_READINGS {
        return Vec::new();
    }

    let mut sets = DisjointSet::new(spatial.len());
    for i in 0..spatial.len() {
        for j in (i + 1)..spatial.len() {
            if let (Some(a), Some(b)) = (spatial[i].position(), spatial[j].position()) {
                if a.distance(&b) <= radius {
                    sets.union(i, j);
                }
            }
        }
    }

    // Group member indices by root, keeping input order inside each cluster.
    let mut clusters: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..spatial.len() {
        let root = sets.find(i);
        match clusters.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => clusters.push((root, vec![i])),
        }
    }

    let mut hotspots: Vec<Hotspot> = clusters
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_HOTSPOT_READINGS)
        .filter_map(|(_, members)| {
            // first member wins ties on the maximum
            let peak = members.iter().copied().fold(members[0], |best, i| {
                if spatial[i].value > spatial[best].value {
                    i
                } else {
                    best
                }
            });
            let max_value = spatial[peak].value;
            if max_value <= threshold {
                return None;
            }
            Some(Hotspot {
                position: spatial[peak].position()?,
                max_value,
                readings: members.iter().map(|&i| spatial[i].clone()).collect(),
            })
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.max_value
            .total_cmp(&a.max_value)
            .then_with(|| a.position.x.total_cmp(&b.position.x))
            .then_with(|| a.position.y.total_cmp(&b.position.y))
            .then_with(|| match (a.position.z, b.position.z) {
                (Some(za), Some(zb)) => za.total_cmp(&zb),
                (za, zb) => za.is_some().cmp(&zb.is_some()),
            })
    });
    tracing::debug!(
        "Detected {} hotspots from {} spatial readings",
        hotspots.len(),
        spatial.len()
    );
    hotspots
}

/// Union-find over reading indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
