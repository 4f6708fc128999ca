//! Transitive grouping of tracked sizes into inferred market makers.
//!
//! Sizes are nodes; a qualifying presence correlation is an edge. Every
//! connected component is one group, so A-B and B-C links put A, B and C
//! together even when A-C does not qualify. Sizes without any qualifying edge
//! form singleton groups.

use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use tracing::debug;
use xvenue_core::{CorrelationPair, MarketMakerGroup, PresenceStats, SizeKey};

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`. Returns false if already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Whether a presence correlation links two sizes.
#[inline]
pub fn is_linked(pair: &CorrelationPair, min_correlation: f64, max_p_value: f64) -> bool {
    pair.correlation > min_correlation && pair.p_value < max_p_value
}

/// Group sizes into connected components over qualifying edges.
///
/// Groups are ordered by their smallest member; members are ascending. The
/// result does not depend on the order of `pairs`.
pub fn group_sizes(
    stats: &[PresenceStats],
    pairs: &[CorrelationPair],
    min_correlation: f64,
    max_p_value: f64,
) -> Vec<MarketMakerGroup> {
    let index: BTreeMap<SizeKey, usize> = stats
        .iter()
        .enumerate()
        .map(|(i, s)| (OrderedFloat(s.size), i))
        .collect();

    let mut forest = UnionFind::new(stats.len());
    let mut edges = 0usize;
    for pair in pairs.iter().filter(|p| is_linked(p, min_correlation, max_p_value)) {
        let (Some(&a), Some(&b)) = (
            index.get(&OrderedFloat(pair.size_1)),
            index.get(&OrderedFloat(pair.size_2)),
        ) else {
            continue;
        };
        forest.union(a, b);
        edges += 1;
    }

    let mut components: BTreeMap<usize, Vec<&PresenceStats>> = BTreeMap::new();
    for (i, s) in stats.iter().enumerate() {
        components.entry(forest.find(i)).or_default().push(s);
    }

    let mut groups: Vec<MarketMakerGroup> = components
        .into_values()
        .map(|members| {
            let mut sizes: Vec<f64> = members.iter().map(|s| s.size).collect();
            sizes.sort_by(f64::total_cmp);
            let avg_presence_fraction =
                members.iter().map(|s| s.presence_fraction).sum::<f64>() / members.len() as f64;
            MarketMakerGroup {
                sizes,
                avg_presence_fraction,
            }
        })
        .collect();
    groups.sort_by(|a, b| a.sizes[0].total_cmp(&b.sizes[0]));

    debug!(sizes = stats.len(), edges, groups = groups.len(), "grouped tracked sizes");
    groups
}
