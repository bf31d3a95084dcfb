//! Building, storing and querying a contraction hierarchy.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;
use std::time::Instant;

use fixedbitset::FixedBitSet;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ContractionConfig;
use crate::graph::{EdgeId, Graph, VertexId};

use super::profile::WeightProfile;

/// Error reading or writing a stored hierarchy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HierarchyError {
    #[error("failed to access hierarchy {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid hierarchy: {0}")]
    Json(String),
}

/// What a link stands for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum LinkVia {
    /// A graph edge, by index.
    Edge(u32),
    /// Two consecutive links, by index, around a contracted vertex.
    Shortcut { first: u32, second: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Link {
    from: u32,
    to: u32,
    weight: f64,
    via: LinkVia,
}

/// The graph's street edges and shortcuts, with every vertex ranked by
/// the order it was contracted in.
///
/// A query searches upward from both ends: forward from the source over
/// links to higher-ranked vertices and backward from the target over
/// links from higher-ranked vertices. The searches meet at the highest
/// vertex of a shortest path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractionHierarchy {
    profile: WeightProfile,
    vertex_count: usize,
    edge_count: usize,
    rank: Vec<u32>,
    links: Vec<Link>,
    /// Links leaving each vertex towards a higher rank.
    up: Vec<Vec<u32>>,
    /// Links entering each vertex from a higher rank.
    down: Vec<Vec<u32>>,
}

/// A shortest path found in the hierarchy, unpacked to graph edges.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyPath {
    pub edges: Vec<EdgeId>,
    pub weight: f64,
}

/// Why a query found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    Unreachable,
    TimedOut,
}

/// How many vertices a query settles between clock checks.
const DEADLINE_CHECK_INTERVAL: usize = 256;

impl ContractionHierarchy {
    /// Contract every vertex of `graph` under `profile`.
    pub fn build(graph: &Graph, profile: WeightProfile, config: &ContractionConfig) -> Self {
        let started = Instant::now();
        let mut contractor = Contractor::new(graph, &profile, config.witness_settle_limit);
        let original = contractor.links.len();
        let rank = contractor.contract_all();
        let links = contractor.links;

        let n = graph.vertex_count();
        let mut up = vec![Vec::new(); n];
        let mut down = vec![Vec::new(); n];
        for (i, link) in links.iter().enumerate() {
            let (from, to) = (link.from as usize, link.to as usize);
            if rank[to] > rank[from] {
                up[from].push(i as u32);
            } else {
                down[to].push(i as u32);
            }
        }
        info!(
            vertices = n,
            edges = original,
            shortcuts = links.len() - original,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "contraction hierarchy built"
        );
        Self {
            profile,
            vertex_count: n,
            edge_count: graph.edge_count(),
            rank,
            links,
            up,
            down,
        }
    }

    pub fn profile(&self) -> &WeightProfile {
        &self.profile
    }

    /// Returns true if this hierarchy was built from a graph the shape of
    /// `graph`.
    pub fn fits(&self, graph: &Graph) -> bool {
        self.vertex_count == graph.vertex_count() && self.edge_count == graph.edge_count()
    }

    pub fn shortcut_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| matches!(l.via, LinkVia::Shortcut { .. }))
            .count()
    }

    /// The position of `v` in the contraction order.
    pub fn rank(&self, v: VertexId) -> Option<u32> {
        self.rank.get(v.index()).copied()
    }

    pub fn to_json(&self) -> Result<String, HierarchyError> {
        serde_json::to_string(self).map_err(|e| HierarchyError::Json(e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, HierarchyError> {
        serde_json::from_str(json).map_err(|e| HierarchyError::Json(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HierarchyError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| HierarchyError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HierarchyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HierarchyError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// The lowest-weight path from `source` to `target`.
    pub fn query(
        &self,
        source: VertexId,
        target: VertexId,
        deadline: Option<Instant>,
    ) -> Result<HierarchyPath, QueryFailure> {
        let (s, t) = (source.index(), target.index());
        if s >= self.vertex_count || t >= self.vertex_count {
            return Err(QueryFailure::Unreachable);
        }
        if s == t {
            return Ok(HierarchyPath {
                edges: Vec::new(),
                weight: 0.0,
            });
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(QueryFailure::TimedOut);
        }

        let mut forward = Side::new(s as u32);
        let mut backward = Side::new(t as u32);
        let mut best: Option<(f64, u32)> = None;
        let mut settled = 0;
        loop {
            // A side stops once nothing it could settle beats the best
            // meeting found so far.
            let bound = best.map_or(f64::INFINITY, |(w, _)| w);
            let f = forward.peek().filter(|&d| d < bound);
            let b = backward.peek().filter(|&d| d < bound);
            let go_forward = match (f, b) {
                (Some(f), Some(b)) => f <= b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            settled += 1;
            if settled % DEADLINE_CHECK_INTERVAL == 0
                && deadline.is_some_and(|d| Instant::now() >= d)
            {
                warn!(?source, ?target, "hierarchy query timed out");
                return Err(QueryFailure::TimedOut);
            }

            let (side, other, adjacency) = if go_forward {
                (&mut forward, &backward, &self.up)
            } else {
                (&mut backward, &forward, &self.down)
            };
            let Some((d, v)) = side.pop() else {
                break;
            };
            if let Some(&(od, _)) = other.dist.get(&v) {
                let total = d + od;
                if best.is_none_or(|(w, _)| total < w) {
                    best = Some((total, v));
                }
            }
            for &i in &adjacency[v as usize] {
                let link = &self.links[i as usize];
                let next = if go_forward { link.to } else { link.from };
                side.relax(next, d + link.weight, i);
            }
        }

        let Some((weight, meeting)) = best else {
            return Err(QueryFailure::Unreachable);
        };
        let mut chain = forward.links_to(meeting, &self.links, true);
        chain.reverse();
        chain.extend(backward.links_to(meeting, &self.links, false));
        Ok(HierarchyPath {
            edges: self.unpack(&chain),
            weight,
        })
    }

    /// Replace every shortcut in `chain` by the graph edges it stands for.
    fn unpack(&self, chain: &[u32]) -> Vec<EdgeId> {
        let mut edges = Vec::new();
        let mut stack: Vec<u32> = chain.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            match self.links[i as usize].via {
                LinkVia::Edge(e) => edges.push(EdgeId(e)),
                LinkVia::Shortcut { first, second } => {
                    stack.push(second);
                    stack.push(first);
                }
            }
        }
        edges
    }
}

/// One direction of a query.
struct Side {
    dist: HashMap<u32, (f64, Option<u32>)>,
    queue: BinaryHeap<Reverse<(OrderedFloat<f64>, u32)>>,
}

impl Side {
    fn new(root: u32) -> Self {
        let mut dist = HashMap::new();
        dist.insert(root, (0.0, None));
        let mut queue = BinaryHeap::new();
        queue.push(Reverse((OrderedFloat(0.0), root)));
        Self { dist, queue }
    }

    /// The smallest key still queued, skipping stale entries.
    fn peek(&mut self) -> Option<f64> {
        while let Some(&Reverse((OrderedFloat(d), v))) = self.queue.peek() {
            if self.dist.get(&v).is_some_and(|&(best, _)| d > best) {
                self.queue.pop();
                continue;
            }
            return Some(d);
        }
        None
    }

    fn pop(&mut self) -> Option<(f64, u32)> {
        self.peek()?;
        self.queue.pop().map(|Reverse((OrderedFloat(d), v))| (d, v))
    }

    fn relax(&mut self, v: u32, d: f64, via: u32) {
        if self.dist.get(&v).is_none_or(|&(current, _)| d < current) {
            self.dist.insert(v, (d, Some(via)));
            self.queue.push(Reverse((OrderedFloat(d), v)));
        }
    }

    /// Links from the root to `v`, nearest `v` first.
    fn links_to(&self, mut v: u32, links: &[Link], forward: bool) -> Vec<u32> {
        let mut chain = Vec::new();
        while let Some(&(_, Some(i))) = self.dist.get(&v) {
            chain.push(i);
            let link = &links[i as usize];
            v = if forward { link.from } else { link.to };
        }
        chain
    }
}

/// Contraction state: the links of the remaining graph plus the shortcuts
/// added so far.
struct Contractor {
    links: Vec<Link>,
    outgoing: Vec<Vec<u32>>,
    incoming: Vec<Vec<u32>>,
    contracted: FixedBitSet,
    /// Contracted neighbours per vertex, to spread contraction evenly.
    removed_neighbours: Vec<u32>,
    settle_limit: usize,
}

/// A shortcut a contraction needs: `(first link, second link, weight)`.
type Needed = (u32, u32, f64);

impl Contractor {
    fn new(graph: &Graph, profile: &WeightProfile, settle_limit: usize) -> Self {
        let n = graph.vertex_count();
        let mut cheapest: HashMap<(u32, u32), (f64, u32)> = HashMap::new();
        for (id, edge) in graph.edges() {
            let Some(weight) = profile.edge_weight(edge) else {
                continue;
            };
            if edge.from() == edge.to() {
                continue;
            }
            let key = (edge.from().0, edge.to().0);
            if cheapest.get(&key).is_none_or(|&(w, _)| weight < w) {
                cheapest.insert(key, (weight, id.0));
            }
        }
        let mut originals: Vec<_> = cheapest.into_iter().collect();
        originals.sort_by_key(|&(_, (_, edge))| edge);

        let mut contractor = Self {
            links: Vec::with_capacity(originals.len()),
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
            contracted: FixedBitSet::with_capacity(n),
            removed_neighbours: vec![0; n],
            settle_limit: settle_limit.max(1),
        };
        for ((from, to), (weight, edge)) in originals {
            contractor.push(Link {
                from,
                to,
                weight,
                via: LinkVia::Edge(edge),
            });
        }
        contractor
    }

    fn push(&mut self, link: Link) {
        let i = self.links.len() as u32;
        self.outgoing[link.from as usize].push(i);
        self.incoming[link.to as usize].push(i);
        self.links.push(link);
    }

    fn live(&self, v: u32) -> bool {
        !self.contracted.contains(v as usize)
    }

    /// Contract every vertex, least important first. Returns each vertex's
    /// rank.
    fn contract_all(&mut self) -> Vec<u32> {
        let n = self.outgoing.len();
        let mut queue: BinaryHeap<Reverse<(i64, u32)>> = (0..n as u32)
            .map(|v| Reverse((self.priority(v), v)))
            .collect();
        let mut rank = vec![0; n];
        let mut next_rank = 0;
        while let Some(Reverse((expected, v))) = queue.pop() {
            if !self.live(v) {
                continue;
            }
            // Priorities go stale as neighbours are contracted; recompute
            // and requeue if the vertex is no longer the cheapest.
            let current = self.priority(v);
            if current > expected && queue.peek().is_some_and(|Reverse((p, _))| current > *p) {
                queue.push(Reverse((current, v)));
                continue;
            }
            self.contract(v);
            rank[v as usize] = next_rank;
            next_rank += 1;
        }
        debug!(vertices = n, "vertex order fixed");
        rank
    }

    /// Edge difference plus contracted neighbours.
    fn priority(&self, v: u32) -> i64 {
        let added = self.shortcuts_for(v).len() as i64;
        let removed = self.live_links(&self.incoming[v as usize], true).count()
            + self.live_links(&self.outgoing[v as usize], false).count();
        added - removed as i64 + i64::from(self.removed_neighbours[v as usize])
    }

    /// Links whose far end is still in the graph.
    fn live_links<'a>(&'a self, links: &'a [u32], incoming: bool) -> impl Iterator<Item = u32> + 'a {
        links.iter().copied().filter(move |&i| {
            let link = &self.links[i as usize];
            self.live(if incoming { link.from } else { link.to })
        })
    }

    fn contract(&mut self, v: u32) {
        let needed = self.shortcuts_for(v);
        let neighbours: Vec<u32> = self
            .live_links(&self.incoming[v as usize], true)
            .map(|i| self.links[i as usize].from)
            .chain(
                self.live_links(&self.outgoing[v as usize], false)
                    .map(|i| self.links[i as usize].to),
            )
            .collect();
        for (first, second, weight) in needed {
            let from = self.links[first as usize].from;
            let to = self.links[second as usize].to;
            self.push(Link {
                from,
                to,
                weight,
                via: LinkVia::Shortcut { first, second },
            });
        }
        self.contracted.insert(v as usize);
        for u in neighbours {
            self.removed_neighbours[u as usize] += 1;
        }
    }

    /// Shortcuts that contracting `v` would need: one for each pair of
    /// live neighbours `u -> v -> w` with no path at least as cheap that
    /// avoids `v`.
    fn shortcuts_for(&self, v: u32) -> Vec<Needed> {
        let outgoing: Vec<u32> = self.live_links(&self.outgoing[v as usize], false).collect();
        if outgoing.is_empty() {
            return Vec::new();
        }
        let mut needed = Vec::new();
        for first in self.live_links(&self.incoming[v as usize], true) {
            let head = self.links[first as usize];
            let limit = outgoing
                .iter()
                .map(|&i| head.weight + self.links[i as usize].weight)
                .fold(0.0, f64::max);
            let reached = self.witness_search(head.from, v, limit);
            for &second in &outgoing {
                let tail = &self.links[second as usize];
                if tail.to == head.from {
                    continue;
                }
                let via = head.weight + tail.weight;
                let witnessed = reached.get(&tail.to).is_some_and(|&d| d <= via);
                if !witnessed {
                    needed.push((first, second, via));
                }
            }
        }
        needed
    }

    /// Distances from `source` within `limit` over live vertices other
    /// than `avoid`, settling at most the configured number of vertices.
    fn witness_search(&self, source: u32, avoid: u32, limit: f64) -> HashMap<u32, f64> {
        let mut dist: HashMap<u32, f64> = HashMap::new();
        let mut queue = BinaryHeap::new();
        dist.insert(source, 0.0);
        queue.push(Reverse((OrderedFloat(0.0), source)));
        let mut settled = 0;
        while let Some(Reverse((OrderedFloat(d), u))) = queue.pop() {
            if dist.get(&u).is_some_and(|&best| d > best) {
                continue;
            }
            settled += 1;
            if settled > self.settle_limit {
                break;
            }
            for i in self.live_links(&self.outgoing[u as usize], false) {
                let link = &self.links[i as usize];
                if link.to == avoid {
                    continue;
                }
                let candidate = d + link.weight;
                if candidate > limit {
                    continue;
                }
                if dist.get(&link.to).is_none_or(|&current| candidate < current) {
                    dist.insert(link.to, candidate);
                    queue.push(Reverse((OrderedFloat(candidate), link.to)));
                }
            }
        }
        dist
    }
}
