use std::{cmp::Ordering, collections::HashMap};

use glam::DVec3;

use crate::{
    connected::EdgeKind,
    element::{Handle, PH},
};

/// Unordered pair of positions identifying an edge. Normalized so the
/// smaller index comes first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PairKey {
    pub a: PH,
    pub b: PH,
}

impl PairKey {
    pub fn new(p: PH, q: PH) -> Self {
        if p <= q {
            PairKey { a: p, b: q }
        } else {
            PairKey { a: q, b: p }
        }
    }
}

/// Evaluated collapse: the merged position, its error and the edge class
/// the evaluation was based on.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Candidate {
    pub error: f64,
    pub position: DVec3,
    pub kind: EdgeKind,
}

/**
 * Priority store for collapse candidates.
 *
 * All candidates live in a hash map; a small sorted window of the cheapest
 * keys is kept on the side so each iteration pays for a scan of the window
 * rather than a full ordering of the map. The window is rebuilt from scratch
 * whenever it runs dry, and cheap newcomers are spliced in as edges around a
 * collapse are re-evaluated.
 */
pub(crate) struct CandidateQueue {
    pairs: HashMap<PairKey, Candidate>,
    mins: Vec<PairKey>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        CandidateQueue {
            pairs: HashMap::new(),
            mins: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains(&self, key: &PairKey) -> bool {
        self.pairs.contains_key(key)
    }

    pub fn get(&self, key: &PairKey) -> Option<&Candidate> {
        self.pairs.get(key)
    }

    /// Insert or overwrite a candidate. The window is left untouched; use
    /// [`CandidateQueue::push_min`] to splice the key in.
    pub fn insert(&mut self, key: PairKey, candidate: Candidate) {
        self.pairs.insert(key, candidate);
    }

    /// Drop a candidate from the map and from the window.
    pub fn remove(&mut self, key: &PairKey) -> Option<Candidate> {
        let candidate = self.pairs.remove(key);
        if candidate.is_some() {
            if let Some(i) = self.mins.iter().position(|k| k == key) {
                self.mins.remove(i);
            }
        }
        candidate
    }

    pub fn mins(&self) -> &[PairKey] {
        &self.mins
    }

    /// Window size scales gently with the live face count so that large
    /// meshes amortize the rebuild cost over more iterations.
    fn window_size(&self, face_count: usize) -> usize {
        ((0.01 * face_count as f64 + 100.0) as usize).min(self.pairs.len())
    }

    fn rank(&self, key: &PairKey) -> (f64, u32, u32) {
        let error = self.pairs.get(key).map_or(f64::INFINITY, |c| c.error);
        (error, key.a.index(), key.b.index())
    }

    /// Deterministic total order: by error, then by the key itself so equal
    /// errors never depend on hash iteration order.
    fn compare(&self, x: &PairKey, y: &PairKey) -> Ordering {
        let (ex, xa, xb) = self.rank(x);
        let (ey, ya, yb) = self.rank(y);
        ex.total_cmp(&ey).then(xa.cmp(&ya)).then(xb.cmp(&yb))
    }

    /// Rebuild the window with the cheapest keys for the given face count.
    pub fn rebuild_mins(&mut self, face_count: usize) {
        let window = self.window_size(face_count);
        self.rebuild(window);
    }

    /// Rebuild the window over every candidate. Last resort when repeated
    /// standard rebuilds keep yielding nothing collapsible.
    pub fn rebuild_mins_all(&mut self) {
        self.rebuild(self.pairs.len());
    }

    fn rebuild(&mut self, window: usize) {
        let mut keys: Vec<PairKey> = self.pairs.keys().copied().collect();
        if window > 0 && window < keys.len() {
            keys.select_nth_unstable_by(window - 1, |x, y| self.compare(x, y));
            keys.truncate(window);
        }
        keys.sort_unstable_by(|x, y| self.compare(x, y));
        self.mins = keys;
    }

    /// Splice a key into the sorted window if it ranks strictly before the
    /// current tail; otherwise it waits for the next rebuild.
    pub fn push_min(&mut self, key: PairKey) {
        debug_assert!(self.pairs.contains_key(&key));
        let i = self
            .mins
            .binary_search_by(|k| self.compare(k, &key))
            .unwrap_or_else(|i| i);
        if i < self.mins.len() {
            self.mins.insert(i, key);
        }
    }
}
