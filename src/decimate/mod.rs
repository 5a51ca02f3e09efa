/*!
Greedy edge-collapse decimation driven by quadric error metrics.

Each position carries the summed quadric of its incident face planes. Every
edge is a collapse candidate whose merged position and error depend on the
edge classification; the cheapest admissible candidate is collapsed, the
neighborhood re-evaluated, and the loop continues until the target is met.
*/

mod candidate;
mod queue;

use std::collections::{HashMap, HashSet};

use glam::{DVec3, Vec3};

use crate::{
    connected::ConnectedMesh,
    element::{AH, Handle, NH, PH},
    quadric::SymmetricMatrix,
};
use queue::{Candidate, CandidateQueue, PairKey};

/// Normals closer than this are welded into one attribute after a collapse.
const NORMAL_WELD_TOLERANCE: f32 = 1e-3;

/**
 * Incremental decimation state over a borrowed mesh.
 *
 * Construction evaluates every edge; [`Decimater::collapse_next`] then
 * performs one collapse at a time, so callers can drive the loop against a
 * face-count target, an error bound, or their own schedule.
 */
pub struct Decimater<'m> {
    mesh: &'m mut ConnectedMesh,
    quadrics: Vec<SymmetricMatrix>,
    queue: CandidateQueue,
    initial_faces: usize,
}

impl<'m> Decimater<'m> {
    pub fn new(mesh: &'m mut ConnectedMesh) -> Self {
        let initial_faces = mesh.face_count();
        let mut quadrics = vec![SymmetricMatrix::default(); mesh.num_positions()];
        for (p, _) in mesh.live_positions() {
            quadrics[p.index() as usize] = candidate::position_quadric(mesh, p);
        }
        // Each corner contributes the opposite edge of its face; over all
        // corners this covers every edge exactly once.
        let mut keys: HashSet<PairKey> = HashSet::new();
        for (_, node) in mesh.live_positions() {
            for sibling in mesh.sibling_ring(node) {
                let first = mesh.node(sibling).relative;
                let second = mesh.node(first).relative;
                keys.insert(PairKey::new(
                    mesh.node(first).position,
                    mesh.node(second).position,
                ));
            }
        }
        let mut queue = CandidateQueue::new();
        for key in keys {
            queue.insert(key, candidate::evaluate(mesh, &quadrics, key));
        }
        queue.rebuild_mins(mesh.face_count());
        Decimater {
            mesh,
            quadrics,
            queue,
            initial_faces,
        }
    }

    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    pub fn initial_face_count(&self) -> usize {
        self.initial_faces
    }

    /// Cheapest candidate whose collapse keeps face orientations. Rebuilds
    /// the window when the current one is exhausted, widening to the full
    /// candidate set before giving up.
    fn next_candidate(&mut self) -> Option<(PairKey, Candidate)> {
        if self.queue.mins().is_empty() {
            self.queue.rebuild_mins(self.mesh.face_count());
        }
        for pass in 0..3 {
            for i in 0..self.queue.mins().len() {
                let key = self.queue.mins()[i];
                if let Some(cand) = self.queue.get(&key).copied() {
                    if candidate::keeps_orientation(self.mesh, key, cand.position) {
                        return Some((key, cand));
                    }
                }
            }
            match pass {
                0 => self.queue.rebuild_mins(self.mesh.face_count()),
                1 => self.queue.rebuild_mins_all(),
                _ => {}
            }
        }
        None
    }

    /**
     * Collapse the cheapest admissible edge, unless its error exceeds
     * `max_error`. Returns the error paid, or `None` when nothing (further)
     * can be collapsed within the bound.
     */
    pub fn collapse_next(&mut self, max_error: f64) -> Option<f64> {
        if self.queue.is_empty() {
            return None;
        }
        let (key, cand) = self.next_candidate()?;
        // A NaN error (degenerate border geometry) is beyond any budget.
        if cand.error.is_nan() || cand.error > max_error {
            return None;
        }
        self.queue.remove(&key);
        self.collapse(key, cand);
        Some(cand.error)
    }

    fn collapse(&mut self, key: PairKey, cand: Candidate) {
        let (Some(node_a), Some(node_b)) = (self.mesh.node_at(key.a), self.mesh.node_at(key.b))
        else {
            return;
        };
        // Every edge around either endpoint is about to change; drop their
        // candidates before the topology moves under them.
        self.remove_pairs_around(key.a, node_a);
        self.remove_pairs_around(key.b, node_b);
        interpolate_attributes(self.mesh, node_a, key.b, cand.position);
        let Some(valid) = self.mesh.collapse_edge(node_a, node_b) else {
            // A disconnected patch vanished entirely; nothing to re-register.
            return;
        };
        self.mesh.set_position(key.a, cand.position);
        self.quadrics[key.a.index() as usize] = candidate::position_quadric(self.mesh, key.a);
        merge_attributes(self.mesh, valid);
        // Re-evaluate the edges around the merged position.
        let mut neighbors: Vec<PH> = Vec::new();
        {
            let mesh = &*self.mesh;
            for sibling in mesh.sibling_ring(valid) {
                let mut relative = mesh.node(sibling).relative;
                while relative != sibling {
                    neighbors.push(mesh.node(relative).position);
                    relative = mesh.node(relative).relative;
                }
            }
        }
        for pos_c in neighbors {
            let pair = PairKey::new(key.a, pos_c);
            if self.queue.contains(&pair) {
                continue;
            }
            self.quadrics[pos_c.index() as usize] =
                candidate::position_quadric(self.mesh, pos_c);
            let refreshed = candidate::evaluate(self.mesh, &self.quadrics, pair);
            self.queue.insert(pair, refreshed);
            self.queue.push_min(pair);
        }
    }

    fn remove_pairs_around(&mut self, center: PH, start: NH) {
        let mesh = &*self.mesh;
        let queue = &mut self.queue;
        for sibling in mesh.sibling_ring(start) {
            let mut relative = mesh.node(sibling).relative;
            while relative != sibling {
                queue.remove(&PairKey::new(center, mesh.node(relative).position));
                relative = mesh.node(relative).relative;
            }
        }
    }
}

/// Blend the attributes on both sides of the collapsing edge toward the
/// merged position, weighted by how far it lands from each endpoint.
fn interpolate_attributes(mesh: &mut ConnectedMesh, node_a: NH, pos_b: PH, target: DVec3) {
    let position_a = mesh.position(mesh.node(node_a).position);
    let position_b = mesh.position(pos_b);
    let an = (position_a - target).length();
    let bn = (position_b - target).length();
    let ratio = (if an + bn == 0.0 { 0.0 } else { an / (an + bn) }) as f32;
    let mut edges: Vec<(AH, AH)> = Vec::new();
    for sibling in mesh.sibling_ring(node_a) {
        for relative in mesh.face_cycle(sibling) {
            if mesh.node(relative).position == pos_b {
                edges.push((mesh.node(sibling).attribute, mesh.node(relative).attribute));
                break;
            }
        }
    }
    for (at_a, at_b) in edges {
        let normal = (ratio * mesh.attribute(at_a).normal
            + (1.0 - ratio) * mesh.attribute(at_b).normal)
            .normalize_or_zero();
        let uv = ratio * mesh.attribute(at_a).uv + (1.0 - ratio) * mesh.attribute(at_b).uv;
        mesh.attribute_mut(at_a).normal = normal;
        mesh.attribute_mut(at_a).uv = uv;
        mesh.attribute_mut(at_b).normal = normal;
        mesh.attribute_mut(at_b).uv = uv;
    }
}

/// Deduplicate the attributes in one sibling ring, welding normals that
/// ended up equal after interpolation so seams that closed disappear.
fn merge_attributes(mesh: &mut ConnectedMesh, start: NH) {
    let quantize = |n: Vec3| {
        (
            (n.x / NORMAL_WELD_TOLERANCE).round() as i32,
            (n.y / NORMAL_WELD_TOLERANCE).round() as i32,
            (n.z / NORMAL_WELD_TOLERANCE).round() as i32,
        )
    };
    let ring: Vec<NH> = mesh.sibling_ring(start).collect();
    let mut canonical: HashMap<(i32, i32, i32), AH> = HashMap::new();
    for &n in &ring {
        let attr = mesh.node(n).attribute;
        canonical.entry(quantize(mesh.attribute(attr).normal)).or_insert(attr);
    }
    for &n in &ring {
        let key = quantize(mesh.attribute(mesh.node(n).attribute).normal);
        if let Some(&attr) = canonical.get(&key) {
            mesh.node_mut(n).attribute = attr;
        }
    }
}

impl ConnectedMesh {
    /// Decimate until at most `ratio` of the current faces remain.
    pub fn decimate_to_ratio(&mut self, ratio: f32) {
        self.decimate_to_ratio_with(ratio, &mut |_| true);
    }

    /// Like [`ConnectedMesh::decimate_to_ratio`], reporting whole percents of
    /// progress. Returning `false` from the callback cancels the run.
    pub fn decimate_to_ratio_with(&mut self, ratio: f32, progress: &mut impl FnMut(u32) -> bool) {
        let target = (f64::from(ratio.clamp(0.0, 1.0)) * self.face_count() as f64).round() as usize;
        self.decimate_to_face_count_with(target, progress);
    }

    /// Decimate until at most `target` faces remain, or until only
    /// never-collapse candidates are left.
    pub fn decimate_to_face_count(&mut self, target: usize) {
        self.decimate_to_face_count_with(target, &mut |_| true);
    }

    pub fn decimate_to_face_count_with(
        &mut self,
        target: usize,
        progress: &mut impl FnMut(u32) -> bool,
    ) {
        let mut decimater = Decimater::new(self);
        let initial = decimater.initial_face_count();
        let span = initial.saturating_sub(target).max(1);
        let mut last_percent: Option<u32> = None;
        while decimater.face_count() > target {
            if decimater.collapse_next(f64::INFINITY).is_none() {
                break;
            }
            let done = initial - decimater.face_count();
            let percent = ((100.0 * done as f64 / span as f64).round() as u32).min(100);
            if last_percent.is_none_or(|last| percent > last) {
                last_percent = Some(percent);
                if !progress(percent) {
                    break;
                }
            }
        }
        self.compact();
    }

    /// Decimate while the cheapest collapse costs no more than `max_error`.
    pub fn decimate_to_error(&mut self, max_error: f64) {
        self.decimate_to_error_with(max_error, &mut |_| true);
    }

    /// Like [`ConnectedMesh::decimate_to_error`]. There is no face target to
    /// measure against, so the reported percent is of the faces removed so
    /// far relative to the initial count. Returning `false` cancels.
    pub fn decimate_to_error_with(
        &mut self,
        max_error: f64,
        progress: &mut impl FnMut(u32) -> bool,
    ) {
        let mut decimater = Decimater::new(self);
        let initial = decimater.initial_face_count().max(1);
        let mut last_percent: Option<u32> = None;
        while decimater.collapse_next(max_error).is_some() {
            let done = initial - decimater.face_count();
            let percent = ((100.0 * done as f64 / initial as f64).round() as u32).min(100);
            if last_percent.is_none_or(|last| percent > last) {
                last_percent = Some(percent);
                if !progress(percent) {
                    break;
                }
            }
        }
        self.compact();
    }
}
