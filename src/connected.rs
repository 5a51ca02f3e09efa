use std::collections::HashMap;

use glam::{DVec3, Vec2, Vec3};

use crate::{
    element::{AH, Handle, NH, Node, PH},
    error::Error,
    mesh::SharedMesh,
};

/// Per-corner surface data. Corners sharing a position may reference
/// different attribute instances across a seam.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct VertexAttribute {
    pub normal: Vec3,
    pub uv: Vec2,
}

/**
 * Classification of the edge between two positions.
 *
 * An edge is *in-surface* when the position pair appears in exactly two
 * triangles; otherwise it is a true border edge. An endpoint is *hard* when
 * the attribute id changes while circulating its sibling ring, and it
 * *touches a border* when any other edge incident to it is not in-surface.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Ordinary 2-manifold surface edge.
    Surface,
    /// Surface edge, attribute seam at endpoint A only.
    HardA,
    /// Surface edge, attribute seam at endpoint B only.
    HardB,
    /// Surface edge hard at both endpoints with a continuous seam across the
    /// shared faces. Still 2-manifold, still collapsible.
    HardSeam,
    /// Surface edge hard at both endpoints without a continuous seam. Only
    /// collapsed as a last resort.
    HardBoth,
    /// Surface edge whose endpoint A touches a border elsewhere.
    TouchesBorderA,
    /// Surface edge whose endpoint B touches a border elsewhere.
    TouchesBorderB,
    /// Endpoint A touches a border, endpoint B is an attribute seam.
    TouchesBorderAHardB,
    /// Endpoint B touches a border, endpoint A is an attribute seam.
    TouchesBorderBHardA,
    /// Both endpoints touch distinct borders. Collapsing would glue two
    /// boundaries together, so this is never chosen while alternatives exist.
    TouchesBorderBoth,
    /// True border edge. Carries the border-neighbor corner at each endpoint
    /// for the polyline curvature estimate.
    Border { neighbor_a: NH, neighbor_b: NH },
    /// Topology defect; should be unreachable on well-formed input.
    Unknown,
}

/**
 * Connectivity-aware triangle mesh.
 *
 * Corners ("nodes") live in one arena and carry two cyclic relations: the
 * `relative` 3-cycle linking the corners of a face, and the `sibling` ring
 * linking all corners sharing one position. Collapses mutate the graph in
 * place and mark dead corners with a tombstone; [`ConnectedMesh::compact`]
 * drops the tombstones and renumbers everything contiguously.
 */
pub struct ConnectedMesh {
    positions: Vec<DVec3>,
    attributes: Vec<VertexAttribute>,
    nodes: Vec<Node>,
    /// One live representative corner per position, kept current across
    /// collapses. `None` for positions with no live corner.
    position_to_node: Vec<Option<NH>>,
    face_count: usize,
    has_normals: bool,
    has_uvs: bool,
}

/// Cyclic traversal over one of the two node relations, starting at a given
/// node and stopping after a full loop.
pub(crate) struct RingIter<'a> {
    mesh: &'a ConnectedMesh,
    start: NH,
    current: Option<NH>,
    follow: fn(&Node) -> NH,
}

impl Iterator for RingIter<'_> {
    type Item = NH;

    fn next(&mut self) -> Option<NH> {
        let current = self.current?;
        let next = (self.follow)(self.mesh.node(current));
        self.current = if next == self.start { None } else { Some(next) };
        Some(current)
    }
}

impl ConnectedMesh {
    /// Build the connected representation from a flat shared mesh.
    ///
    /// Fails fast on malformed input; see [`SharedMesh::check_lengths`].
    pub fn build(mesh: &SharedMesh) -> Result<Self, Error> {
        mesh.check_lengths()?;
        let mut attributes = vec![VertexAttribute::default(); mesh.positions.len()];
        if let Some(normals) = &mesh.normals {
            for (attr, normal) in attributes.iter_mut().zip(normals.iter()) {
                attr.normal = *normal;
            }
        }
        if let Some(uvs) = &mesh.uvs {
            for (attr, uv) in attributes.iter_mut().zip(uvs.iter()) {
                attr.uv = *uv;
            }
        }
        let mut nodes = Vec::with_capacity(mesh.triangles.len());
        let mut position_nodes: Vec<Vec<NH>> = vec![Vec::new(); mesh.positions.len()];
        for triangle in mesh.triangles.chunks_exact(3) {
            let base = nodes.len() as u32;
            for (corner, &pi) in triangle.iter().enumerate() {
                let ni: NH = (base + corner as u32).into();
                nodes.push(Node {
                    position: pi.into(),
                    attribute: pi.into(),
                    relative: (base + ((corner as u32) + 1) % 3).into(),
                    sibling: ni,
                });
                position_nodes[pi as usize].push(ni);
            }
        }
        let face_count = nodes.len() / 3;
        let mut out = ConnectedMesh {
            positions: mesh.positions.clone(),
            attributes,
            nodes,
            position_to_node: vec![None; mesh.positions.len()],
            face_count,
            has_normals: mesh.normals.is_some(),
            has_uvs: mesh.uvs.is_some(),
        };
        for (p, ring) in position_nodes.iter().enumerate() {
            for (i, &n) in ring.iter().enumerate() {
                out.nodes[n.index() as usize].sibling = ring[(i + 1) % ring.len()];
            }
            out.position_to_node[p] = ring.first().copied();
        }
        debug_assert!(out.check().is_ok());
        Ok(out)
    }

    /// Flatten the live corners back into a shared mesh, deduplicating
    /// vertices by their (position, attribute) pair. Normal and uv arrays are
    /// emitted only when the source mesh supplied them.
    pub fn to_shared_mesh(&self) -> SharedMesh {
        let mut triangles = Vec::with_capacity(self.face_count * 3);
        let mut vertex_ids: HashMap<(PH, AH), u32> = HashMap::new();
        let mut vertices: Vec<(PH, AH)> = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        for i in 0..self.nodes.len() {
            if visited[i] || self.nodes[i].is_removed() {
                continue;
            }
            for n in self.face_cycle((i as u32).into()) {
                visited[n.index() as usize] = true;
                let node = self.node(n);
                let key = (node.position, node.attribute);
                let id = *vertex_ids.entry(key).or_insert_with(|| {
                    vertices.push(key);
                    (vertices.len() - 1) as u32
                });
                triangles.push(id);
            }
        }
        SharedMesh {
            positions: vertices
                .iter()
                .map(|(p, _)| self.positions[p.index() as usize])
                .collect(),
            normals: self.has_normals.then(|| {
                vertices
                    .iter()
                    .map(|(_, a)| self.attributes[a.index() as usize].normal)
                    .collect()
            }),
            uvs: self.has_uvs.then(|| {
                vertices
                    .iter()
                    .map(|(_, a)| self.attributes[a.index() as usize].uv)
                    .collect()
            }),
            triangles,
        }
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn num_positions(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn position(&self, p: PH) -> DVec3 {
        self.positions[p.index() as usize]
    }

    pub(crate) fn set_position(&mut self, p: PH, value: DVec3) {
        self.positions[p.index() as usize] = value;
    }

    pub(crate) fn attribute(&self, a: AH) -> &VertexAttribute {
        &self.attributes[a.index() as usize]
    }

    pub(crate) fn attribute_mut(&mut self, a: AH) -> &mut VertexAttribute {
        &mut self.attributes[a.index() as usize]
    }

    /// A live representative corner at the given position, if any survive.
    pub fn node_at(&self, p: PH) -> Option<NH> {
        self.position_to_node[p.index() as usize]
    }

    /// Positions that still have at least one live corner.
    pub(crate) fn live_positions(&self) -> impl Iterator<Item = (PH, NH)> + '_ {
        self.position_to_node
            .iter()
            .enumerate()
            .filter_map(|(p, n)| n.map(|n| ((p as u32).into(), n)))
    }

    pub(crate) fn node(&self, n: NH) -> &Node {
        &self.nodes[n.index() as usize]
    }

    pub(crate) fn node_mut(&mut self, n: NH) -> &mut Node {
        &mut self.nodes[n.index() as usize]
    }

    /// The corners of the face containing `start`, in cycle order.
    pub(crate) fn face_cycle(&self, start: NH) -> RingIter<'_> {
        RingIter {
            mesh: self,
            start,
            current: Some(start),
            follow: |node| node.relative,
        }
    }

    /// The corners sharing `start`'s position, in ring order.
    pub(crate) fn sibling_ring(&self, start: NH) -> RingIter<'_> {
        RingIter {
            mesh: self,
            start,
            current: Some(start),
            follow: |node| node.sibling,
        }
    }

    pub(crate) fn relatives_count(&self, n: NH) -> usize {
        self.face_cycle(n).count()
    }

    pub(crate) fn siblings_count(&self, n: NH) -> usize {
        self.sibling_ring(n).count()
    }

    /// Unnormalized face normal from the triangle's positions. This, not a
    /// stored attribute normal, is the source of truth for quadrics.
    pub fn face_normal(&self, n: NH) -> DVec3 {
        let pa = self.node(n).position;
        let pb = self.node(self.node(n).relative).position;
        let pc = self.node(self.node(self.node(n).relative).relative).position;
        (self.position(pb) - self.position(pa)).cross(self.position(pc) - self.position(pa))
    }

    /// True when the edge between the two corners' positions is shared by at
    /// least two live faces.
    pub(crate) fn is_edge_in_surface(&self, node_a: NH, node_b: NH) -> bool {
        let pos_b = self.node(node_b).position;
        let mut faces_attached = 0;
        let mut sibling = node_a;
        loop {
            let mut relative = self.node(sibling).relative;
            while relative != sibling {
                if self.node(relative).position == pos_b {
                    faces_attached += 1;
                    if faces_attached == 2 {
                        return true;
                    }
                }
                relative = self.node(relative).relative;
            }
            sibling = self.node(sibling).sibling;
            if sibling == node_a {
                break;
            }
        }
        false
    }

    /// True when the attribute seam is discontinuous on both sides of the
    /// edge across its two shared faces.
    pub(crate) fn is_edge_hard(&self, node_a: NH, node_b: NH) -> bool {
        let pos_b = self.node(node_b).position;
        let mut attr_at_a: Option<AH> = None;
        let mut attr_at_b: Option<AH> = None;
        let mut hard_a = false;
        let mut hard_b = false;
        let mut sibling = node_a;
        loop {
            let mut relative = self.node(sibling).relative;
            while relative != sibling {
                if self.node(relative).position == pos_b {
                    if attr_at_b.is_some_and(|a| a != self.node(relative).attribute) {
                        hard_b = true;
                    }
                    attr_at_b = Some(self.node(relative).attribute);
                    if attr_at_a.is_some_and(|a| a != self.node(sibling).attribute) {
                        hard_a = true;
                    }
                    attr_at_a = Some(self.node(sibling).attribute);
                }
                relative = self.node(relative).relative;
            }
            sibling = self.node(sibling).sibling;
            if sibling == node_a {
                break;
            }
        }
        hard_a && hard_b
    }

    /// Walk `start`'s sibling ring looking for an incident border edge (to a
    /// corner other than the one at `opposite`), and track whether the
    /// attribute id changes around the ring. Stops at the first border found,
    /// mirroring the classification's short-circuit.
    fn ring_border_and_hard(&self, start: NH, opposite: PH) -> (Option<NH>, bool) {
        let mut hard = false;
        let mut attr: Option<AH> = None;
        let mut sibling = start;
        loop {
            let mut relative = self.node(sibling).relative;
            while relative != sibling {
                if self.node(relative).position != opposite
                    && !self.is_edge_in_surface(sibling, relative)
                {
                    return (Some(relative), hard);
                }
                relative = self.node(relative).relative;
            }
            if attr.is_some_and(|a| a != self.node(sibling).attribute) {
                hard = true;
            }
            attr = Some(self.node(sibling).attribute);
            sibling = self.node(sibling).sibling;
            if sibling == start {
                break;
            }
        }
        (None, hard)
    }

    /// Classify the edge between the positions of the two corners.
    pub fn edge_kind(&self, node_a: NH, node_b: NH) -> EdgeKind {
        let pos_a = self.node(node_a).position;
        let pos_b = self.node(node_b).position;
        let (border_a, hard_a) = self.ring_border_and_hard(node_a, pos_b);
        let (border_b, hard_b) = self.ring_border_and_hard(node_b, pos_a);
        if self.is_edge_in_surface(node_a, node_b) {
            match (border_a.is_some(), border_b.is_some()) {
                (true, true) => EdgeKind::TouchesBorderBoth,
                (true, false) => {
                    if hard_b {
                        EdgeKind::TouchesBorderAHardB
                    } else {
                        EdgeKind::TouchesBorderA
                    }
                }
                (false, true) => {
                    if hard_a {
                        EdgeKind::TouchesBorderBHardA
                    } else {
                        EdgeKind::TouchesBorderB
                    }
                }
                (false, false) => match (hard_a, hard_b) {
                    (true, true) => {
                        if self.is_edge_hard(node_a, node_b) {
                            EdgeKind::HardSeam
                        } else {
                            EdgeKind::HardBoth
                        }
                    }
                    (true, false) => EdgeKind::HardA,
                    (false, true) => EdgeKind::HardB,
                    (false, false) => EdgeKind::Surface,
                },
            }
        } else {
            match (border_a, border_b) {
                (Some(neighbor_a), Some(neighbor_b)) => EdgeKind::Border {
                    neighbor_a,
                    neighbor_b,
                },
                _ => EdgeKind::Unknown,
            }
        }
    }

    /// Walk one sibling ring from `start`, chaining the live corners onto the
    /// accumulated (first, last) pair and relabeling them to `position`.
    fn relink_ring(
        &mut self,
        start: NH,
        position: PH,
        state: (Option<NH>, Option<NH>),
    ) -> (Option<NH>, Option<NH>) {
        let (mut first_valid, mut last_valid) = state;
        let mut sibling = start;
        loop {
            if !self.node(sibling).is_removed() {
                if first_valid.is_none() {
                    first_valid = Some(sibling);
                }
                if let Some(last) = last_valid {
                    self.node_mut(last).sibling = sibling;
                    self.node_mut(last).position = position;
                }
                last_valid = Some(sibling);
            }
            sibling = self.node(sibling).sibling;
            if sibling == start {
                break;
            }
        }
        (first_valid, last_valid)
    }

    /// Rebuild the sibling ring through `start`, skipping removed corners.
    /// Returns a surviving corner, or `None` when the whole ring is dead.
    pub(crate) fn reconnect_siblings(&mut self, start: NH) -> Option<NH> {
        let position = self
            .sibling_ring(start)
            .find(|&n| !self.node(n).is_removed())
            .map(|n| self.node(n).position)?;
        let (first, last) = self.relink_ring(start, position, (None, None));
        self.close_ring(first, last, position)
    }

    /// Splice the rings through `a` and `b` into one ring relabeled to
    /// `position`, skipping removed corners.
    fn reconnect_siblings_pair(&mut self, a: NH, b: NH, position: PH) -> Option<NH> {
        let state = self.relink_ring(a, position, (None, None));
        let (first, last) = self.relink_ring(b, position, state);
        self.close_ring(first, last, position)
    }

    fn close_ring(&mut self, first: Option<NH>, last: Option<NH>, position: PH) -> Option<NH> {
        match (first, last) {
            (Some(first), Some(last)) => {
                self.node_mut(last).sibling = first;
                self.node_mut(last).position = position;
                Some(first)
            }
            _ => None,
        }
    }

    /**
     * Merge the position at corner `node_b` into the position at `node_a`.
     *
     * Every face incident to both positions has its three corners marked
     * removed and the sibling ring at its third corner repaired. The two
     * surviving rings are then spliced into one ring at A's position, and B
     * is dropped from the live-position index.
     *
     * Returns a surviving representative corner at A, or `None` when nothing
     * survives (a fully degenerate or disconnected collapse) — a legitimate
     * terminal outcome, not an error.
     */
    pub fn collapse_edge(&mut self, node_a: NH, node_b: NH) -> Option<NH> {
        let pos_a = self.node(node_a).position;
        let pos_b = self.node(node_b).position;
        debug_assert_ne!(pos_a, pos_b, "corners must have different positions");
        debug_assert!(!self.node(node_a).is_removed());
        debug_assert!(!self.node(node_b).is_removed());
        debug_assert!(self.check_relatives(node_a).is_ok());
        debug_assert!(self.check_relatives(node_b).is_ok());
        debug_assert!(self.check_siblings(node_a).is_ok());
        debug_assert!(self.check_siblings(node_b).is_ok());
        let mut sibling_of_a = node_a;
        loop {
            // Circulate the face at this corner of A, looking for B and for
            // the third corner C.
            let mut face_touched = false;
            let mut edge_count = 0usize;
            // The third corner's position must be captured here, while the
            // corner is still live; removal below tombstones its slot.
            let mut third: Option<(NH, PH)> = None;
            let mut relative = sibling_of_a;
            loop {
                let pos_c = self.node(relative).position;
                if pos_c == pos_b {
                    face_touched = true;
                } else if pos_c != pos_a {
                    third = Some((relative, pos_c));
                }
                edge_count += 1;
                relative = self.node(relative).relative;
                if relative == sibling_of_a {
                    break;
                }
            }
            if face_touched && edge_count == 3 {
                // Remove the face, then repair the ring at C around the gap.
                let mut relative = sibling_of_a;
                loop {
                    self.node_mut(relative).mark_removed();
                    relative = self.node(relative).relative;
                    if relative == sibling_of_a {
                        break;
                    }
                }
                if let Some((node_c, pos_c)) = third {
                    debug_assert!(self.node(node_c).is_removed());
                    let valid_at_c = self.reconnect_siblings(node_c);
                    self.position_to_node[pos_c.index() as usize] = valid_at_c;
                }
                self.face_count -= 1;
            }
            sibling_of_a = self.node(sibling_of_a).sibling;
            if sibling_of_a == node_a {
                break;
            }
        }
        let valid_at_a = self.reconnect_siblings_pair(node_a, node_b, pos_a);
        self.position_to_node[pos_a.index() as usize] = valid_at_a;
        self.position_to_node[pos_b.index() as usize] = None;
        valid_at_a
    }

    /// Remove one face, repairing the sibling ring at each of its corners.
    pub fn remove_face(&mut self, n: NH) {
        let mut relative = n;
        loop {
            let position = self.node(relative).position;
            self.node_mut(relative).mark_removed();
            let valid = self.reconnect_siblings(relative);
            self.position_to_node[position.index() as usize] = valid;
            relative = self.node(relative).relative;
            if relative == n {
                break;
            }
        }
        self.face_count -= 1;
    }

    /// Drop tombstones and renumber nodes, positions and attributes
    /// contiguously. A single O(n) pass over each arena.
    pub fn compact(&mut self) {
        const ERR: &str = "compaction remap must cover all live elements";
        let mut node_map: Vec<Option<u32>> = vec![None; self.nodes.len()];
        let mut new_nodes = Vec::with_capacity(self.face_count * 3);
        for (i, node) in self.nodes.iter().enumerate() {
            if !node.is_removed() {
                node_map[i] = Some(new_nodes.len() as u32);
                new_nodes.push(*node);
            }
        }
        let mut pos_map: Vec<Option<u32>> = vec![None; self.positions.len()];
        let mut new_positions = Vec::new();
        for (p, position) in self.positions.iter().enumerate() {
            if self.position_to_node[p].is_some() {
                pos_map[p] = Some(new_positions.len() as u32);
                new_positions.push(*position);
            }
        }
        let mut attr_used = vec![false; self.attributes.len()];
        for node in &new_nodes {
            attr_used[node.attribute.index() as usize] = true;
        }
        let mut attr_map: Vec<Option<u32>> = vec![None; self.attributes.len()];
        let mut new_attributes = Vec::new();
        for (a, attr) in self.attributes.iter().enumerate() {
            if attr_used[a] {
                attr_map[a] = Some(new_attributes.len() as u32);
                new_attributes.push(*attr);
            }
        }
        for node in &mut new_nodes {
            node.relative = node_map[node.relative.index() as usize].expect(ERR).into();
            node.sibling = node_map[node.sibling.index() as usize].expect(ERR).into();
            node.position = pos_map[node.position.index() as usize].expect(ERR).into();
            node.attribute = attr_map[node.attribute.index() as usize].expect(ERR).into();
        }
        self.nodes = new_nodes;
        self.positions = new_positions;
        self.attributes = new_attributes;
        self.position_to_node = vec![None; self.positions.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            self.position_to_node[node.position.index() as usize] = Some((i as u32).into());
        }
        debug_assert!(self.check().is_ok());
    }

    /// Weld positions closer than `tolerance` (bucket quantization), remap
    /// the corners, rebuild the sibling rings, and remove faces that became
    /// degenerate.
    pub fn merge_positions(&mut self, tolerance: f64) {
        let quantize = |p: DVec3| {
            (
                (p.x / tolerance).round() as i64,
                (p.y / tolerance).round() as i64,
                (p.z / tolerance).round() as i64,
            )
        };
        let mut buckets: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut new_positions: Vec<DVec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.positions.len());
        for &position in &self.positions {
            let id = *buckets.entry(quantize(position)).or_insert_with(|| {
                new_positions.push(position);
                (new_positions.len() - 1) as u32
            });
            remap.push(id);
        }
        self.positions = new_positions;
        let mut position_nodes: Vec<Vec<NH>> = vec![Vec::new(); self.positions.len()];
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if node.is_removed() {
                continue;
            }
            node.position = remap[node.position.index() as usize].into();
            position_nodes[node.position.index() as usize].push((i as u32).into());
        }
        for (p, ring) in position_nodes.iter().enumerate() {
            for (i, &n) in ring.iter().enumerate() {
                self.nodes[n.index() as usize].sibling = ring[(i + 1) % ring.len()];
            }
        }
        self.position_to_node = position_nodes
            .iter()
            .map(|ring| ring.first().copied())
            .collect();
        // Welding can degenerate a face onto a single position; drop those.
        for i in 0..self.nodes.len() {
            let n: NH = (i as u32).into();
            if self.node(n).is_removed() {
                continue;
            }
            let mut last_pos = self.node(n).position;
            let mut relative = self.node(n).relative;
            while relative != n {
                let pos = self.node(relative).position;
                if pos == last_pos {
                    self.remove_face(relative);
                    break;
                }
                last_pos = pos;
                relative = self.node(relative).relative;
            }
        }
        debug_assert!(self.check().is_ok());
    }
}
