//! Bounding Volume Hierarchy over a mesh's triangles.
//!
//! Uses a bucketed Surface Area Heuristic (SAH) for construction. The
//! hierarchy owns a copy of the triangle corners, so it stays valid (and
//! immutable) while the source mesh is mutated elsewhere.

use meshvis_math::{Point3, Tolerance};
use meshvis_mesh::TriMesh;

use crate::triangle::intersect_triangle;
use crate::{Aabb3, Ray, RayHit};

/// A BVH node - either a leaf containing faces or an internal node with children.
#[derive(Debug, Clone)]
enum BvhNode {
    /// Leaf node containing face indices.
    Leaf {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Faces contained in this leaf.
        faces: Vec<u32>,
    },
    /// Internal node with two children.
    Internal {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Left child node.
        left: Box<BvhNode>,
        /// Right child node.
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Bounding Volume Hierarchy for accelerated ray-mesh intersection.
///
/// Degenerate (zero-area) faces are left out of the hierarchy and are never
/// reported as hits. A mesh without faces yields an empty hierarchy that
/// misses every ray.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    triangles: Vec<[Point3; 3]>,
    indexed: usize,
}

/// Per-face data used during construction.
type BuildItem = (u32, Aabb3, Point3);

impl Bvh {
    /// Build a BVH from the current triangles of `mesh`.
    pub fn build(mesh: &TriMesh) -> Self {
        let tol = Tolerance::for_scale(mesh.diagonal());
        let triangles: Vec<[Point3; 3]> = (0..mesh.num_faces()).map(|f| mesh.triangle(f)).collect();

        let mut face_data: Vec<BuildItem> = triangles
            .iter()
            .enumerate()
            .filter(|&(f, _)| !mesh.face_is_degenerate(f, &tol))
            .map(|(f, corners)| {
                let aabb = Aabb3::from_triangle(corners);
                (f as u32, aabb, aabb.centroid())
            })
            .collect();

        let indexed = face_data.len();
        let root = if face_data.is_empty() {
            None
        } else {
            Some(build_node(&mut face_data))
        };

        log::debug!(
            "built BVH over {indexed} of {} faces",
            triangles.len()
        );

        Self {
            root,
            triangles,
            indexed,
        }
    }

    /// Number of faces stored in the hierarchy.
    pub fn len(&self) -> usize {
        self.indexed
    }

    /// Whether the hierarchy holds no faces.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Nearest hit with `t > t_min`, ignoring face `skip`.
    pub fn nearest_hit(&self, ray: &Ray, t_min: f64, skip: Option<u32>) -> Option<RayHit> {
        let mut closest: Option<RayHit> = None;
        let mut closest_t = f64::INFINITY;

        if let Some(ref root) = self.root {
            self.trace_node_closest(ray, root, t_min, skip, &mut closest, &mut closest_t);
        }

        closest
    }

    /// Whether anything is hit at `t > t_min`, ignoring face `skip`.
    pub fn occluded(&self, ray: &Ray, t_min: f64, skip: Option<u32>) -> bool {
        self.root
            .as_ref()
            .is_some_and(|root| self.trace_node_any(ray, root, t_min, skip))
    }

    /// All hits with `t > t_min`, ignoring face `skip`, sorted by `t`.
    pub fn all_hits(&self, ray: &Ray, t_min: f64, skip: Option<u32>) -> Vec<RayHit> {
        let mut hits = Vec::new();

        if let Some(ref root) = self.root {
            self.trace_node(ray, root, t_min, skip, &mut hits);
        }

        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits
    }

    /// Trace a ray through a single node, collecting every hit.
    fn trace_node(
        &self,
        ray: &Ray,
        node: &BvhNode,
        t_min: f64,
        skip: Option<u32>,
        hits: &mut Vec<RayHit>,
    ) {
        match node {
            BvhNode::Leaf { aabb, faces } => {
                if ray.intersect_aabb(aabb).is_some() {
                    hits.extend(
                        faces
                            .iter()
                            .filter_map(|&face| self.test_face(ray, face, t_min, skip)),
                    );
                }
            }
            BvhNode::Internal { aabb, left, right } => {
                if ray.intersect_aabb(aabb).is_some() {
                    self.trace_node(ray, left, t_min, skip, hits);
                    self.trace_node(ray, right, t_min, skip, hits);
                }
            }
        }
    }

    /// Trace a ray, stopping at the first hit found.
    fn trace_node_any(&self, ray: &Ray, node: &BvhNode, t_min: f64, skip: Option<u32>) -> bool {
        match node {
            BvhNode::Leaf { aabb, faces } => {
                ray.intersect_aabb(aabb).is_some()
                    && faces
                        .iter()
                        .any(|&face| self.test_face(ray, face, t_min, skip).is_some())
            }
            BvhNode::Internal { aabb, left, right } => {
                ray.intersect_aabb(aabb).is_some()
                    && (self.trace_node_any(ray, left, t_min, skip)
                        || self.trace_node_any(ray, right, t_min, skip))
            }
        }
    }

    /// Trace a ray, keeping only the closest hit.
    fn trace_node_closest(
        &self,
        ray: &Ray,
        node: &BvhNode,
        t_min: f64,
        skip: Option<u32>,
        closest: &mut Option<RayHit>,
        closest_t: &mut f64,
    ) {
        match node {
            BvhNode::Leaf { aabb, faces } => {
                if let Some((entry, _)) = ray.intersect_aabb(aabb) {
                    // Early out if AABB entry is beyond current closest
                    if entry >= *closest_t {
                        return;
                    }

                    for &face in faces {
                        if let Some(hit) = self.test_face(ray, face, t_min, skip) {
                            if hit.t < *closest_t {
                                *closest_t = hit.t;
                                *closest = Some(hit);
                            }
                        }
                    }
                }
            }
            BvhNode::Internal { aabb, left, right } => {
                if let Some((entry, _)) = ray.intersect_aabb(aabb) {
                    if entry >= *closest_t {
                        return;
                    }

                    // Test children in order of AABB distance
                    let left_t = ray.intersect_aabb(left.aabb()).map(|(t, _)| t);
                    let right_t = ray.intersect_aabb(right.aabb()).map(|(t, _)| t);

                    match (left_t, right_t) {
                        (Some(lt), Some(rt)) => {
                            let (near, far) = if lt <= rt { (left, right) } else { (right, left) };
                            self.trace_node_closest(ray, near, t_min, skip, closest, closest_t);
                            self.trace_node_closest(ray, far, t_min, skip, closest, closest_t);
                        }
                        (Some(_), None) => {
                            self.trace_node_closest(ray, left, t_min, skip, closest, closest_t);
                        }
                        (None, Some(_)) => {
                            self.trace_node_closest(ray, right, t_min, skip, closest, closest_t);
                        }
                        (None, None) => {}
                    }
                }
            }
        }
    }

    /// Test a ray against a single face.
    #[inline]
    fn test_face(&self, ray: &Ray, face: u32, t_min: f64, skip: Option<u32>) -> Option<RayHit> {
        if skip == Some(face) {
            return None;
        }
        let hit = intersect_triangle(ray, &self.triangles[face as usize])?;
        (hit.t > t_min).then(|| RayHit {
            t: hit.t,
            point: ray.at(hit.t),
            face,
            backface: hit.backface,
        })
    }
}

/// Build a BVH node recursively using SAH.
fn build_node(face_data: &mut [BuildItem]) -> BvhNode {
    // Compute bounds of all faces
    let mut bounds = Aabb3::empty();
    for (_, aabb, _) in face_data.iter() {
        bounds.include_box(aabb);
    }

    // Base case: small number of faces -> leaf
    if face_data.len() <= 4 {
        return BvhNode::Leaf {
            aabb: bounds,
            faces: face_data.iter().map(|(id, _, _)| *id).collect(),
        };
    }

    let mid = match find_best_split(face_data, &bounds) {
        Some((axis, pos)) => partition_faces(face_data, axis, pos),
        None => 0,
    };

    // Fallback if the split leaves one side empty: median split along the
    // widest centroid axis.
    let mid = if mid == 0 || mid == face_data.len() {
        let axis = widest_centroid_axis(face_data);
        let mid = face_data.len() / 2;
        face_data.select_nth_unstable_by(mid, |a, b| a.2[axis].total_cmp(&b.2[axis]));
        mid
    } else {
        mid
    };

    let (left_data, right_data) = face_data.split_at_mut(mid);

    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left_data)),
        right: Box::new(build_node(right_data)),
    }
}

/// Axis along which face centroids are most spread out.
fn widest_centroid_axis(face_data: &[BuildItem]) -> usize {
    let mut centroids = Aabb3::empty();
    for (_, _, c) in face_data {
        centroids.include_point(c);
    }
    let e = centroids.extent();
    if e.x >= e.y && e.x >= e.z {
        0
    } else if e.y >= e.z {
        1
    } else {
        2
    }
}

/// Find the best split axis and position using SAH.
///
/// Buckets are laid out over the centroid bounds. Returns `None` when every
/// centroid coincides.
fn find_best_split(face_data: &[BuildItem], bounds: &Aabb3) -> Option<(usize, f64)> {
    const NUM_BUCKETS: usize = 12;

    let mut centroid_bounds = Aabb3::empty();
    for (_, _, c) in face_data {
        centroid_bounds.include_point(c);
    }
    let extent = centroid_bounds.extent();
    let total_area = bounds.surface_area();

    let mut best: Option<(f64, usize, f64)> = None;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-12 {
            continue;
        }
        let axis_min = centroid_bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for (_, aabb, centroid) in face_data {
            let b = ((centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_box(aabb);
        }

        // Sweep to find best split
        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                left_bounds.include_box(&bucket_bounds[i]);
            }

            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                right_bounds.include_box(&bucket_bounds[i]);
            }

            if left_count == 0 || right_count == 0 {
                continue;
            }

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right
            let cost = 0.125
                + left_bounds.surface_area() / total_area * left_count as f64
                + right_bounds.surface_area() / total_area * right_count as f64;

            if best.map_or(true, |(c, _, _)| cost < c) {
                let pos = axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent;
                best = Some((cost, axis, pos));
            }
        }
    }

    best.map(|(_, axis, pos)| (axis, pos))
}

/// Partition faces by centroid along an axis.
fn partition_faces(face_data: &mut [BuildItem], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = face_data.len();

    while left < right {
        if face_data[left].2[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            face_data.swap(left, right);
        }
    }

    left
}
