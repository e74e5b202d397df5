//! Rational bicubic Bezier patch sets.
//!
//! Patches are refined at construction time until every leaf patch has a
//! well-formed, noticeably-flat bounding parallelepiped; intersection then
//! walks an approximately distance-sorted stack of patches, subdividing
//! transient copies until the flatness tolerances accept a midpoint hit.

use super::Viewable;
use crate::error::GeomError;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::{DVec2, DVec3, DVec4};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;
use vmath::util::set_from_hg;

use super::parallelepiped::Parallelepiped;
use super::sphere::Sphere;

/// Tolerances for the subdivision intersector. Absolute, so scene-scale
/// dependent; kept together so a scale-relative variant is a local change.
mod tolerance {
    /// Midpoint acceptance: squared distance from the evaluated patch point
    /// to the candidate ray point.
    pub const MIDPOINT_ACCEPT_DIST_SQ: f64 = 1.0e-8;
    /// Tight acceptance that does not require a thin patch.
    pub const TIGHT_ACCEPT_DIST_SQ: f64 = 1.0e-13;
    /// A patch this thin is accepted with the loose midpoint test.
    pub const FLAT_THICKNESS: f64 = 1.0e-8;
    /// Stop subdividing below this thickness regardless of depth.
    pub const RECURSE_THICKNESS: f64 = 1.0e-10;
    /// Patches with near-zero lateral extent are abandoned.
    pub const MIN_LATERAL_EXTENT: f64 = 1.0e-14;
}

/// Maximum live patches during one ray's subdivision walk.
const MAX_ACTIVE_PATCHES: usize = 192;
/// Subdivision depth cap during intersection.
const MAX_ISECT_RECURSE: u32 = 18;
/// Construction-time refinement rounds before giving up on a bad patch.
const MAX_REFINE_ROUNDS: u32 = 8;

static REFINE_BUDGET_WARNED: AtomicBool = AtomicBool::new(false);
static STACK_OVERFLOW_WARNED: AtomicBool = AtomicBool::new(false);

/// A single degree 3x3 rational patch with its bounding parallelepiped.
#[derive(Clone)]
pub struct BezierPatch {
    /// Homogeneous control points, `cntl_pts[i][j]` with `i` along u.
    cntl_pts: [[DVec4; 4]; 4],
    uv_min: DVec2,
    uv_max: DVec2,
    face_num: usize,

    normal_a: DVec3,
    normal_b: DVec3,
    normal_c: DVec3,
    min_dot_a: f64,
    max_dot_a: f64,
    min_dot_b: f64,
    max_dot_b: f64,
    min_dot_c: f64,
    max_dot_c: f64,
    ppd_bad: bool,
}

impl BezierPatch {
    fn new(cntl_pts: [[DVec4; 4]; 4]) -> Self {
        Self {
            cntl_pts,
            uv_min: DVec2::ZERO,
            uv_max: DVec2::ONE,
            face_num: 0,
            normal_a: DVec3::Z,
            normal_b: DVec3::X,
            normal_c: DVec3::Y,
            min_dot_a: 0.0,
            max_dot_a: 0.0,
            min_dot_b: 0.0,
            max_dot_b: 0.0,
            min_dot_c: 0.0,
            max_dot_c: 0.0,
            ppd_bad: false,
        }
    }

    fn has_point_at_infinity(&self) -> bool {
        self.cntl_pts
            .iter()
            .flatten()
            .any(|cp| cp.w == 0.0)
    }

    /// Min/max of `n . (xyz/w)` over the control points.
    fn min_max_dot(&self, n: DVec3) -> (f64, f64) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for cp in self.cntl_pts.iter().flatten() {
            let dot = n.dot(cp.truncate()) / cp.w;
            min = min.min(dot);
            max = max.max(dot);
        }
        (min, max)
    }

    /// Bounding parallelepiped from the corner quadrilateral: C is the
    /// thickness direction, A and B the lateral ones.
    fn calc_bounding_ppd(&mut self) {
        let corner_a = set_from_hg(self.cntl_pts[0][0]);
        let corner_b = set_from_hg(self.cntl_pts[3][0]);
        let corner_c = set_from_hg(self.cntl_pts[3][3]);
        let corner_d = set_from_hg(self.cntl_pts[0][3]);

        let diag_ac = corner_c - corner_a;
        let diag_bd = corner_d - corner_b;
        let mut normal_c = diag_ac.cross(diag_bd);
        let mut normal_a = (diag_ac + diag_bd).cross(normal_c);
        let mut normal_b = normal_c.cross(diag_ac - diag_bd);

        self.ppd_bad = false;
        for n in [&mut normal_c, &mut normal_a, &mut normal_b] {
            let norm_sq = n.length_squared();
            if norm_sq > 0.0 {
                *n /= norm_sq.sqrt();
            } else {
                self.ppd_bad = true;
            }
        }
        if self.ppd_bad {
            normal_a = DVec3::Z;
            normal_b = DVec3::X;
            normal_c = DVec3::Y;
        }
        self.normal_a = normal_a;
        self.normal_b = normal_b;
        self.normal_c = normal_c;

        (self.min_dot_c, self.max_dot_c) = self.min_max_dot(normal_c);
        (self.min_dot_a, self.max_dot_a) = self.min_max_dot(normal_a);
        (self.min_dot_b, self.max_dot_b) = self.min_max_dot(normal_b);
    }

    /// "Nice": thickness at most half of both lateral extents.
    fn ppd_nice(&self) -> bool {
        if self.ppd_bad {
            return false;
        }
        let delta_c = self.max_dot_c - self.min_dot_c;
        delta_c < 0.5 * (self.max_dot_b - self.min_dot_b)
            && delta_c < 0.5 * (self.max_dot_a - self.min_dot_a)
    }

    fn thickness(&self) -> f64 {
        self.max_dot_c - self.min_dot_c
    }

    fn lateral_extent(&self) -> f64 {
        (self.max_dot_a - self.min_dot_a) + (self.max_dot_b - self.min_dot_b)
    }

    fn ray_hits_ppd(&self, pos: DVec3, dir: DVec3, max_dist: f64) -> Option<(f64, f64)> {
        Parallelepiped::quick_intersect_slabs(
            pos,
            dir,
            max_dist,
            self.normal_a,
            self.min_dot_a,
            self.max_dot_a,
            self.normal_b,
            self.min_dot_b,
            self.max_dot_b,
            self.normal_c,
            self.min_dot_c,
            self.max_dot_c,
        )
    }

    /// True when the u span (corner chord lengths) dominates the v span.
    fn u_span_longer(&self) -> bool {
        let size_u = (set_from_hg(self.cntl_pts[3][0]) - set_from_hg(self.cntl_pts[0][0]))
            .length_squared()
            + (set_from_hg(self.cntl_pts[3][3]) - set_from_hg(self.cntl_pts[0][3]))
                .length_squared();
        let size_v = (set_from_hg(self.cntl_pts[0][3]) - set_from_hg(self.cntl_pts[0][0]))
            .length_squared()
            + (set_from_hg(self.cntl_pts[3][3]) - set_from_hg(self.cntl_pts[3][0]))
                .length_squared();
        size_u >= size_v
    }

    /// De Casteljau split of one cubic at the midpoint: seven control
    /// points, the halves sharing `out[3]`.
    fn de_casteljau_half(input: &[DVec4; 4]) -> [DVec4; 7] {
        let mid = |a: DVec4, b: DVec4| (a + b) * 0.5;
        let mut out = [DVec4::ZERO; 7];
        out[0] = input[0];
        out[6] = input[3];
        out[1] = mid(input[0], input[1]);
        out[5] = mid(input[2], input[3]);
        let m = mid(input[1], input[2]);
        out[2] = mid(out[1], m);
        out[4] = mid(m, out[5]);
        out[3] = mid(out[2], out[4]);
        out
    }

    /// De Casteljau evaluation at `alpha`; `out[3]` is the curve point.
    fn de_casteljau_at(alpha: f64, input: &[DVec4; 4]) -> [DVec4; 7] {
        let lerp = |a: DVec4, b: DVec4| a + (b - a) * alpha;
        let mut out = [DVec4::ZERO; 7];
        out[0] = input[0];
        out[6] = input[3];
        out[1] = lerp(input[0], input[1]);
        out[5] = lerp(input[2], input[3]);
        let m = lerp(input[1], input[2]);
        out[2] = lerp(out[1], m);
        out[4] = lerp(m, out[5]);
        out[3] = lerp(out[2], out[4]);
        out
    }

    /// Split in the u direction; bounding data of the halves is stale until
    /// `calc_bounding_ppd` runs on them.
    fn split_u(&self) -> (BezierPatch, BezierPatch) {
        let mut lo = self.clone();
        let mut hi = self.clone();
        for j in 0..4 {
            let column = [
                self.cntl_pts[0][j],
                self.cntl_pts[1][j],
                self.cntl_pts[2][j],
                self.cntl_pts[3][j],
            ];
            let out = Self::de_casteljau_half(&column);
            for i in 0..4 {
                lo.cntl_pts[i][j] = out[i];
                hi.cntl_pts[i][j] = out[i + 3];
            }
        }
        let u_half = (self.uv_min.x + self.uv_max.x) * 0.5;
        lo.uv_max.x = u_half;
        hi.uv_min.x = u_half;
        (lo, hi)
    }

    fn split_v(&self) -> (BezierPatch, BezierPatch) {
        let mut lo = self.clone();
        let mut hi = self.clone();
        for i in 0..4 {
            let out = Self::de_casteljau_half(&self.cntl_pts[i]);
            for j in 0..4 {
                lo.cntl_pts[i][j] = out[j];
                hi.cntl_pts[i][j] = out[j + 3];
            }
        }
        let v_half = (self.uv_min.y + self.uv_max.y) * 0.5;
        lo.uv_max.y = v_half;
        hi.uv_min.y = v_half;
        (lo, hi)
    }

    fn split_longer_axis(&self) -> (BezierPatch, BezierPatch) {
        if self.u_span_longer() {
            self.split_u()
        } else {
            self.split_v()
        }
    }

    /// Homogeneous patch value at local `(u, v)` in `[0,1]^2`.
    fn eval(&self, uv: DVec2) -> DVec4 {
        let mut mid = [DVec4::ZERO; 4];
        for i in 0..4 {
            mid[i] = Self::de_casteljau_at(uv.y, &self.cntl_pts[i])[3];
        }
        Self::de_casteljau_at(uv.x, &mid)[3]
    }

    /// Homogeneous first derivative along one cubic, falling through to the
    /// second and third derivatives when lower ones vanish (L'Hopital).
    fn eval_deriv_hg(alpha: f64, pts: &[DVec4; 4]) -> Option<DVec4> {
        let d1 = [pts[1] - pts[0], pts[2] - pts[1], pts[3] - pts[2]];
        let lerp = |a: DVec4, b: DVec4| a + (b - a) * alpha;
        let first = lerp(lerp(d1[0], d1[1]), lerp(d1[1], d1[2]));
        if first.length_squared() > 1.0e-50 {
            return Some(first * 3.0);
        }
        let d2 = [d1[1] - d1[0], d1[2] - d1[1]];
        let second = lerp(d2[0], d2[1]);
        if second.length_squared() > 1.0e-50 {
            return Some(second * 6.0);
        }
        let third = (d2[1] - d2[0]) * 6.0;
        if third.length_squared() > 1.0e-50 {
            Some(third)
        } else {
            None
        }
    }

    /// Cartesian derivative from a homogeneous value and derivative.
    fn rational_deriv(value: DVec4, deriv: DVec4) -> DVec3 {
        (deriv.truncate() * value.w - value.truncate() * deriv.w) / (value.w * value.w)
    }

    /// Control points of the u-curve through local `v` and the v-curve
    /// through local `u`.
    fn iso_curves(&self, uv: DVec2) -> ([DVec4; 4], [DVec4; 4]) {
        let mut u_curve = [DVec4::ZERO; 4];
        for i in 0..4 {
            u_curve[i] = Self::de_casteljau_at(uv.y, &self.cntl_pts[i])[3];
        }
        let mut v_curve = [DVec4::ZERO; 4];
        for j in 0..4 {
            let column = [
                self.cntl_pts[0][j],
                self.cntl_pts[1][j],
                self.cntl_pts[2][j],
                self.cntl_pts[3][j],
            ];
            v_curve[j] = Self::de_casteljau_at(uv.x, &column)[3];
        }
        (u_curve, v_curve)
    }

    /// Surface normal at local `(u, v)`, using the derivative fallbacks and
    /// the bounding parallelepiped's thickness axis as a last resort.
    fn eval_normal(&self, uv: DVec2, patch_value: DVec4) -> DVec3 {
        let (u_curve, v_curve) = self.iso_curves(uv);
        let partial_u = Self::eval_deriv_hg(uv.x, &u_curve)
            .map(|d| Self::rational_deriv(patch_value, d));
        let partial_v = Self::eval_deriv_hg(uv.y, &v_curve)
            .map(|d| Self::rational_deriv(patch_value, d));
        if let (Some(du), Some(dv)) = (partial_u, partial_v) {
            let normal = du.cross(dv);
            if normal.length_squared() > 0.0 {
                return normal.normalize();
            }
        }
        self.normal_c
    }

    /// First partials in local uv, without the derivative fallbacks; `None`
    /// at a parameterization singularity.
    fn calc_local_partials(&self, uv: DVec2) -> Option<(DVec3, DVec3)> {
        let value = self.eval(uv);
        let (u_curve, v_curve) = self.iso_curves(uv);
        let lerp = |a: DVec4, b: DVec4, t: f64| a + (b - a) * t;
        let first_only = |alpha: f64, pts: &[DVec4; 4]| {
            let d1 = [pts[1] - pts[0], pts[2] - pts[1], pts[3] - pts[2]];
            lerp(
                lerp(d1[0], d1[1], alpha),
                lerp(d1[1], d1[2], alpha),
                alpha,
            ) * 3.0
        };
        let du = Self::rational_deriv(value, first_only(uv.x, &u_curve));
        let dv = Self::rational_deriv(value, first_only(uv.y, &v_curve));
        if du.cross(dv).length_squared() == 0.0 {
            None
        } else {
            Some((du, dv))
        }
    }
}

/// Entry on the intersection work stack.
struct PatchStackEntry {
    patch: BezierPatch,
    dist_in: f64,
    dist_out: f64,
    recurse_level: u32,
}

/// A set of rational bicubic patches sharing front/back materials.
pub struct BezierSet {
    /// The 4x4 input patches, kept for partial-derivative queries.
    original_patches: Vec<BezierPatch>,
    /// Refined leaf patches, all with nice bounding parallelepipeds.
    patches: Vec<BezierPatch>,
    patch_counter: usize,

    next_uv_min: DVec2,
    next_uv_max: DVec2,

    front_material: Arc<dyn Material>,
    back_material: Arc<dyn Material>,

    bounding_sphere_center: DVec3,
    bounding_sphere_radius_sq: f64,
    bounding_center_manual: bool,
}

impl BezierSet {
    pub fn new(material: Arc<dyn Material>) -> Self {
        Self {
            original_patches: Vec::new(),
            patches: Vec::new(),
            patch_counter: 0,
            next_uv_min: DVec2::ZERO,
            next_uv_max: DVec2::ONE,
            front_material: material.clone(),
            back_material: material,
            bounding_sphere_center: DVec3::ZERO,
            bounding_sphere_radius_sq: 0.0,
            bounding_center_manual: false,
        }
    }

    pub fn set_material_front(&mut self, material: Arc<dyn Material>) {
        self.front_material = material;
    }

    pub fn set_material_back(&mut self, material: Arc<dyn Material>) {
        self.back_material = material;
    }

    /// uv rectangle assigned to patches added after this call.
    pub fn set_uv_range(&mut self, uv_min: DVec2, uv_max: DVec2) {
        self.next_uv_min = uv_min;
        self.next_uv_max = uv_max;
    }

    /// Override the automatically estimated bounding sphere center.
    pub fn set_bounding_sphere_center(&mut self, center: DVec3) {
        self.bounding_sphere_center = center;
        self.bounding_center_manual = true;
        self.recalc_bounding_sphere();
    }

    pub fn num_patches(&self) -> usize {
        self.patch_counter
    }

    pub fn num_refined_patches(&self) -> usize {
        self.patches.len()
    }

    /// Add a polynomial patch of order 3 or 4 in each direction; control
    /// points with u varying fastest.
    pub fn add_patch(
        &mut self,
        u_order: usize,
        v_order: usize,
        control_points: &[DVec3],
    ) -> Result<usize, GeomError> {
        let hg: Vec<DVec4> = control_points.iter().map(|p| p.extend(1.0)).collect();
        self.add_rational_patch(u_order, v_order, &hg)
    }

    /// Add a rational patch of order 3 or 4 in each direction.
    pub fn add_rational_patch(
        &mut self,
        u_order: usize,
        v_order: usize,
        control_points: &[DVec4],
    ) -> Result<usize, GeomError> {
        if !(3..=4).contains(&u_order) || !(3..=4).contains(&v_order) {
            return Err(GeomError::BadPatchOrder(u_order, v_order));
        }
        debug_assert_eq!(control_points.len(), u_order * v_order);

        let mut pts = [[DVec4::ZERO; 4]; 4];
        for j in 0..v_order {
            for i in 0..u_order {
                pts[i][j] = control_points[j * u_order + i];
            }
        }
        if u_order == 3 {
            for j in 0..v_order {
                let row = [pts[0][j], pts[1][j], pts[2][j]];
                pts[0][j] = row[0];
                pts[1][j] = row[0] / 3.0 + row[1] * (2.0 / 3.0);
                pts[2][j] = row[2] / 3.0 + row[1] * (2.0 / 3.0);
                pts[3][j] = row[2];
            }
        }
        if v_order == 3 {
            for row in &mut pts {
                let col = [row[0], row[1], row[2]];
                row[0] = col[0];
                row[1] = col[0] / 3.0 + col[1] * (2.0 / 3.0);
                row[2] = col[2] / 3.0 + col[1] * (2.0 / 3.0);
                row[3] = col[2];
            }
        }

        let face_num = self.patch_counter;
        let mut original = BezierPatch::new(pts);
        original.face_num = face_num;
        original.uv_min = self.next_uv_min;
        original.uv_max = self.next_uv_max;
        self.original_patches.push(original.clone());

        self.refine_and_store(original);
        self.patch_counter += 1;
        self.recalc_bounding_sphere();
        Ok(face_num)
    }

    /// Subdivide until every leaf has a nice bounding parallelepiped and no
    /// point at infinity. The first round splits four ways, later rounds
    /// two ways along the longer surface axis.
    fn refine_and_store(&mut self, root: BezierPatch) {
        let mut work = vec![root];
        let mut round = 0u32;
        loop {
            let mut next = Vec::with_capacity(work.len());
            let mut any_split = false;
            for mut patch in work {
                let needs_split = if patch.has_point_at_infinity() {
                    true
                } else {
                    patch.calc_bounding_ppd();
                    !patch.ppd_nice()
                };
                if !needs_split {
                    next.push(patch);
                    continue;
                }
                any_split = true;
                if round == 0 {
                    let (u0, u1) = patch.split_u();
                    let (a, b) = u0.split_v();
                    let (c, d) = u1.split_v();
                    next.extend([a, b, c, d]);
                } else {
                    let (a, b) = patch.split_longer_axis();
                    next.extend([a, b]);
                }
            }
            work = next;
            if !any_split {
                break;
            }
            round += 1;
            if round > MAX_REFINE_ROUNDS {
                // Keep the scene; this patch set may render with artifacts.
                if !REFINE_BUDGET_WARNED.swap(true, Ordering::Relaxed) {
                    warn!(
                        rounds = MAX_REFINE_ROUNDS,
                        "Bezier patch refinement budget exceeded; patch may be badly formed"
                    );
                }
                for patch in &mut work {
                    patch.calc_bounding_ppd();
                }
                break;
            }
        }
        self.patches.extend(work);
    }

    fn recalc_bounding_sphere(&mut self) {
        if !self.bounding_center_manual {
            let mut accum = DVec3::ZERO;
            let mut count = 0usize;
            for patch in &self.patches {
                for cp in patch.cntl_pts.iter().flatten() {
                    accum += set_from_hg(*cp);
                    count += 1;
                }
            }
            if count > 0 {
                self.bounding_sphere_center = accum / count as f64;
            }
        }
        let mut radius_sq = 0.0f64;
        for patch in &self.patches {
            for cp in patch.cntl_pts.iter().flatten() {
                let dist_sq = set_from_hg(*cp).distance_squared(self.bounding_sphere_center);
                radius_sq = radius_sq.max(dist_sq);
            }
        }
        self.bounding_sphere_radius_sq = radius_sq;
    }

    /// Insert an entry keeping the stack approximately sorted with the
    /// nearest patch on top; only the last `sort_range` entries are
    /// compared against.
    fn push_sorted(stack: &mut Vec<PatchStackEntry>, entry: PatchStackEntry, sort_range: usize) {
        let mut index = stack.len();
        let mut budget = sort_range;
        while index > 0 && budget > 0 {
            if entry.dist_in <= stack[index - 1].dist_in {
                break;
            }
            index -= 1;
            budget -= 1;
        }
        stack.insert(index, entry);
    }
}

impl Viewable for BezierSet {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        Sphere::quick_intersect_test(
            view_pos,
            view_dir,
            max_dist,
            self.bounding_sphere_center,
            self.bounding_sphere_radius_sq,
        )?;

        // Seed the stack with every refined patch the ray can touch.
        let mut stack: Vec<PatchStackEntry> = Vec::with_capacity(32);
        for patch in &self.patches {
            if let Some((dist_in, dist_out)) = patch.ray_hits_ppd(view_pos, view_dir, max_dist) {
                if stack.len() >= MAX_ACTIVE_PATCHES {
                    if !STACK_OVERFLOW_WARNED.swap(true, Ordering::Relaxed) {
                        warn!("Bezier patch stack overflow; abandoning ray");
                    }
                    return None;
                }
                let sort_range = stack.len();
                Self::push_sorted(
                    &mut stack,
                    PatchStackEntry {
                        patch: patch.clone(),
                        dist_in,
                        dist_out,
                        recurse_level: 0,
                    },
                    sort_range,
                );
            }
        }

        let mut best_dist: Option<f64> = None;

        while let Some(entry) = stack.pop() {
            if let Some(best) = best_dist {
                if entry.dist_in >= best {
                    continue; // cannot beat the recorded hit
                }
            }
            let patch = &entry.patch;
            if patch.lateral_extent() < tolerance::MIN_LATERAL_EXTENT {
                continue; // too small to keep subdividing
            }

            let may_accept = entry.recurse_level >= MAX_ISECT_RECURSE
                || patch.thickness() <= tolerance::RECURSE_THICKNESS;
            if may_accept {
                // Approximate the hit as the slab midpoint and verify by
                // evaluating the patch there.
                let alpha = 0.5 * (entry.dist_in.max(0.0) + entry.dist_out.min(max_dist));
                let hit_maybe = view_pos + view_dir * alpha;
                let uv = DVec2::new(
                    (hit_maybe.dot(patch.normal_a) - patch.min_dot_a)
                        / (patch.max_dot_a - patch.min_dot_a),
                    (hit_maybe.dot(patch.normal_b) - patch.min_dot_b)
                        / (patch.max_dot_b - patch.min_dot_b),
                );
                let value_hg = patch.eval(uv);
                let value = set_from_hg(value_hg);
                let dist_sq = value.distance_squared(hit_maybe);
                if dist_sq < tolerance::MIDPOINT_ACCEPT_DIST_SQ
                    && (dist_sq < tolerance::TIGHT_ACCEPT_DIST_SQ
                        || patch.thickness() < tolerance::FLAT_THICKNESS)
                {
                    if alpha < best_dist.unwrap_or(f64::MAX) && alpha < max_dist {
                        best_dist = Some(alpha);
                        vis_point.set_position(hit_maybe);
                        vis_point.set_uv(
                            patch.uv_min.x + (patch.uv_max.x - patch.uv_min.x) * uv.x,
                            patch.uv_min.y + (patch.uv_max.y - patch.uv_min.y) * uv.y,
                        );
                        vis_point.set_face_number(patch.face_num);
                        let normal = patch.eval_normal(uv, value_hg);
                        vis_point.set_normal(normal);
                        if view_dir.dot(normal) < 0.0 {
                            vis_point.set_front_face();
                            vis_point.set_material(self.front_material.clone());
                        } else {
                            vis_point.set_back_face();
                            vis_point.set_material(self.back_material.clone());
                        }
                    }
                    continue; // done with this patch
                }
            }

            // Split transiently and push the halves the ray still hits.
            let (mut lo, mut hi) = entry.patch.split_longer_axis();
            let level = entry.recurse_level + 1;
            let mut sort_range = 0;
            for half in [&mut lo, &mut hi] {
                half.calc_bounding_ppd();
            }
            for half in [lo, hi] {
                if let Some((dist_in, dist_out)) = half.ray_hits_ppd(view_pos, view_dir, max_dist)
                {
                    if stack.len() >= MAX_ACTIVE_PATCHES {
                        if !STACK_OVERFLOW_WARNED.swap(true, Ordering::Relaxed) {
                            warn!("Bezier patch stack overflow; abandoning ray");
                        }
                        return None;
                    }
                    Self::push_sorted(
                        &mut stack,
                        PatchStackEntry {
                            patch: half,
                            dist_in,
                            dist_out,
                            recurse_level: level,
                        },
                        sort_range,
                    );
                    sort_range += 1;
                }
            }
        }

        best_dist
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for patch in &self.patches {
            let (lo, hi) = patch.min_max_dot(u);
            min = min.min(lo);
            max = max.max(hi);
        }
        (min, max)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        let patch = self.original_patches.get(vis_point.face_number())?;
        let span = patch.uv_max - patch.uv_min;
        let local = DVec2::new(
            (vis_point.u() - patch.uv_min.x) / span.x,
            (vis_point.v() - patch.uv_min.y) / span.y,
        );
        let (du, dv) = patch.calc_local_partials(local)?;
        Some((du / span.x, dv / span.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    /// A flat unit square patch in the z = 0 plane.
    fn flat_patch_set() -> BezierSet {
        let mut set = BezierSet::new(Arc::new(PhongMaterial::default()));
        let mut pts = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                pts.push(DVec3::new(i as f64 / 3.0, j as f64 / 3.0, 0.0));
            }
        }
        set.add_patch(4, 4, &pts).unwrap();
        set
    }

    /// A curved patch: z bulges up in the middle.
    fn bulge_patch_set() -> BezierSet {
        let mut set = BezierSet::new(Arc::new(PhongMaterial::default()));
        let mut pts = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                let x = i as f64 / 3.0;
                let y = j as f64 / 3.0;
                let center = ((1..3).contains(&i) && (1..3).contains(&j)) as u32 as f64;
                pts.push(DVec3::new(x, y, center * 0.5));
            }
        }
        set.add_patch(4, 4, &pts).unwrap();
        set
    }

    fn vp() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn flat_patch_head_on_hit() {
        let set = flat_patch_set();
        let mut point = vp();
        let t = set
            .find_intersection(DVec3::new(0.5, 0.5, 3.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 3.0).abs() < 1e-3);
        assert!(point.is_front_facing() || point.is_back_facing());
        // Normal must be +-Z for a flat patch
        assert!(point.normal().cross(DVec3::Z).length() < 1e-6);
        assert!((point.u() - 0.5).abs() < 0.05);
        assert!((point.v() - 0.5).abs() < 0.05);
    }

    #[test]
    fn miss_beside_patch() {
        let set = flat_patch_set();
        let mut point = vp();
        assert!(
            set.find_intersection(DVec3::new(3.0, 3.0, 3.0), -DVec3::Z, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn bulge_patch_hit_is_above_base_plane() {
        let set = bulge_patch_set();
        let mut point = vp();
        let t = set
            .find_intersection(DVec3::new(0.5, 0.5, 3.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        // The surface bulges toward the viewer, so the hit is closer than 3
        assert!(t < 3.0 - 1e-4);
        assert!(point.position().z > 1e-4);
    }

    #[test]
    fn refinement_produces_nice_patches() {
        let set = bulge_patch_set();
        assert!(set.num_refined_patches() >= 4);
        for patch in &set.patches {
            assert!(patch.ppd_nice() || patch.thickness() < 1e-12);
        }
    }

    #[test]
    fn order_three_patch_elevated() {
        let mut set = BezierSet::new(Arc::new(PhongMaterial::default()));
        let mut pts = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                pts.push(DVec3::new(i as f64 / 2.0, j as f64 / 2.0, 0.0));
            }
        }
        set.add_patch(3, 3, &pts).unwrap();
        let mut point = vp();
        let t = set
            .find_intersection(DVec3::new(0.5, 0.5, 2.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 2.0).abs() < 1e-3);
    }

    #[test]
    fn bad_order_rejected() {
        let mut set = BezierSet::new(Arc::new(PhongMaterial::default()));
        assert!(set.add_patch(2, 4, &vec![DVec3::ZERO; 8]).is_err());
    }

    #[test]
    fn bounding_planes_contain_patch() {
        let set = bulge_patch_set();
        let (min_z, max_z) = set.calc_bounding_planes(DVec3::Z);
        assert!(min_z <= 1e-9);
        assert!(max_z >= 0.2); // the bulge reaches above z = 0.2
    }

    #[test]
    fn partials_defined_off_singularities() {
        let set = flat_patch_set();
        let mut point = vp();
        set.find_intersection(DVec3::new(0.4, 0.6, 2.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        let (du, dv) = set.calc_partials(&point).unwrap();
        assert!(du.cross(dv).length() > 0.0);
    }
}
