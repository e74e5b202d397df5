//! Parallelepipeds given by a base point and three edge vectors.

use glam::DVec3;

/// A (not necessarily axis-aligned) box: base point plus edges A, B, C.
///
/// "Front" is the face spanned by edges A and B, "left" by B and C, and
/// "bottom" by C and A; the base point is the bottom-left-front corner.
#[derive(Debug, Clone, Copy)]
pub struct Parallelepiped {
    pub base: DVec3,
    pub edge_a: DVec3,
    pub edge_b: DVec3,
    pub edge_c: DVec3,
}

impl Parallelepiped {
    pub fn new(base: DVec3, edge_a: DVec3, edge_b: DVec3, edge_c: DVec3) -> Self {
        Self {
            base,
            edge_a,
            edge_b,
            edge_c,
        }
    }

    pub fn normal_front(&self) -> DVec3 {
        self.edge_a.cross(self.edge_b)
    }

    pub fn normal_left(&self) -> DVec3 {
        self.edge_b.cross(self.edge_c)
    }

    pub fn normal_bottom(&self) -> DVec3 {
        self.edge_c.cross(self.edge_a)
    }

    /// Four vertices of the front face in circular order.
    pub fn front_face(&self) -> [DVec3; 4] {
        [
            self.base,
            self.base + self.edge_a,
            self.base + self.edge_a + self.edge_b,
            self.base + self.edge_b,
        ]
    }

    pub fn back_face(&self) -> [DVec3; 4] {
        let b = self.base + self.edge_c;
        [
            b + self.edge_a,
            b,
            b + self.edge_b,
            b + self.edge_a + self.edge_b,
        ]
    }

    pub fn left_face(&self) -> [DVec3; 4] {
        [
            self.base,
            self.base + self.edge_b,
            self.base + self.edge_b + self.edge_c,
            self.base + self.edge_c,
        ]
    }

    pub fn right_face(&self) -> [DVec3; 4] {
        let b = self.base + self.edge_a;
        [
            b + self.edge_b,
            b,
            b + self.edge_c,
            b + self.edge_b + self.edge_c,
        ]
    }

    pub fn bottom_face(&self) -> [DVec3; 4] {
        [
            self.base,
            self.base + self.edge_c,
            self.base + self.edge_c + self.edge_a,
            self.base + self.edge_a,
        ]
    }

    pub fn top_face(&self) -> [DVec3; 4] {
        let b = self.base + self.edge_b;
        [
            b + self.edge_c,
            b,
            b + self.edge_a,
            b + self.edge_c + self.edge_a,
        ]
    }

    /// All eight corner vertices.
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b, c) = (self.edge_a, self.edge_b, self.edge_c);
        [
            self.base,
            self.base + a,
            self.base + b,
            self.base + c,
            self.base + a + b,
            self.base + a + c,
            self.base + b + c,
            self.base + a + b + c,
        ]
    }
}

impl Default for Parallelepiped {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z)
    }
}
