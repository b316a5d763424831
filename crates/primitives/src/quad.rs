use glam::*;

/// Quad corners on the unit square, counter-clockwise from the min corner
const QUAD_CORNERS: &[Vec2] = &[
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Triangles which face the viewer when their corners appear clockwise
pub const CLOCKWISE_QUAD_INDICES: &[u32] = &[0, 2, 1, 0, 3, 2];
/// Triangles which face the viewer when their corners appear counter-clockwise
pub const COUNTER_CLOCKWISE_QUAD_INDICES: &[u32] = &[0, 1, 2, 0, 2, 3];

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Which winding the target renderer treats as front facing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl FrontFace {
    pub fn quad_indices(&self) -> &'static [u32] {
        match self {
            FrontFace::Clockwise => CLOCKWISE_QUAD_INDICES,
            FrontFace::CounterClockwise => COUNTER_CLOCKWISE_QUAD_INDICES,
        }
    }
}

/// The four corners of the rectangle starting at `min` with extent `size`:
/// min, min + (size.x, 0), max, min + (0, size.y)
pub fn corners(min: Vec2, size: Vec2) -> [Vec2; 4] {
    let mut corners = [Vec2::ZERO; 4];
    for (corner, unit) in corners.iter_mut().zip(QUAD_CORNERS) {
        *corner = min + size * *unit;
    }
    corners
}

pub fn extend_indices(indices: &mut Vec<u32>, offset: u32, front_face: FrontFace) {
    indices.extend(front_face.quad_indices().iter().map(|i| i + offset));
}
