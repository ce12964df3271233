use super::{Vec2, Vec4};

/// 4x4 matrix stored column-major, the layout GL-style camera code hands around.
///
/// Element `(row, col)` lives at `m[col * 4 + row]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub m: [f64; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn from_cols_array(m: [f64; 16]) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self { m }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut out = Self::identity();
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    pub fn scaling(x: f64, y: f64, z: f64) -> Self {
        let mut out = Self::identity();
        out.m[0] = x;
        out.m[5] = y;
        out.m[10] = z;
        out
    }

    /// Maps pixel coordinates `[0, width] x [0, height]` (y down) onto clip space.
    ///
    /// Pushing a pixel-space point through this and back through the viewport
    /// mapping returns the same pixel, which makes it the natural label-plane
    /// matrix for viewport-aligned text.
    pub fn pixel_ortho(width: f64, height: f64) -> Self {
        let mut out = Self::scaling(2.0 / width, -2.0 / height, 1.0);
        out.m[12] = -1.0;
        out.m[13] = 1.0;
        out
    }

    /// `self * rhs`, i.e. `rhs` is applied first.
    pub fn mul(&self, rhs: &Self) -> Self {
        let a = &self.m;
        let b = &rhs.m;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[k * 4 + row] * b[col * 4 + k];
                }
                out[col * 4 + row] = sum;
            }
        }
        Self { m: out }
    }

    pub fn transform(&self, v: Vec4) -> Vec4 {
        let m = &self.m;
        Vec4::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z + m[12] * v.w,
            m[1] * v.x + m[5] * v.y + m[9] * v.z + m[13] * v.w,
            m[2] * v.x + m[6] * v.y + m[10] * v.z + m[14] * v.w,
            m[3] * v.x + m[7] * v.y + m[11] * v.z + m[15] * v.w,
        )
    }

    /// Transforms a ground-plane point (`z = 0`).
    pub fn transform_point(&self, p: Vec2) -> Vec4 {
        self.transform(Vec4::from_point(p))
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::{Vec2, Vec4};

    #[test]
    fn identity_is_neutral() {
        let p = Vec4::new(1.0, -2.0, 3.0, 1.0);
        assert_eq!(Mat4::identity().transform(p), p);
        assert_eq!(Mat4::default(), Mat4::identity());
    }

    #[test]
    fn translation_then_scale_composes_right_to_left() {
        let t = Mat4::translation(10.0, 0.0, 0.0);
        let s = Mat4::scaling(2.0, 2.0, 1.0);
        // Scale first, then translate.
        let m = t.mul(&s);
        let out = m.transform_point(Vec2::new(1.0, 1.0));
        assert_eq!(out, Vec4::new(12.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn pixel_ortho_maps_corners_to_clip_space() {
        let m = Mat4::pixel_ortho(200.0, 100.0);
        let tl = m.transform_point(Vec2::new(0.0, 0.0));
        let br = m.transform_point(Vec2::new(200.0, 100.0));
        assert_eq!((tl.x, tl.y), (-1.0, 1.0));
        assert_eq!((br.x, br.y), (1.0, -1.0));
        assert_eq!(br.w, 1.0);
    }

    #[test]
    fn finite_check() {
        let mut m = Mat4::identity();
        assert!(m.is_finite());
        m.m[3] = f64::NAN;
        assert!(!m.is_finite());
    }
}
