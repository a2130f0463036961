use super::Vec2;

/// 3x3 affine transform for 2D homogeneous coordinates.
///
/// Storage is column-major, matching the layout GPU uniforms expect:
/// `m[col * 3 + row]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    pub m: [f64; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    pub fn from_translation(t: Vec2) -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, t.x, t.y, 1.0],
        }
    }

    pub fn from_scale(sx: f64, sy: f64) -> Self {
        Self {
            m: [sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// `self * other`: `other` is applied first.
    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let a = &self.m;
        let b = &other.m;
        let mut c = [0.0f64; 9];
        for col in 0..3 {
            for row in 0..3 {
                c[col * 3 + row] =
                    a[row] * b[col * 3] + a[3 + row] * b[col * 3 + 1] + a[6 + row] * b[col * 3 + 2];
            }
        }
        Mat3 { m: c }
    }

    /// Returns `None` for singular matrices.
    pub fn inverse(&self) -> Option<Mat3> {
        let [a00, a01, a02, a10, a11, a12, a20, a21, a22] = self.m;

        let b01 = a22 * a11 - a12 * a21;
        let b11 = -a22 * a10 + a12 * a20;
        let b21 = a21 * a10 - a11 * a20;

        let det = a00 * b01 + a01 * b11 + a02 * b21;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;

        Some(Mat3 {
            m: [
                b01 * inv,
                (-a22 * a01 + a02 * a21) * inv,
                (a12 * a01 - a02 * a11) * inv,
                b11 * inv,
                (a22 * a00 - a02 * a20) * inv,
                (-a12 * a00 + a02 * a10) * inv,
                b21 * inv,
                (-a21 * a00 + a01 * a20) * inv,
                (a11 * a00 - a01 * a10) * inv,
            ],
        })
    }

    /// Transforms a point (implicit `w = 1`).
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let m = &self.m;
        Vec2::new(
            m[0] * p.x + m[3] * p.y + m[6],
            m[1] * p.x + m[4] * p.y + m[7],
        )
    }

    pub fn to_f32(&self) -> [f32; 9] {
        self.m.map(|v| v as f32)
    }
}
