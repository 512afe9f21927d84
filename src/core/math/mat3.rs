/// A 3 x 3 matrix
use crate::core::{Float, math::vec3::Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    e: [[Float; 3]; 3],
}

impl Mat3 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        e00: Float,
        e01: Float,
        e02: Float,
        e10: Float,
        e11: Float,
        e12: Float,
        e20: Float,
        e21: Float,
        e22: Float,
    ) -> Self {
        Self {
            e: [[e00, e01, e02], [e10, e11, e12], [e20, e21, e22]],
        }
    }

    /// Determines whether all elements of a matrix are approximately equal to
    /// another.
    pub fn approx_eq(&self, other: &Self, tol: Float) -> bool {
        self.e
            .iter()
            .zip(other.e.iter())
            .all(|(row_self, row_other)| {
                row_self
                    .iter()
                    .zip(row_other.iter())
                    .all(|(a, b)| (a - b).abs() < tol)
            })
    }

    /// Create a 3x3 identity matrix.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
    }

    pub fn transpose(&self) -> Self {
        Self::new(
            self.e[0][0],
            self.e[1][0],
            self.e[2][0],
            self.e[0][1],
            self.e[1][1],
            self.e[2][1],
            self.e[0][2],
            self.e[1][2],
            self.e[2][2],
        )
    }

    /// A counterclockwise rotation about the x-axis.
    ///
    /// Right-handed coordinate systems and active rotations are used
    /// throughout.
    pub fn rotation_x(angle: Float) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self::new(1.0, 0.0, 0.0, 0.0, cos_a, -sin_a, 0.0, sin_a, cos_a)
    }

    /// A counterclockwise rotation about the y-axis.
    pub fn rotation_y(angle: Float) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self::new(cos_a, 0.0, sin_a, 0.0, 1.0, 0.0, -sin_a, 0.0, cos_a)
    }

    /// A counterclockwise rotation about the z-axis.
    pub fn rotation_z(angle: Float) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self::new(cos_a, -sin_a, 0.0, sin_a, cos_a, 0.0, 0.0, 0.0, 1.0)
    }
}

impl std::ops::Mul<Vec3> for Mat3 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        Vec3::new(
            self.e[0][0] * rhs.x() + self.e[0][1] * rhs.y() + self.e[0][2] * rhs.z(),
            self.e[1][0] * rhs.x() + self.e[1][1] * rhs.y() + self.e[1][2] * rhs.z(),
            self.e[2][0] * rhs.x() + self.e[2][1] * rhs.y() + self.e[2][2] * rhs.z(),
        )
    }
}

impl std::ops::Mul<Mat3> for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Mat3 {
        let mut e = [[0.0; 3]; 3];
        for (i, row) in e.iter_mut().enumerate() {
            for (j, elem) in row.iter_mut().enumerate() {
                *elem = self.e[i][0] * rhs.e[0][j]
                    + self.e[i][1] * rhs.e[1][j]
                    + self.e[i][2] * rhs.e[2][j];
            }
        }
        Mat3 { e }
    }
}
