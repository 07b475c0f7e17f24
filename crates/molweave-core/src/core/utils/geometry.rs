use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SuperpositionError {
    #[error("Point sets differ in size: {0} vs {1}")]
    SizeMismatch(usize, usize),
    #[error("Cannot superpose an empty point set")]
    Empty,
    #[error("Coordinates contain non-finite values")]
    NonFinite,
    #[error("Singular value decomposition failed to converge")]
    SvdFailed,
}

/// A proper rotation followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * *point + self.translation
    }
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Finds the rigid transform that minimises the RMSD between `mobile` and
/// `reference` (Kabsch algorithm with reflection correction).
///
/// Pairs are matched by position in the two slices.
pub fn kabsch(
    mobile: &[Point3<f64>],
    reference: &[Point3<f64>],
) -> Result<RigidTransform, SuperpositionError> {
    if mobile.len() != reference.len() {
        return Err(SuperpositionError::SizeMismatch(
            mobile.len(),
            reference.len(),
        ));
    }
    let (Some(cm), Some(cr)) = (centroid(mobile), centroid(reference)) else {
        return Err(SuperpositionError::Empty);
    };
    if !cm.coords.iter().chain(cr.coords.iter()).all(|c| c.is_finite()) {
        return Err(SuperpositionError::NonFinite);
    }

    let mut covariance = Matrix3::zeros();
    for (p, q) in mobile.iter().zip(reference) {
        covariance += (*p - cm) * (*q - cr).transpose();
    }

    let svd = covariance
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or(SuperpositionError::SvdFailed)?;
    let u = svd.u.ok_or(SuperpositionError::SvdFailed)?;
    let v = svd.v_t.ok_or(SuperpositionError::SvdFailed)?.transpose();

    let d = if (v * u.transpose()).determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let r = v * correction * u.transpose();
    if !r.iter().all(|c| c.is_finite()) {
        return Err(SuperpositionError::NonFinite);
    }

    let rotation = Rotation3::from_matrix_unchecked(r);
    let translation = cr.coords - rotation * cm.coords;
    Ok(RigidTransform {
        rotation,
        translation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Unit;

    fn assert_points_close(a: &[Point3<f64>], b: &[Point3<f64>], tol: f64) {
        for (p, q) in a.iter().zip(b) {
            assert!((*p - *q).norm() < tol, "{:?} vs {:?}", p, q);
        }
    }

    fn tetrahedron() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(0.0, 1.2, 0.0),
            Point3::new(0.3, 0.4, 1.1),
        ]
    }

    #[test]
    fn calculate_rmsd_of_identical_sets_is_zero() {
        let pts = tetrahedron();
        assert_eq!(calculate_rmsd(&pts, &pts), Some(0.0));
    }

    #[test]
    fn calculate_rmsd_rejects_empty_or_mismatched_sets() {
        assert_eq!(calculate_rmsd(&[], &[]), None);
        assert_eq!(calculate_rmsd(&tetrahedron()[..2], &tetrahedron()), None);
    }

    #[test]
    fn calculate_rmsd_of_uniform_shift() {
        let a = tetrahedron();
        let b: Vec<_> = a.iter().map(|p| *p + Vector3::new(0.0, 0.0, 2.0)).collect();
        assert!((calculate_rmsd(&a, &b).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn kabsch_recovers_rotation_and_translation() {
        let reference = tetrahedron();
        let rotation =
            Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(1.0, 2.0, 0.5)), 1.1);
        let shift = Vector3::new(3.0, -2.0, 0.7);
        let mobile: Vec<_> = reference.iter().map(|p| rotation * *p + shift).collect();

        let transform = kabsch(&mobile, &reference).unwrap();
        let fitted: Vec<_> = mobile.iter().map(|p| transform.apply(p)).collect();

        assert_points_close(&fitted, &reference, 1e-8);
        assert!(transform.rotation.matrix().determinant() > 0.0);
    }

    #[test]
    fn kabsch_never_returns_a_reflection() {
        let reference = tetrahedron();
        let mirrored: Vec<_> = reference
            .iter()
            .map(|p| Point3::new(-p.x, p.y, p.z))
            .collect();

        let transform = kabsch(&mirrored, &reference).unwrap();
        assert!((transform.rotation.matrix().determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kabsch_with_single_point_is_a_pure_translation_fit() {
        let transform = kabsch(&[Point3::new(1.0, 1.0, 1.0)], &[Point3::origin()]).unwrap();
        let moved = transform.apply(&Point3::new(1.0, 1.0, 1.0));
        assert!((moved - Point3::origin()).norm() < 1e-12);
    }

    #[test]
    fn kabsch_rejects_degenerate_input() {
        assert_eq!(kabsch(&[], &[]), Err(SuperpositionError::Empty));
        assert_eq!(
            kabsch(&tetrahedron(), &tetrahedron()[..3]),
            Err(SuperpositionError::SizeMismatch(4, 3))
        );
        let bad = vec![Point3::new(f64::NAN, 0.0, 0.0)];
        assert_eq!(
            kabsch(&bad, &[Point3::origin()]),
            Err(SuperpositionError::NonFinite)
        );
    }
}
