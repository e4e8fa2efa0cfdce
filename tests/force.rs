extern crate gyre;

use gyre::dynamics::auxiliary::wind_to_body;
use gyre::dynamics::force::{structural_to_body, FrameProvider};
use gyre::linalg::{Matrix3, Vector3};
use gyre::{Force, TransformType};

use approx::assert_abs_diff_eq;

/// A wing at some angle of attack, with its CG at 10 inches from the datum.
struct Wing {
    alpha: f64,
}

impl FrameProvider for Wing {
    fn tw2b(&self) -> Matrix3<f64> {
        wind_to_body(self.alpha, 0.0)
    }

    fn tl2b(&self) -> Matrix3<f64> {
        Matrix3::identity()
    }

    fn structural_to_body(&self, r: &Vector3<f64>) -> Vector3<f64> {
        structural_to_body(&Vector3::new(10.0, 0.0, 0.0), r)
    }
}

fn aero_force() -> Force {
    let mut f = Force::new();
    f.set_transform_type(TransformType::WindBody);
    f.set_sense(Vector3::new(-1.0, 1.0, -1.0));
    // Aerodynamic center 12 inches aft of the CG
    f.set_location(Vector3::new(22.0, 0.0, 0.0));
    f.set_native_forces(Vector3::new(50.0, 0.0, 1_000.0));
    f
}

#[test]
fn moments_follow_the_last_resolution() {
    let mut f = aero_force();
    assert_eq!(f.moments(), Vector3::zeros());

    let level = Wing { alpha: 0.0 };
    let fb = f.get_body_forces(&level);
    assert_abs_diff_eq!(fb, Vector3::new(-50.0, 0.0, -1_000.0), epsilon = 1e-9);
    // Lift one foot aft of the CG pitches the nose down
    assert_abs_diff_eq!(f.moments(), Vector3::new(0.0, -1_000.0, 0.0), epsilon = 1e-9);

    // Same force, new attitude: the stored moment only changes on the next resolution
    let pitched = Wing { alpha: 0.1 };
    let (fb_pitched, mb_pitched) = f.body_forces_and_moments(&pitched);
    assert_abs_diff_eq!(f.moments(), Vector3::new(0.0, -1_000.0, 0.0), epsilon = 1e-9);
    assert_eq!(f.body_forces(), fb);

    let (sa, ca) = 0.1_f64.sin_cos();
    let expected = Vector3::new(-50.0 * ca + 1_000.0 * sa, 0.0, -50.0 * sa - 1_000.0 * ca);
    assert_abs_diff_eq!(fb_pitched, expected, epsilon = 1e-9);
    assert_abs_diff_eq!(f.get_body_forces(&pitched), expected, epsilon = 1e-9);
    assert_eq!(f.moments(), mb_pitched);
    // r = (-1, 0, 0), M = r x F
    assert_abs_diff_eq!(f.moments(), Vector3::new(0.0, expected.z, 0.0), epsilon = 1e-9);
}

#[test]
fn local_frame_forces() {
    let mut f = Force::new();
    f.set_transform_type(TransformType::LocalBody);
    f.set_native_forces(Vector3::new(0.0, 0.0, 200.0));
    f.set_location(Vector3::new(10.0, 0.0, 0.0));
    let fb = f.get_body_forces(&Wing { alpha: 0.3 });
    assert_eq!(fb, Vector3::new(0.0, 0.0, 200.0));
    // Applied at the CG
    assert_eq!(f.moments(), Vector3::zeros());
}
