//! Internal light representation used during shading.
//!
//! Input [`LightSource`](crate::input::LightSource) objects are normalized
//! into this form once, before the shading stage: position and direction are
//! extracted from the transform, the color is converted to float (and
//! collapsed to grayscale when requested), and the effective attenuation
//! radius is precomputed.

use crate::{
    input::{LightKind, LightSource},
    math::plane::Plane,
};
use nalgebra::Vector3;

// A light contribution below 5/255 per channel is considered invisible, which
// bounds the influence radius of attenuated lights.
const INTENSITY_THRESHOLD: f32 = 5.0 / 255.0;

#[derive(Clone, Debug)]
pub(crate) struct Light {
    pub kind: LightKind,
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    /// Linear color in [0; 1] per channel.
    pub color: Vector3<f32>,
    attenuation: (f32, f32, f32),
    /// Distance beyond which the light contributes nothing. `f32::MAX` for
    /// directional lights.
    pub radius: f32,
}

impl Light {
    pub fn new(source: &LightSource, grayscale: bool) -> Self {
        let mut color = source.color.as_frgb();
        if grayscale {
            let luminance = (color.x + color.y + color.z) / 3.0;
            color = Vector3::new(luminance, luminance, luminance);
        }

        let radius = match source.kind {
            LightKind::Directional => f32::MAX,
            _ => attenuation_radius(source.attenuation),
        };

        Self {
            kind: source.kind,
            position: source.position(),
            direction: source.direction(),
            color,
            attenuation: source.attenuation,
            radius,
        }
    }

    /// Lighting intensity at a surface point with the given unit normal, in
    /// [0; 1]. Shadowing is not considered here.
    pub fn intensity(&self, point: Vector3<f32>, normal: Vector3<f32>) -> f32 {
        match self.kind {
            LightKind::Directional => (-self.direction).dot(&normal).max(0.0),
            LightKind::Point => {
                let (intensity, _) = self.attenuated_lambert(point, normal);
                intensity
            }
            LightKind::Spot {
                inner_angle,
                outer_angle,
            } => {
                let (intensity, ray_dir) = self.attenuated_lambert(point, normal);
                if intensity <= 0.0 {
                    return 0.0;
                }

                // Cone falloff over the angle to the spot axis; the stored
                // angles are full apex angles.
                let angle = self.direction.dot(&ray_dir).clamp(-1.0, 1.0).acos();
                let inner = inner_angle * 0.5;
                let outer = outer_angle * 0.5;
                if angle >= outer {
                    0.0
                } else if angle <= inner {
                    intensity
                } else {
                    intensity * (1.0 - (angle - inner) / (outer - inner))
                }
            }
        }
    }

    // Distance-attenuated Lambert term plus the normalized light-to-point
    // direction.
    fn attenuated_lambert(
        &self,
        point: Vector3<f32>,
        normal: Vector3<f32>,
    ) -> (f32, Vector3<f32>) {
        let to_point = point - self.position;
        let distance = to_point.norm();
        if distance > self.radius || distance <= f32::EPSILON {
            return (0.0, Vector3::z());
        }
        let ray_dir = to_point / distance;

        let mut intensity = (-ray_dir).dot(&normal).max(0.0);
        let (a0, a1, a2) = self.attenuation;
        intensity /= a0 + a1 * distance + a2 * distance * distance;
        (intensity.clamp(0.0, 1.0), ray_dir)
    }

    /// Quick rejection test used before rasterizing a triangle for this
    /// light. The triangle can only be lit if the light is on the front side
    /// of its plane and within attenuation range of it.
    pub fn sees_triangle(&self, plane: &Plane) -> bool {
        match self.kind {
            LightKind::Directional => plane.normal.dot(&-self.direction) > 0.0,
            _ => {
                plane.is_point_front_side(&self.position)
                    && plane.distance(&self.position) < self.radius
            }
        }
    }
}

/// Distance at which inverse quadratic attenuation drops below the intensity
/// threshold.
fn attenuation_radius((a0, a1, a2): (f32, f32, f32)) -> f32 {
    let limit = 1.0 / INTENSITY_THRESHOLD;
    if a2 > f32::EPSILON {
        let p_half = (a1 / a2) * 0.5;
        -p_half + (p_half * p_half + (limit - a0) / a2).max(0.0).sqrt()
    } else {
        // Validation guarantees a1 > 0.
        ((limit - a0) / a1).max(0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{color::Color, input::LightSource};
    use nalgebra::Matrix4;

    fn light_at(position: Vector3<f32>, kind: LightKind) -> Light {
        Light::new(
            &LightSource {
                kind,
                transform: Matrix4::new_translation(&position),
                color: Color::WHITE,
                attenuation: (1.0, 0.1, 0.0),
                visible: true,
            },
            false,
        )
    }

    #[test]
    fn attenuation_radius_solves_threshold_distance() {
        // Pure linear attenuation: 1 / (1 + 0.1 d) == 5/255 at d == 500.
        let radius = attenuation_radius((1.0, 0.1, 0.0));
        assert!((radius - 500.0).abs() < 1e-2);

        // With a quadratic term the radius must satisfy the same threshold.
        let attenuation = (1.0, 0.5, 0.05);
        let radius = attenuation_radius(attenuation);
        let intensity = 1.0 / (attenuation.0 + attenuation.1 * radius + attenuation.2 * radius * radius);
        assert!((intensity - INTENSITY_THRESHOLD).abs() < 1e-4);
    }

    #[test]
    fn point_light_intensity_falls_off_with_distance() {
        let light = light_at(Vector3::new(0.0, 5.0, 0.0), LightKind::Point);
        let normal = Vector3::y();
        let near = light.intensity(Vector3::new(0.0, 4.0, 0.0), normal);
        let far = light.intensity(Vector3::new(0.0, 0.0, 0.0), normal);
        assert!(near > far);
        assert!(far > 0.0);

        // Backfacing surface receives nothing.
        assert_eq!(light.intensity(Vector3::zeros(), -Vector3::y()), 0.0);
    }

    #[test]
    fn directional_light_is_pure_lambert() {
        let mut source = LightSource {
            kind: LightKind::Directional,
            // Local +Z looks straight down after this rotation.
            transform: Matrix4::from_euler_angles(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            color: Color::WHITE,
            attenuation: (0.0, 0.0, 0.0),
            visible: true,
        };
        let light = Light::new(&source, false);
        let up = Vector3::y();
        assert!((light.intensity(Vector3::zeros(), up) - 1.0).abs() < 1e-5);

        source.transform = Matrix4::identity();
        let along_z = Light::new(&source, false);
        assert_eq!(along_z.intensity(Vector3::zeros(), Vector3::z()), 0.0);
    }

    #[test]
    fn spot_cone_falloff() {
        let kind = LightKind::Spot {
            inner_angle: 0.4,
            outer_angle: 1.0,
        };
        let source = LightSource {
            kind,
            // Positioned above the origin, looking straight down.
            transform: Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0))
                * Matrix4::from_euler_angles(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            color: Color::WHITE,
            attenuation: (1.0, 0.1, 0.0),
            visible: true,
        };
        let light = Light::new(&source, false);
        let normal = Vector3::y();

        let on_axis = light.intensity(Vector3::zeros(), normal);
        assert!(on_axis > 0.0);

        // Well outside the outer cone (45 degrees off axis > 0.5 rad half angle).
        let outside = light.intensity(Vector3::new(2.0, 0.0, 0.0), normal);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn grayscale_collapse() {
        let source = LightSource {
            kind: LightKind::Point,
            transform: Matrix4::identity(),
            color: Color::from_rgba(255, 0, 0, 255),
            attenuation: (1.0, 0.1, 0.0),
            visible: true,
        };
        let light = Light::new(&source, true);
        assert_eq!(light.color.x, light.color.y);
        assert_eq!(light.color.y, light.color.z);
    }
}
