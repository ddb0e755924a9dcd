use nalgebra::Vector3;

/// 32-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns color as normalized float RGB vector.
    #[inline]
    pub fn as_frgb(self) -> Vector3<f32> {
        Vector3::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    /// Builds an opaque color from a float RGB vector in `[0; 1]` range,
    /// clamping out-of-range components.
    #[inline]
    pub fn from_frgb(rgb: Vector3<f32>) -> Self {
        Self::opaque(
            (rgb.x.clamp(0.0, 1.0) * 255.0) as u8,
            (rgb.y.clamp(0.0, 1.0) * 255.0) as u8,
            (rgb.z.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }

    /// Component-wise saturating addition, alpha is kept from `self`.
    #[inline]
    pub fn saturating_add_rgb(self, other: Self) -> Self {
        Self {
            r: self.r.saturating_add(other.r),
            g: self.g.saturating_add(other.g),
            b: self.b.saturating_add(other.b),
            a: self.a,
        }
    }

    #[inline]
    pub fn to_opaque(self) -> Self {
        Self { a: 255, ..self }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_saturating_add_rgb() {
        let a = Color::opaque(200, 10, 0);
        let b = Color::opaque(100, 20, 0);
        let sum = a.saturating_add_rgb(b);
        assert_eq!(sum, Color::opaque(255, 30, 0));

        // Saturating addition of non-negative values is order-independent.
        assert_eq!(sum, b.saturating_add_rgb(a));
    }

    #[test]
    fn test_frgb_roundtrip() {
        let color = Color::opaque(51, 102, 204);
        let restored = Color::from_frgb(color.as_frgb());
        assert_eq!(color, restored);
    }

    #[test]
    fn test_from_frgb_clamps() {
        assert_eq!(
            Color::from_frgb(Vector3::new(2.0, -1.0, 0.5)),
            Color::opaque(255, 0, 127)
        );
    }
}
