//! Escape-time iteration for the mandelbulb-like power map.
//!
//! One step maps the orbit value `z` to
//!
//! ```text
//! r     = radius(z)
//! theta = acos(re / r)
//! phi   = atan2(im, re)
//! z'    = r^p * exp(i * p * theta) * cos(p * phi) + c
//! ```
//!
//! with `c = z0`. The orbit escapes once `|z| > 2`.
//!
//! `radius` defaults to `sqrt(re² + im² + im²)`, which counts the imaginary component twice.
//! Frames produced by earlier runs depend on that formula, so it stays the default;
//! [`RadiusFormula::Euclidean`] selects the plain modulus instead.
//!
//! At `r = 0` both angles are undefined. The power term is zero there regardless of the
//! angles, so the step collapses to `z' = c` and iteration continues. The origin is a fixed
//! point and never escapes.
//!
//! A non-finite orbit value (overflowed `r^p`, or `inf * 0`) counts as escaped at the step it
//! is observed.

use num_complex::Complex64;

/// Escape threshold on `|z|`.
pub const ESCAPE_RADIUS: f64 = 2.0;

/// Radius used to convert the orbit value to spherical form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusFormula {
    /// `sqrt(re² + 2·im²)`.
    #[default]
    DoubledImaginary,
    /// `sqrt(re² + im²)`.
    Euclidean,
}

impl RadiusFormula {
    pub fn radius(self, z: Complex64) -> f64 {
        match self {
            Self::DoubledImaginary => (z.re * z.re + z.im * z.im + z.im * z.im).sqrt(),
            Self::Euclidean => z.norm(),
        }
    }
}

/// Real 3-vector sample point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A point that can seed an orbit.
///
/// Implementations must preserve magnitude: `|to_orbit(p)|` equals the representation's own
/// norm, so the escape test agrees across representations.
pub trait SamplePoint: Copy {
    fn to_orbit(self) -> Complex64;
}

impl SamplePoint for Complex64 {
    fn to_orbit(self) -> Complex64 {
        self
    }
}

impl SamplePoint for Vec3 {
    // (y, z) fold into the imaginary axis keeping the sign of y; (x, y, 0) maps to x + iy.
    fn to_orbit(self) -> Complex64 {
        let im = self.y.hypot(self.z);
        Complex64::new(self.x, if self.y < 0.0 { -im } else { im })
    }
}

/// Iteration parameters shared by every cell of a grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EscapeParams {
    pub max_iter: u32,
    pub power: f64,
    pub radius: RadiusFormula,
}

impl EscapeParams {
    pub fn new(max_iter: u32, power: f64) -> Self {
        Self {
            max_iter,
            power,
            radius: RadiusFormula::default(),
        }
    }

    pub fn with_radius(mut self, radius: RadiusFormula) -> Self {
        self.radius = radius;
        self
    }
}

/// Escape index of `z0` with the default radius formula. Returns `max_iter` for bounded orbits.
pub fn evaluate<P: SamplePoint>(z0: P, max_iter: u32, power: f64) -> u32 {
    escape_index(z0, &EscapeParams::new(max_iter, power))
}

/// Escape index of `z0`, in `[0, params.max_iter]`.
pub fn escape_index<P: SamplePoint>(z0: P, params: &EscapeParams) -> u32 {
    let c = z0.to_orbit();
    let mut z = c;
    for n in 0..params.max_iter {
        if has_escaped(z) {
            return n;
        }
        z = step(z, c, params);
    }
    params.max_iter
}

fn has_escaped(z: Complex64) -> bool {
    !(z.re.is_finite() && z.im.is_finite()) || z.norm() > ESCAPE_RADIUS
}

fn step(z: Complex64, c: Complex64, params: &EscapeParams) -> Complex64 {
    let r = params.radius.radius(z);
    if r == 0.0 {
        return c;
    }
    let p = params.power;
    let theta = (z.re / r).clamp(-1.0, 1.0).acos();
    let phi = z.im.atan2(z.re);
    Complex64::from_polar(r.powf(p), p * theta) * (p * phi).cos() + c
}
