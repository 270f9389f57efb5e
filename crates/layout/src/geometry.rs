//! Geometry primitives: sizes, rectangles, and 2D affine transforms.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const ZERO: Dimensions = Dimensions {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Build from integer pixel sizes as reported by probes.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True when either side is zero (or negative / NaN).
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Strictly wider than tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Round to the nearest even pixel size (minimum 2 per side).
    ///
    /// 4:2:0 chroma subsampling needs even frame sizes.
    pub fn to_even_pixels(&self) -> (u32, u32) {
        (even_pixels(self.width), even_pixels(self.height))
    }
}

fn even_pixels(value: f64) -> u32 {
    if !value.is_finite() || value <= 2.0 {
        return 2;
    }
    let rounded = (value / 2.0).round() as u32 * 2;
    rounded.max(2)
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect of the given size anchored at the zero origin.
    pub fn from_size(size: Dimensions) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn with_origin(&self, x: f64, y: f64) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }
}

/// A 2D affine transform.
///
/// Points map as `x' = a·x + c·y + tx` and `y' = b·x + d·y + ty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Upright-correction transform for a frame of `natural` size that must
    /// be rotated `turns` quarter turns clockwise to display upright.
    ///
    /// The result maps the natural frame onto `[0, w'] x [0, h']`, where
    /// `w'`/`h'` are swapped for odd turns.
    pub fn quarter_turn(turns: u8, natural: Dimensions) -> Self {
        match turns % 4 {
            0 => Self::IDENTITY,
            1 => Self::new(0.0, 1.0, -1.0, 0.0, natural.height, 0.0),
            2 => Self::new(-1.0, 0.0, 0.0, -1.0, natural.width, natural.height),
            _ => Self::new(0.0, -1.0, 1.0, 0.0, 0.0, natural.width),
        }
    }

    /// Apply `self`, then `other`.
    pub fn concat(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Bounding box of `rect` after mapping all four corners.
    pub fn apply_to_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.apply(rect.x, rect.y),
            self.apply(rect.max_x(), rect.y),
            self.apply(rect.x, rect.max_y()),
            self.apply(rect.max_x(), rect.max_y()),
        ];

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Number of clockwise quarter turns in the linear part, if it is a
    /// rotation by a multiple of 90 degrees combined with a positive
    /// (possibly anisotropic) scale. Mirrors and shears return `None`.
    pub fn quarter_turns(&self) -> Option<u8> {
        let zero = |v: f64| v.abs() < EPSILON;
        let pos = |v: f64| v > EPSILON;
        let neg = |v: f64| v < -EPSILON;

        if zero(self.b) && zero(self.c) {
            if pos(self.a) && pos(self.d) {
                return Some(0);
            }
            if neg(self.a) && neg(self.d) {
                return Some(2);
            }
        } else if zero(self.a) && zero(self.d) {
            if pos(self.b) && neg(self.c) {
                return Some(1);
            }
            if neg(self.b) && pos(self.c) {
                return Some(3);
            }
        }
        None
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY)
    }

    /// Component-wise comparison with a small tolerance.
    pub fn approx_eq(&self, other: &AffineTransform) -> bool {
        let close = |l: f64, r: f64| (l - r).abs() < 1e-6;
        close(self.a, other.a)
            && close(self.b, other.b)
            && close(self.c, other.c)
            && close(self.d, other.d)
            && close(self.tx, other.tx)
            && close(self.ty, other.ty)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
