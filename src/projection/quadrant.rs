//! Axis orientation of projected coordinates.
//!
//! The quadrant code names the compass direction each planar axis increases
//! toward:
//!
//! | code | x    | y     |
//! |------|------|-------|
//! | 1    | east | north |
//! | 2    | west | north |
//! | 3    | west | south |
//! | 4    | east | south |
//!
//! A negative code applies the same signs and then swaps the axes, giving
//! eight variants. Zero is stored by old dictionaries and means 1.

use crate::geoframe_errors::{GeoframeError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrant {
    flip_x: bool,
    flip_y: bool,
    swap: bool,
}

impl Quadrant {
    pub const STANDARD: Quadrant = Quadrant {
        flip_x: false,
        flip_y: false,
        swap: false,
    };

    pub fn from_code(code: i16) -> Result<Self, GeoframeError> {
        let (flip_x, flip_y) = match code.unsigned_abs() {
            0 | 1 => (false, false),
            2 => (true, false),
            3 => (true, true),
            4 => (false, true),
            _ => {
                return Err(GeoframeError::Validation(ValidationErrors::single(
                    "",
                    format!("quadrant code {code} is outside -4..=4"),
                )))
            }
        };
        Ok(Quadrant {
            flip_x,
            flip_y,
            swap: code < 0,
        })
    }

    pub fn code(&self) -> i16 {
        let base = match (self.flip_x, self.flip_y) {
            (false, false) => 1,
            (true, false) => 2,
            (true, true) => 3,
            (false, true) => 4,
        };
        if self.swap {
            -base
        } else {
            base
        }
    }

    pub fn is_standard(&self) -> bool {
        *self == Quadrant::STANDARD
    }

    /// Natural (east, north) offsets from the false origin to stored axes.
    pub fn apply(&self, east: f64, north: f64) -> [f64; 2] {
        let x = if self.flip_x { -east } else { east };
        let y = if self.flip_y { -north } else { north };
        if self.swap {
            [y, x]
        } else {
            [x, y]
        }
    }

    /// Stored axes back to natural (east, north) offsets.
    pub fn invert(&self, x: f64, y: f64) -> [f64; 2] {
        let (x, y) = if self.swap { (y, x) } else { (x, y) };
        [
            if self.flip_x { -x } else { x },
            if self.flip_y { -y } else { y },
        ]
    }
}

#[cfg(test)]
mod test_quadrant {
    use super::*;

    #[test]
    fn test_every_code_inverts() {
        for code in -4..=4i16 {
            let q = Quadrant::from_code(code).unwrap();
            let [x, y] = q.apply(3.0, -7.0);
            assert_eq!(q.invert(x, y), [3.0, -7.0], "quad {code}");
            if code != 0 {
                assert_eq!(q.code(), code);
            }
        }
    }

    #[test]
    fn test_orientation() {
        assert_eq!(Quadrant::from_code(2).unwrap().apply(1.0, 2.0), [-1.0, 2.0]);
        assert_eq!(Quadrant::from_code(-1).unwrap().apply(1.0, 2.0), [2.0, 1.0]);
        assert_eq!(Quadrant::from_code(-3).unwrap().apply(1.0, 2.0), [-2.0, -1.0]);
        assert!(Quadrant::from_code(0).unwrap().is_standard());
        assert!(Quadrant::from_code(5).is_err());
    }
}
