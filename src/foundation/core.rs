use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const VERTICAL_HD: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };

    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation("canvas width/height must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ReelError::validation("canvas width/height must fit in u16"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // The encoder targets yuv420p, which needs even dimensions.
            return Err(ReelError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// Straight-alpha sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8 { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb8 = Rgb8 {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_validation_catches_bad_values() {
        assert!(Canvas::VERTICAL_HD.validate().is_ok());
        assert!(
            Canvas {
                width: 0,
                height: 10
            }
            .validate()
            .is_err()
        );
        assert!(
            Canvas {
                width: 11,
                height: 10
            }
            .validate()
            .is_err()
        );
        assert!(
            Canvas {
                width: 70_000,
                height: 10
            }
            .validate()
            .is_err()
        );
    }
}
