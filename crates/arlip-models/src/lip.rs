//! Lip region coordinates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when lip coordinates fall outside the normalized range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid lip coordinate {field}: {value} (must be within [0, 1])")]
pub struct CoordinateError {
    /// Name of the offending field
    pub field: &'static str,
    /// The rejected value
    pub value: f64,
}

/// Lip region within the generated video, in normalized coordinates.
///
/// All four values are fractions of the video frame, each constrained to
/// `[0, 1]`. Construction goes through [`LipCoordinates::new`], which rejects
/// out-of-range or non-finite values immediately rather than deferring to a
/// later validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawLipCoordinates")]
pub struct LipCoordinates {
    /// X coordinate (0 = left, 1 = right)
    pub x: f64,
    /// Y coordinate (0 = top, 1 = bottom)
    pub y: f64,
    /// Width as fraction of frame width
    pub width: f64,
    /// Height as fraction of frame height
    pub height: f64,
}

/// Unvalidated wire form, only used as a serde gate into [`LipCoordinates`].
#[derive(Debug, Deserialize, JsonSchema)]
struct RawLipCoordinates {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RawLipCoordinates> for LipCoordinates {
    type Error = CoordinateError;

    fn try_from(raw: RawLipCoordinates) -> Result<Self, Self::Error> {
        LipCoordinates::new(raw.x, raw.y, raw.width, raw.height)
    }
}

impl LipCoordinates {
    /// Create validated lip coordinates.
    ///
    /// Fails if any value is outside `[0, 1]` or not finite.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, CoordinateError> {
        check_unit("x", x)?;
        check_unit("y", y)?;
        check_unit("width", width)?;
        check_unit("height", height)?;
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), CoordinateError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(CoordinateError { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bounds() {
        assert!(LipCoordinates::new(0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(LipCoordinates::new(1.0, 1.0, 1.0, 1.0).is_ok());
        assert!(LipCoordinates::new(0.4, 0.6, 0.2, 0.1).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = LipCoordinates::new(1.01, 0.5, 0.2, 0.1).unwrap_err();
        assert_eq!(err.field, "x");

        let err = LipCoordinates::new(0.5, -0.1, 0.2, 0.1).unwrap_err();
        assert_eq!(err.field, "y");

        assert!(LipCoordinates::new(0.5, 0.5, 2.0, 0.1).is_err());
        assert!(LipCoordinates::new(0.5, 0.5, 0.2, f64::NAN).is_err());
        assert!(LipCoordinates::new(f64::INFINITY, 0.5, 0.2, 0.1).is_err());
    }

    #[test]
    fn test_deserialization_validates() {
        let ok: Result<LipCoordinates, _> =
            serde_json::from_str(r#"{"x":0.4,"y":0.6,"width":0.2,"height":0.1}"#);
        assert!(ok.is_ok());

        let bad: Result<LipCoordinates, _> =
            serde_json::from_str(r#"{"x":1.4,"y":0.6,"width":0.2,"height":0.1}"#);
        assert!(bad.is_err());
    }
}
