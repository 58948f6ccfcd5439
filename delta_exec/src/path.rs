//! # Path
//!
//! A path is the sequence of screen positions the robot plays back when the player has to follow
//! it. Paths are stored as JSON, either as a bare list of `[x, y]` pairs or as an object adding
//! per-axis scale factors:
//!
//! ```json
//! { "scale_x": 1.5, "scale_y": 1.5, "points": [[0, 0], [10, 4]] }
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path as FsPath};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A path in screen pixels, scale factors already applied.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Path {
    pub points_px: Vec<Vector2<f64>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot read the path file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot parse the path file: {0}")]
    ParseError(serde_json::Error),

    #[error("The path contains no points")]
    EmptySequence,
}

/// On-disk layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum PathFile {
    Scaled {
        #[serde(default = "unit_scale")]
        scale_x: f64,
        #[serde(default = "unit_scale")]
        scale_y: f64,
        points: Vec<[f64; 2]>,
    },
    Bare(Vec<[f64; 2]>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Path {
    /// Load a path from a JSON file.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self, PathError> {
        let json = read_to_string(path).map_err(PathError::FileLoadError)?;

        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, PathError> {
        let file: PathFile = serde_json::from_str(json).map_err(PathError::ParseError)?;

        let (scale_x, scale_y, points) = match file {
            PathFile::Scaled {
                scale_x,
                scale_y,
                points,
            } => (scale_x, scale_y, points),
            PathFile::Bare(points) => (1.0, 1.0, points),
        };

        if points.is_empty() {
            return Err(PathError::EmptySequence);
        }

        Ok(Self {
            points_px: points
                .iter()
                .map(|p| Vector2::new(p[0] * scale_x, p[1] * scale_y))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.points_px.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_px.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        self.points_px.get(index).map(|p| (p.x, p.y))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn unit_scale() -> f64 {
    1.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bare_path() {
        let path = Path::from_json_str("[[0, 0], [10.5, 4], [720, 450]]").unwrap();

        assert_eq!(path.len(), 3);
        assert_eq!(path.get(1), Some((10.5, 4.0)));
        assert_eq!(path.get(3), None);
    }

    #[test]
    fn test_scaled_path() {
        let path = Path::from_json_str(
            r#"{ "scale_x": 2.0, "scale_y": 0.5, "points": [[1, 2], [3, 4]] }"#,
        )
        .unwrap();

        assert_eq!(path.points_px, vec![Vector2::new(2.0, 1.0), Vector2::new(6.0, 2.0)]);

        // Missing factors default to no scaling
        let path = Path::from_json_str(r#"{ "scale_x": 2.0, "points": [[1, 2]] }"#).unwrap();
        assert_eq!(path.get(0), Some((2.0, 2.0)));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(matches!(
            Path::from_json_str("[]"),
            Err(PathError::EmptySequence)
        ));
        assert!(matches!(
            Path::from_json_str(r#"{ "points": [[1, 2, 3]] }"#),
            Err(PathError::ParseError(_))
        ));
    }
}
