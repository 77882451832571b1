use glam::Vec3;
use scenery_base::ArenaError;

pub type SceneResult<T> = Result<T, VisibilityError>;

#[derive(Debug)]
pub enum VisibilityError {
    /// Arena or heap exhaustion. A failed query build means nothing is visible this frame.
    OutOfMemory(ArenaError),
    DegenerateWorldExtents { min: Vec3, max: Vec3 },
    InvalidLodSchemes(String),
    Json(serde_json::Error),
}

impl std::error::Error for VisibilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            VisibilityError::OutOfMemory(ref e) => Some(e),
            VisibilityError::DegenerateWorldExtents { .. } => None,
            VisibilityError::InvalidLodSchemes(_) => None,
            VisibilityError::Json(ref e) => Some(e),
        }
    }
}

impl core::fmt::Display for VisibilityError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            VisibilityError::OutOfMemory(ref e) => e.fmt(fmt),
            VisibilityError::DegenerateWorldExtents { min, max } => write!(
                fmt,
                "Degenerate world extents: min {:?} is not below max {:?}",
                min, max
            ),
            VisibilityError::InvalidLodSchemes(ref msg) => {
                write!(fmt, "Invalid LOD schemes: {}", msg)
            }
            VisibilityError::Json(ref e) => e.fmt(fmt),
        }
    }
}

impl From<ArenaError> for VisibilityError {
    fn from(error: ArenaError) -> Self {
        VisibilityError::OutOfMemory(error)
    }
}

impl From<serde_json::Error> for VisibilityError {
    fn from(error: serde_json::Error) -> Self {
        VisibilityError::Json(error)
    }
}
