use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Failed to load label image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Label matrices differ in shape: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Row {row} has {found} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Label {label} does not fit in the output pixel format")]
    LabelOverflow { label: u32 },

    /// The user aborted the edit session. The original labels are untouched.
    #[error("Edit session cancelled by the user")]
    Cancelled,

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, LabelError>;

/// Reasons an edit operation was refused. A rejected operation leaves the
/// session exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalOperation {
    #[error("No object under the cursor")]
    NoObject,

    #[error("No control point within reach of the cursor")]
    NoVertex,

    #[error("No chain segment projects onto the cursor")]
    NoSegmentInRange,

    #[error("No object is open for editing")]
    NothingOpen,

    #[error("Joining needs at least two open objects, found {0}")]
    TooFewObjects(usize),

    #[error("Object {0} is already open for editing")]
    AlreadyOpen(u32),

    #[error("Split points belong to different objects")]
    DifferentObjects,

    #[error("Split points are too close along the chain")]
    SplitTooClose,

    #[error("A split across chains must join an outer chain to one of its holes")]
    SplitWrongChains,

    #[error("Every object id is already in use")]
    IdsExhausted,

    #[error("Moving the control point would cross another edge")]
    SelfIntersection,

    #[error("Operation is not available in {0} mode")]
    WrongMode(&'static str),
}
