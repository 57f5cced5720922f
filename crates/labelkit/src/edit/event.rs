use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{error::IllegalOperation, labels::LabelMatrix, types::{BoundaryChain, GridPoint}};

use super::mode::EditMode;

/// Cursor position in image coordinates. Sub-pixel values are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cursor {
    pub row: f64,
    pub col: f64,
}

impl Cursor {
    pub const fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Nearest grid point.
    pub fn to_grid(self) -> GridPoint {
        GridPoint::new(self.row.round() as i32, self.col.round() as i32)
    }

    pub fn distance_to(self, p: GridPoint) -> f64 {
        (self.row - p.row as f64).hypot(self.col - p.col as f64)
    }

    pub fn to_coord(self) -> geo_types::Coord<f64> {
        geo_types::Coord {
            x: self.col,
            y: self.row,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Primary,
    Secondary,
}

/// Which of the three side-by-side views received a click.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Panel {
    /// The editable view of every object.
    #[default]
    Original,
    /// Objects currently marked keep; clicking one marks it remove.
    Keep,
    /// Objects currently marked remove; clicking one marks it keep.
    Remove,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
    EnumIter, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditKey {
    Join,
    ConvexHull,
    AddPoint,
    DeletePoint,
    NewObject,
    Split,
    Escape,
    KeepAll,
    RemoveAll,
    InvertAll,
    Reset,
}

/// A discrete input delivered to an [`EditSession`](super::EditSession).
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Display, VariantNames,
    IntoStaticStr,
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum EditEvent {
    /// Mouse button pressed
    #[serde(rename = "click")]
    Click {
        at: Cursor,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        panel: Panel,
    },

    /// Mouse button released
    #[serde(rename = "release")]
    Release { at: Cursor },

    /// Pointer moved
    #[serde(rename = "motion")]
    Motion { at: Cursor },

    /// Key pressed with the pointer at `at`
    #[serde(rename = "key")]
    Key { key: EditKey, at: Cursor },

    /// Accept the edits
    #[serde(rename = "done")]
    Done,

    /// Abandon the edits
    #[serde(rename = "cancel")]
    Cancel,
}

impl EditEvent {
    /// JSON schema for event scripts
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EditEvent)
    }

    pub fn event_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Click { .. } => "Press a mouse button over one of the panels",
            Self::Release { .. } => "Release the mouse button, ending a drag",
            Self::Motion { .. } => {
                "Move the pointer, dragging a control point or previewing a split"
            }
            Self::Key { .. } => "Press an editing key",
            Self::Done => "Close every open object and accept the session",
            Self::Cancel => "Discard every edit and restore the original labels",
        }
    }
}

/// Preview of the cut a second split pick would make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPreview {
    pub from: GridPoint,
    pub to: Cursor,
    /// Whether the vertex under the cursor would be accepted.
    pub legal: bool,
}

/// What the display should refresh after an applied event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderHints {
    pub labels_changed: bool,
    pub chains_changed: bool,
    pub preview: Option<SplitPreview>,
}

impl RenderHints {
    pub fn labels() -> Self {
        Self {
            labels_changed: true,
            chains_changed: true,
            preview: None,
        }
    }

    pub fn chains() -> Self {
        Self {
            chains_changed: true,
            ..Self::default()
        }
    }

    pub fn keep() -> Self {
        Self {
            labels_changed: true,
            ..Self::default()
        }
    }
}

/// Result of feeding one event to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Applied(RenderHints),
    /// The event was refused and the session is unchanged.
    Rejected(IllegalOperation),
    Finished,
    Cancelled,
}

/// Immutable copy of what the interaction surface needs to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: EditMode,
    pub labels: LabelMatrix,
    pub chains: Vec<BoundaryChain>,
    /// Keep flag of every object id.
    pub keep: BTreeMap<u32, bool>,
}
