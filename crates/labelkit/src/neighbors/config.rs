use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::algorithms::StructuringElement;

/// How far apart two objects may be and still count as neighbours.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, IntoStaticStr,
)]
#[serde(tag = "method", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistanceMode {
    /// Objects whose pixels touch, 8-connected.
    Adjacent,
    /// Grow every object into the background until it meets another, then
    /// test adjacency. `limit` caps the growth distance in pixels.
    Expand {
        #[serde(default)]
        limit: Option<u32>,
    },
    /// Objects within `distance` pixels of each other.
    Within { distance: u32 },
}

impl Default for DistanceMode {
    fn default() -> Self {
        Self::Expand { limit: None }
    }
}

impl DistanceMode {
    /// Suffix used in measurement names.
    pub fn scale(&self) -> String {
        match self {
            Self::Adjacent => "Adjacent".to_string(),
            Self::Expand { .. } => "Expanded".to_string(),
            Self::Within { distance } => distance.to_string(),
        }
    }

    /// Element an object is dilated with to find its neighbours.
    pub fn neighbor_element(&self) -> StructuringElement {
        match self {
            Self::Adjacent | Self::Expand { .. } => StructuringElement::square(1),
            Self::Within { distance } => StructuringElement::disk(*distance as f64),
        }
    }

    /// Element other objects are dilated with when deciding whether a
    /// perimeter pixel touches them.
    pub fn touching_element(&self) -> StructuringElement {
        match self {
            Self::Adjacent | Self::Expand { .. } => StructuringElement::square(1),
            Self::Within { distance } => StructuringElement::disk(*distance as f64 + 0.5),
        }
    }
}

/// Which objects compete for the closest-neighbour fields.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClosestPolicy {
    /// Only objects found to be neighbours.
    #[default]
    AmongNeighbors,
    /// Every object of the neighbour set that has pixels.
    AllObjects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NeighborConfig {
    pub object_name: String,
    /// Equal to `object_name` when objects are measured against themselves.
    pub neighbor_name: String,
    pub distance: DistanceMode,
    pub closest: ClosestPolicy,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            object_name: "Cells".to_string(),
            neighbor_name: "Cells".to_string(),
            distance: DistanceMode::default(),
            closest: ClosestPolicy::default(),
        }
    }
}

impl NeighborConfig {
    pub fn new(object_name: impl Into<String>, distance: DistanceMode) -> Self {
        let object_name = object_name.into();
        Self {
            neighbor_name: object_name.clone(),
            object_name,
            distance,
            closest: ClosestPolicy::default(),
        }
    }

    pub fn against(mut self, neighbor_name: impl Into<String>) -> Self {
        self.neighbor_name = neighbor_name.into();
        self
    }

    pub fn with_closest(mut self, closest: ClosestPolicy) -> Self {
        self.closest = closest;
        self
    }

    pub fn is_self(&self) -> bool {
        self.object_name == self.neighbor_name
    }
}
