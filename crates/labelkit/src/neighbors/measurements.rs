use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum Feature {
    NumberOfNeighbors,
    PercentTouching,
    FirstClosestObjectNumber,
    FirstClosestDistance,
    SecondClosestObjectNumber,
    SecondClosestDistance,
    AngleBetweenNeighbors,
}

/// Measurements of one object. Undefined values are `None` and serialize
/// as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNeighbors {
    pub object: u32,
    pub neighbor_count: usize,
    /// Only measured when objects are compared against themselves.
    pub percent_touching: Option<f64>,
    pub first_closest: Option<u32>,
    pub first_distance: Option<f64>,
    pub second_closest: Option<u32>,
    pub second_distance: Option<f64>,
    /// Degrees at this object's centroid between the two closest neighbours.
    pub angle: Option<f64>,
}

impl ObjectNeighbors {
    /// Row for an object with no pixels.
    pub fn empty(object: u32, self_mode: bool) -> Self {
        Self {
            object,
            neighbor_count: 0,
            percent_touching: self_mode.then_some(0.0),
            first_closest: None,
            first_distance: None,
            second_closest: None,
            second_distance: None,
            angle: None,
        }
    }

    pub fn first_distance_or_nan(&self) -> f64 {
        self.first_distance.unwrap_or(f64::NAN)
    }

    pub fn second_distance_or_nan(&self) -> f64 {
        self.second_distance.unwrap_or(f64::NAN)
    }

    pub fn angle_or_nan(&self) -> f64 {
        self.angle.unwrap_or(f64::NAN)
    }

    /// Numeric value of a feature. Missing object numbers are 0, other
    /// undefined values NaN.
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::NumberOfNeighbors => self.neighbor_count as f64,
            Feature::PercentTouching => self.percent_touching.unwrap_or(f64::NAN),
            Feature::FirstClosestObjectNumber => self.first_closest.unwrap_or(0) as f64,
            Feature::FirstClosestDistance => self.first_distance_or_nan(),
            Feature::SecondClosestObjectNumber => self.second_closest.unwrap_or(0) as f64,
            Feature::SecondClosestDistance => self.second_distance_or_nan(),
            Feature::AngleBetweenNeighbors => self.angle_or_nan(),
        }
    }
}

/// One neighbour edge, `first` from the measured set and `second` from the
/// neighbour set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub first: u32,
    pub second: u32,
}

/// Everything one neighbour measurement produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborMeasurements {
    pub object_name: String,
    pub neighbor_name: String,
    pub scale: String,
    pub self_mode: bool,
    /// One row per id `1..=max id`, in id order.
    pub rows: Vec<ObjectNeighbors>,
    pub relationships: Vec<Relationship>,
}

impl NeighborMeasurements {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, object: u32) -> Option<&ObjectNeighbors> {
        (object as usize)
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .filter(|r| r.object == object)
    }

    /// Features reported in this mode; cross-set runs skip percent touching.
    pub fn features(&self) -> Vec<Feature> {
        Feature::iter()
            .filter(|f| self.self_mode || *f != Feature::PercentTouching)
            .collect()
    }

    /// `Neighbors_<Feature>_<Scale>`, or `Neighbors_<Feature>_<NeighborSet>_<Scale>`
    /// across sets.
    pub fn feature_name(&self, feature: Feature) -> String {
        if self.self_mode {
            format!("Neighbors_{feature}_{}", self.scale)
        } else {
            format!("Neighbors_{feature}_{}_{}", self.neighbor_name, self.scale)
        }
    }

    pub fn column(&self, feature: Feature) -> Vec<f64> {
        self.rows.iter().map(|r| r.value(feature)).collect()
    }

    /// Named columns in feature order.
    pub fn columns(&self) -> Vec<(String, Vec<f64>)> {
        self.features()
            .into_iter()
            .map(|f| (self.feature_name(f), self.column(f)))
            .collect()
    }
}
