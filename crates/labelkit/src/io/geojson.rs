use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    edit::Snapshot,
    error::{LabelError, Result},
    types::{BoundaryChain, ChainKind, GridPoint},
};

/// Properties carried by every chain feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties of one boundary chain")]
pub struct ChainProperties {
    #[schemars(description = "Id of the object the chain bounds")]
    pub object: u32,
    #[schemars(description = "Whether the chain is an outer boundary rather than a hole")]
    pub outside: bool,
    #[schemars(description = "Whether the chain changed since it was traced")]
    pub edited: bool,
    #[schemars(description = "Number of distinct control points")]
    pub vertex_count: usize,
}

impl From<&BoundaryChain> for ChainProperties {
    fn from(chain: &BoundaryChain) -> Self {
        Self {
            object: chain.object,
            outside: chain.is_outside(),
            edited: chain.edited,
            vertex_count: chain.vertices().len(),
        }
    }
}

/// One Polygon feature per chain; GeoJSON x is the column, y the row.
pub fn chains_to_geojson(
    chains: &[BoundaryChain],
    shape: (usize, usize),
) -> Result<FeatureCollection> {
    let mut features = Vec::with_capacity(chains.len());
    for (i, chain) in chains.iter().enumerate() {
        let ring: Vec<Vec<f64>> = chain
            .points()
            .iter()
            .map(|p| vec![p.col as f64, p.row as f64])
            .collect();
        let properties = match serde_json::to_value(ChainProperties::from(chain))? {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
            properties,
            foreign_members: None,
        });
    }

    let mut foreign_members = serde_json::Map::new();
    foreign_members.insert("image_height".to_string(), serde_json::Value::from(shape.0));
    foreign_members.insert("image_width".to_string(), serde_json::Value::from(shape.1));
    foreign_members.insert("chain_count".to_string(), serde_json::Value::from(chains.len()));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    })
}

/// Read chains back from a collection written by [`chains_to_geojson`].
/// Features without a polygon or chain properties are skipped.
pub fn chains_from_geojson_str(geojson_str: &str) -> Result<Vec<BoundaryChain>> {
    let collection: FeatureCollection = geojson_str.parse()?;
    let mut chains = Vec::new();
    for feature in collection.features {
        let Some(Geometry {
            value: Value::Polygon(rings),
            ..
        }) = feature.geometry
        else {
            continue;
        };
        let Some(properties) = feature.properties else {
            continue;
        };
        let props: ChainProperties = serde_json::from_value(serde_json::Value::Object(properties))?;
        let Some(ring) = rings.into_iter().next() else {
            continue;
        };
        let points = ring
            .iter()
            .map(|coord| match coord.as_slice() {
                [x, y, ..] => Ok(GridPoint::new(y.round() as i32, x.round() as i32)),
                _ => Err(LabelError::InvariantViolation(format!(
                    "chain of object {} has a coordinate with {} values",
                    props.object,
                    coord.len()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        let kind = if props.outside {
            ChainKind::Outside
        } else {
            ChainKind::Hole
        };
        let chain = BoundaryChain::new(props.object, kind, points);
        chains.push(if props.edited { chain.into_edited() } else { chain });
    }
    Ok(chains)
}

impl Snapshot {
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        chains_to_geojson(&self.chains, self.labels.shape())
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson()?)?)
    }

    pub fn save_geojson(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}
