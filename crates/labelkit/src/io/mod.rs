pub mod geojson;
pub mod raster;
pub mod table;

pub use self::geojson::{chains_from_geojson_str, chains_to_geojson, ChainProperties};
pub use raster::{labels_from_image, labels_to_image, load_labels, save_labels};
