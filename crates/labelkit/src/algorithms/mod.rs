pub mod tracing;
pub mod rasterize;
pub mod hull;
pub mod morphology;

pub use self::tracing::{MooreTracer, TraceOptions};
pub use rasterize::{polygon_to_mask, ScanlineRasterizer};
pub use hull::{convex_hull_chain, convex_hull_mask};
pub use morphology::{dilate, expand_labels, StructuringElement};
