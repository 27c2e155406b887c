pub use alert::{validate_batch, Alert, AlertBatch, RawAlert};
pub use cluster::{ClusterParams, DensityClusterer, GeoClusterId, NeighborSearch};
pub use distribution::{distribution, predominant, Distribution, LabelShare, Predominant};
pub use engine::{find_hotspots, ClusterAssignment, ClusteringOutcome, EngineConfig, HotspotEngine};
pub use error::{ClusterError, HotspotError, HotspotResult};
pub use geo::{central_angle, great_circle_distance, BoundingBox, Coord, Geo, HilbertRTree};
pub use hotspot::{
    promotion, Hotspot, HotspotLabel, HotspotRefiner, IncidentType, Promotion, PromotionRule,
    RefineParams, Severity, SeverityOutcome, TypeCategory, PROMOTION_RULES,
};
pub use timestamp::{format_timestamp, last_activity, parse_timestamp, LastActivity};

/// Mean radius of the Earth used for all distance calculations by default, in kilometers.
pub const EARTH_RADIUS_KM: f64 = geo::EARTH_RADIUS_KM;

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod alert;
mod cluster;
mod distribution;
mod engine;
mod error;
mod geo;
mod hotspot;
mod timestamp;
