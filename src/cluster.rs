/*!
 * Density based clustering of points on the surface of the Earth.
 *
 * Incident reports that pile up in the same neighborhood are grouped into geoclusters. Reports
 * without enough neighbors are labeled as noise and never become part of a cluster.
 */

pub use cluster_id::GeoClusterId;
pub use dbscan::{ClusterParams, DensityClusterer, NeighborSearch};

mod cluster_id;
mod dbscan;
