use super::GeoClusterId;
use crate::{
    error::{ClusterError, HotspotError, HotspotResult},
    geo::{self, Coord, Geo, HilbertRTree, EARTH_RADIUS_KM},
};
use log::debug;

/// How the clusterer finds the neighbors of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborSearch {
    /// Query a Hilbert R-tree built over the batch, then check the exact distance.
    #[default]
    SpatialIndex,
    /// Compare every pair of points. Quadratic, only sensible for a few hundred points or for
    /// checking the index.
    BruteForce,
}

/// Parameters for the density clusterer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Neighborhood radius in kilometers.
    pub eps_km: f64,
    /// Number of points (including itself) within `eps_km` needed for a point to be a core point.
    pub min_samples: usize,
    /// Radius of the sphere distances are measured on.
    pub earth_radius_km: f64,
    pub search: NeighborSearch,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams {
            eps_km: 0.200,
            min_samples: 4,
            earth_radius_km: EARTH_RADIUS_KM,
            search: NeighborSearch::SpatialIndex,
        }
    }
}

impl ClusterParams {
    /// The neighborhood radius as an angle, which is how distances are compared on the sphere.
    pub fn eps_radians(&self) -> f64 {
        self.eps_km / self.earth_radius_km
    }

    pub fn validate(&self) -> HotspotResult<()> {
        if !(self.eps_km.is_finite() && self.eps_km > 0.0) {
            return Err(HotspotError::invalid_config(format!(
                "eps_km must be a positive number, got {}",
                self.eps_km
            )));
        }

        if !(self.earth_radius_km.is_finite() && self.earth_radius_km > 0.0) {
            return Err(HotspotError::invalid_config(format!(
                "earth_radius_km must be a positive number, got {}",
                self.earth_radius_km
            )));
        }

        if self.min_samples == 0 {
            return Err(HotspotError::invalid_config(
                "min_samples must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }
}

/**
 * DBSCAN on the surface of a sphere.
 *
 * A point is a core point if at least `min_samples` points, itself included, are within `eps_km`
 * great circle distance. Core points within reach of each other form a cluster, along with any
 * non-core (border) points in their neighborhoods. Everything else is noise.
 *
 * Clusters are seeded from core points in the order they appear in the input, so cluster 0 always
 * contains the first core point. A border point within reach of two clusters goes to whichever was
 * seeded first.
 */
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    params: ClusterParams,
}

impl DensityClusterer {
    pub fn new(params: ClusterParams) -> HotspotResult<Self> {
        params.validate()?;
        Ok(DensityClusterer { params })
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /**
     * Label every point with the cluster it belongs to.
     *
     * #Returns
     * One label per point, in the same order as `points`. An empty input gives an empty output.
     */
    pub fn cluster<T: Geo>(&self, points: &[T]) -> Result<Vec<GeoClusterId>, ClusterError> {
        if points.is_empty() {
            return Ok(vec![]);
        }

        let coords: Vec<Coord> = points.iter().map(Geo::centroid).collect();
        if let Some(index) = coords
            .iter()
            .position(|c| !(c.lat.is_finite() && c.lon.is_finite()))
        {
            return Err(ClusterError {
                index,
                msg: "non-finite coordinate",
            });
        }

        let angle = self.params.eps_radians();
        let neighborhoods = match self.params.search {
            NeighborSearch::SpatialIndex => {
                let normalized: Vec<Coord> = coords.iter().map(Coord::normalized).collect();
                let tree = HilbertRTree::build_for(&normalized);
                neighborhoods(&IndexedSearch {
                    coords: &coords,
                    normalized: &normalized,
                    tree: &tree,
                    angle,
                })?
            }
            NeighborSearch::BruteForce => neighborhoods(&BruteForceSearch {
                coords: &coords,
                angle,
            })?,
        };

        let labels = expand_clusters(&neighborhoods, self.params.min_samples);

        if log::log_enabled!(log::Level::Debug) {
            let num_clusters = labels
                .iter()
                .filter(|l| !l.is_noise())
                .map(|l| l.value())
                .max()
                .map(|max| max + 1)
                .unwrap_or(0);
            let num_noise = labels.iter().filter(|l| l.is_noise()).count();
            debug!(
                "clustered {} points into {} geoclusters with {} noise points",
                labels.len(),
                num_clusters,
                num_noise
            );
        }

        Ok(labels)
    }
}

/// Find every point within the neighborhood radius of the point at `index`.
trait RegionQuery {
    fn len(&self) -> usize;

    /// Push the indexes of all neighbors, including `index` itself, onto `buffer`.
    fn neighbors(&self, index: usize, buffer: &mut Vec<usize>) -> Result<(), ClusterError>;
}

struct BruteForceSearch<'a> {
    coords: &'a [Coord],
    angle: f64,
}

impl<'a> RegionQuery for BruteForceSearch<'a> {
    fn len(&self) -> usize {
        self.coords.len()
    }

    fn neighbors(&self, index: usize, buffer: &mut Vec<usize>) -> Result<(), ClusterError> {
        let center = self.coords[index];
        for (other, &coord) in self.coords.iter().enumerate() {
            if within(center, coord, self.angle, other)? {
                buffer.push(other);
            }
        }

        Ok(())
    }
}

struct IndexedSearch<'a> {
    coords: &'a [Coord],
    /// The same points folded into the domain of the tree.
    normalized: &'a [Coord],
    tree: &'a HilbertRTree,
    angle: f64,
}

impl<'a> RegionQuery for IndexedSearch<'a> {
    fn len(&self) -> usize {
        self.coords.len()
    }

    fn neighbors(&self, index: usize, buffer: &mut Vec<usize>) -> Result<(), ClusterError> {
        let center = self.coords[index];

        let mut candidates = vec![];
        for region in geo::search_boxes(self.normalized[index], self.angle) {
            self.tree.query(&region, &mut candidates);
        }

        // A point sitting on the antimeridian can land in two boxes.
        candidates.sort_unstable();
        candidates.dedup();

        for other in candidates {
            if within(center, self.coords[other], self.angle, other)? {
                buffer.push(other);
            }
        }

        Ok(())
    }
}

fn within(center: Coord, coord: Coord, angle: f64, index: usize) -> Result<bool, ClusterError> {
    let dist = geo::central_angle(center, coord);
    if !dist.is_finite() {
        return Err(ClusterError {
            index,
            msg: "non-finite great circle distance",
        });
    }

    Ok(dist <= angle)
}

/// The sorted neighbor list of every point.
fn neighborhoods<Q: RegionQuery>(query: &Q) -> Result<Vec<Vec<usize>>, ClusterError> {
    let mut hoods = Vec::with_capacity(query.len());
    for index in 0..query.len() {
        let mut buffer = vec![];
        query.neighbors(index, &mut buffer)?;
        buffer.sort_unstable();
        hoods.push(buffer);
    }

    Ok(hoods)
}

fn expand_clusters(neighborhoods: &[Vec<usize>], min_samples: usize) -> Vec<GeoClusterId> {
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|hood| hood.len() >= min_samples)
        .collect();

    let mut labels = vec![GeoClusterId::NOISE; neighborhoods.len()];
    let mut next_id = 0;
    let mut stack = vec![];

    for seed in 0..neighborhoods.len() {
        if !labels[seed].is_noise() || !is_core[seed] {
            continue;
        }

        let id = GeoClusterId::new(next_id);
        next_id += 1;

        stack.push(seed);
        while let Some(pnt) = stack.pop() {
            if !labels[pnt].is_noise() {
                continue;
            }
            labels[pnt] = id;

            // Border points join the cluster but do not extend it.
            if is_core[pnt] {
                stack.extend(
                    neighborhoods[pnt]
                        .iter()
                        .copied()
                        .filter(|&n| labels[n].is_noise()),
                );
            }
        }
    }

    labels
}
