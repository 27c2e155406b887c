use serde::Serialize;
use std::fmt::{self, Display};

/**
 * The label the density clusterer gives to a point.
 *
 * Ids are handed out densely from zero in the order clusters are discovered. They only mean
 * something within a single run of the clusterer. The special value [GeoClusterId::NOISE] marks
 * points that did not end up in any cluster.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GeoClusterId(i32);

impl GeoClusterId {
    /// The label for points that are not in any cluster.
    pub const NOISE: GeoClusterId = GeoClusterId(-1);

    pub(crate) fn new(id: i32) -> Self {
        debug_assert!(id >= 0);
        GeoClusterId(id)
    }

    /// Is this the noise label?
    pub fn is_noise(self) -> bool {
        self == Self::NOISE
    }

    /// The raw integer value, -1 for noise.
    pub fn value(self) -> i32 {
        self.0
    }
}

impl Display for GeoClusterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if self.is_noise() {
            write!(f, "noise")
        } else {
            write!(f, "geocluster {}", self.0)
        }
    }
}
