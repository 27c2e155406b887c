/*!
 * Geographic calculations.
 *
 * Everything here treats the Earth as a sphere. That is plenty accurate at the scale of a
 * neighborhood full of incident reports.
 */
use std::fmt::{self, Display};

pub use hilbert_rtree::HilbertRTree;

mod hilbert_rtree;

/// Mean radius of the Earth in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

const DEG2RAD: f64 = 2.0 * std::f64::consts::PI / 360.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    /// Check that both values are finite. Values outside the usual ranges still name a point on
    /// the sphere and are accepted.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /**
     * The same point on the sphere with latitude in [-90, 90] and longitude in [-180, 180].
     *
     * A latitude past a pole comes back down the other side, half way around the world.
     */
    pub fn normalized(&self) -> Coord {
        let mut lat = wrap_degrees(self.lat);
        let mut lon = self.lon;

        if lat > 90.0 {
            lat = 180.0 - lat;
            lon += 180.0;
        } else if lat < -90.0 {
            lat = -180.0 - lat;
            lon += 180.0;
        }

        Coord {
            lat,
            lon: wrap_degrees(lon),
        }
    }
}

/// Wrap an angle in degrees into [-180, 180].
fn wrap_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

impl Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A latitude / longitude aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// The lower left (south west) corner.
    pub ll: Coord,
    /// The upper right (north east) corner.
    pub ur: Coord,
}

impl BoundingBox {
    /// A box that contains nothing and will grow to fit whatever is added to it.
    pub fn empty() -> Self {
        BoundingBox {
            ll: Coord {
                lat: f64::INFINITY,
                lon: f64::INFINITY,
            },
            ur: Coord {
                lat: -f64::INFINITY,
                lon: -f64::INFINITY,
            },
        }
    }

    /// Grow this box so that it also covers `other`.
    pub fn expand_to(&mut self, other: &BoundingBox) {
        self.ll.lat = self.ll.lat.min(other.ll.lat);
        self.ll.lon = self.ll.lon.min(other.ll.lon);
        self.ur.lat = self.ur.lat.max(other.ur.lat);
        self.ur.lon = self.ur.lon.max(other.ur.lon);
    }

    /// Check if these boxes overlap, edges within `eps` of each other count as overlapping.
    pub fn overlap(&self, other: &BoundingBox, eps: f64) -> bool {
        !(self.ll.lat > other.ur.lat + eps
            || self.ur.lat < other.ll.lat - eps
            || self.ll.lon > other.ur.lon + eps
            || self.ur.lon < other.ll.lon - eps)
    }

    /// Check if a coordinate is inside (or on the edge of) this box.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.lat >= self.ll.lat
            && coord.lat <= self.ur.lat
            && coord.lon >= self.ll.lon
            && coord.lon <= self.ur.lon
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "[{} -> {}]", self.ll, self.ur)
    }
}

/// Anything with a location on the surface of the Earth.
pub trait Geo {
    /// The representative point of the item.
    fn centroid(&self) -> Coord;

    /// The smallest box containing the item. For a point this is a degenerate box.
    fn bounding_box(&self) -> BoundingBox {
        let c = self.centroid();
        BoundingBox { ll: c, ur: c }
    }
}

impl Geo for Coord {
    fn centroid(&self) -> Coord {
        *self
    }
}

/**
 * The angle subtended at the center of a sphere by two points on its surface, the haversine
 * formula.
 *
 * #Returns
 * The angle in radians, which is also the great circle distance on the unit sphere.
 */
pub fn central_angle(left: Coord, right: Coord) -> f64 {
    let lat1_r = left.lat * DEG2RAD;
    let lon1_r = left.lon * DEG2RAD;
    let lat2_r = right.lat * DEG2RAD;
    let lon2_r = right.lon * DEG2RAD;

    let dlat2 = (lat2_r - lat1_r) / 2.0;
    let dlon2 = (lon2_r - lon1_r) / 2.0;

    let sin2_dlat = f64::powi(f64::sin(dlat2), 2);
    let sin2_dlon = f64::powi(f64::sin(dlon2), 2);

    // Rounding can push the argument a hair past 1.0 for antipodal points, and a hair below 0.0
    // when a latitude is past a pole.
    let h = (sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r)).clamp(0.0, 1.0);

    2.0 * f64::asin(f64::sqrt(h))
}

/**
 * The simple great circle distance calculation.
 *
 * #Arguments
 * * left - the first point.
 * * right - the second point.
 * * earth_radius_km - the radius of the sphere.
 *
 * #Returns
 * The distance between the points in kilometers.
 */
pub fn great_circle_distance(left: Coord, right: Coord, earth_radius_km: f64) -> f64 {
    central_angle(left, right) * earth_radius_km
}

/// Boxes in latitude / longitude space that cover every point within `angle` radians of
/// `center`.
///
/// Usually this is a single box. Near the antimeridian it is split in two, and near the poles it
/// covers every longitude. The boxes are in the domain of [Coord::normalized].
pub(crate) fn search_boxes(center: Coord, angle: f64) -> Vec<BoundingBox> {
    let center = center.normalized();
    let dlat = angle / DEG2RAD;

    let min_lat = center.lat - dlat;
    let max_lat = center.lat + dlat;

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return vec![BoundingBox {
            ll: Coord {
                lat: min_lat.max(-90.0),
                lon: -180.0,
            },
            ur: Coord {
                lat: max_lat.min(90.0),
                lon: 180.0,
            },
        }];
    }

    // On a sphere, the widest longitude span of a small circle is asin(sin(r) / cos(lat)).
    let ratio = angle.sin() / (center.lat * DEG2RAD).cos();
    if ratio >= 1.0 {
        return vec![BoundingBox {
            ll: Coord {
                lat: min_lat,
                lon: -180.0,
            },
            ur: Coord {
                lat: max_lat,
                lon: 180.0,
            },
        }];
    }
    let dlon = ratio.asin() / DEG2RAD;

    let min_lon = center.lon - dlon;
    let max_lon = center.lon + dlon;

    let main = BoundingBox {
        ll: Coord {
            lat: min_lat,
            lon: min_lon.max(-180.0),
        },
        ur: Coord {
            lat: max_lat,
            lon: max_lon.min(180.0),
        },
    };

    let mut boxes = vec![main];
    if min_lon < -180.0 {
        boxes.push(BoundingBox {
            ll: Coord {
                lat: min_lat,
                lon: min_lon + 360.0,
            },
            ur: Coord {
                lat: max_lat,
                lon: 180.0,
            },
        });
    }
    if max_lon > 180.0 {
        boxes.push(BoundingBox {
            ll: Coord {
                lat: min_lat,
                lon: -180.0,
            },
            ur: Coord {
                lat: max_lat,
                lon: max_lon - 360.0,
            },
        });
    }

    boxes
}
