use crate::cluster::GeoClusterId;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

/// The number a hotspot is reported under.
///
/// Numbering starts at 1 and has no gaps within one run. This is a different id space from
/// [GeoClusterId], a geocluster can produce several hotspots or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct HotspotLabel(u32);

impl HotspotLabel {
    pub(crate) fn new(label: u32) -> Self {
        debug_assert!(label >= 1);
        HotspotLabel(label)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Display for HotspotLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "hotspot {}", self.0)
    }
}

/**
 * A group of reports of the same incident type in the same geocluster that passed the promotion
 * rules.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub cluster_label: HotspotLabel,
    /// The geocluster this hotspot was carved out of.
    #[serde(skip)]
    pub geocluster: GeoClusterId,
    /// Arithmetic mean of the member latitudes.
    pub centroid_lat: f64,
    /// Arithmetic mean of the member longitudes.
    pub centroid_lon: f64,
    pub point_count: usize,
    pub dominant_type: String,
    /// The severity the promotion rule reports, not always the plurality label.
    pub dominant_severity: String,
    /// Sorted ascending. Duplicated ids in the input stay duplicated here.
    pub alert_ids_in_cluster: Vec<i64>,
    /// Distance from the centroid to the farthest member.
    pub estimated_radius_km: f64,
    pub public_summary: String,
    /// ISO-8601, UTC.
    pub last_activity_timestamp: String,
    pub type_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<String, usize>,
}

impl Display for Hotspot {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "            Label: {}", self.cluster_label.value())?;
        writeln!(f, "       Geocluster: {}", self.geocluster.value())?;
        writeln!(f, "             Type: {}", self.dominant_type)?;
        writeln!(f, "         Severity: {}", self.dominant_severity)?;
        writeln!(
            f,
            "         Centroid: {:.6},{:.6}",
            self.centroid_lat, self.centroid_lon
        )?;
        writeln!(f, "      Radius (km): {:.3}", self.estimated_radius_km)?;
        writeln!(f, "            Count: {}", self.point_count)?;
        writeln!(f, "    Last Activity: {}", self.last_activity_timestamp)
    }
}

/// Make a label like RISCO_DESLIZAMENTO presentable, "Risco Deslizamento".
pub(crate) fn title_case(label: &str) -> String {
    let mut title = String::with_capacity(label.len());
    let mut start_of_word = true;

    for c in label.chars() {
        let c = if c == '_' { ' ' } else { c };

        if c.is_alphabetic() {
            if start_of_word {
                title.extend(c.to_uppercase());
            } else {
                title.extend(c.to_lowercase());
            }
            start_of_word = false;
        } else {
            title.push(c);
            start_of_word = true;
        }
    }

    title
}

/// The public one line description of a hotspot.
pub(crate) fn summary(incident_type: &str, severity: &str, count: usize) -> String {
    format!(
        "Hotspot de {} com severidade {}. {} alertas.",
        title_case(incident_type),
        severity,
        count
    )
}
