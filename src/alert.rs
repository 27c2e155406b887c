/*!
 * The incident reports fed into the engine.
 *
 * A report arrives as a [RawAlert], straight off the wire with every field optional. Before any
 * work is done the whole batch is checked and turned into [Alert]s, so a single bad report fails
 * the batch up front instead of halfway through.
 */
use crate::{
    error::{HotspotError, HotspotResult},
    geo::{Coord, Geo},
};
use serde::{Deserialize, Serialize};

/// An incident report as received, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    #[serde(rename = "alertId", default)]
    pub alert_id: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "severityIA", default)]
    pub severity: Option<String>,
    #[serde(rename = "typeIA", default)]
    pub incident_type: Option<String>,
    #[serde(rename = "timestampReporte", default)]
    pub timestamp: Option<String>,
}

/// A classified incident report that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Assigned by the caller. Not required to be unique.
    pub id: i64,
    pub coord: Coord,
    /// Severity label from the classifier, e.g. CRITICA, ALTA, MEDIA or BAIXA.
    pub severity: String,
    /// Incident type label from the classifier, e.g. ALAGAMENTO. Open vocabulary.
    pub incident_type: String,
    /// Time of the report, only used to report the last activity of a hotspot.
    pub timestamp: Option<String>,
}

impl Alert {
    pub fn new(
        id: i64,
        lat: f64,
        lon: f64,
        severity: impl Into<String>,
        incident_type: impl Into<String>,
    ) -> Self {
        Alert {
            id,
            coord: Coord { lat, lon },
            severity: severity.into(),
            incident_type: incident_type.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Check a raw report.
    ///
    /// `index` is the position of the report in its batch, used in the error message.
    pub fn from_raw(index: usize, raw: &RawAlert) -> HotspotResult<Self> {
        let alert_id = raw.alert_id;
        let missing = |field: &str| {
            HotspotError::invalid_alert(index, alert_id, format!("missing required field {}", field))
        };

        let id = raw.alert_id.ok_or_else(|| missing("alertId"))?;
        let lat = raw.latitude.ok_or_else(|| missing("latitude"))?;
        let lon = raw.longitude.ok_or_else(|| missing("longitude"))?;
        let severity = required_label(raw.severity.as_deref()).ok_or_else(|| missing("severityIA"))?;
        let incident_type =
            required_label(raw.incident_type.as_deref()).ok_or_else(|| missing("typeIA"))?;

        let coord = Coord { lat, lon };
        if !coord.is_valid() {
            return Err(HotspotError::invalid_alert(
                index,
                alert_id,
                format!("coordinates not finite: {}", coord),
            ));
        }

        Ok(Alert {
            id,
            coord,
            severity: severity.to_owned(),
            incident_type: incident_type.to_owned(),
            timestamp: raw.timestamp.clone(),
        })
    }
}

/// A label counts as missing when it is blank, otherwise it is kept exactly as sent.
fn required_label(label: Option<&str>) -> Option<&str> {
    label.filter(|l| !l.trim().is_empty())
}

impl Geo for Alert {
    fn centroid(&self) -> Coord {
        self.coord
    }
}

/// Check a whole batch, failing on the first bad report.
pub fn validate_batch(raw: &[RawAlert]) -> HotspotResult<Vec<Alert>> {
    raw.iter()
        .enumerate()
        .map(|(index, alert)| Alert::from_raw(index, alert))
        .collect()
}

/// A batch of reports as it arrives, either a bare list or wrapped in an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AlertBatch {
    Wrapped {
        #[serde(rename = "alertsToCluster")]
        alerts: Vec<RawAlert>,
    },
    Bare(Vec<RawAlert>),
}

impl AlertBatch {
    pub fn into_alerts(self) -> Vec<RawAlert> {
        match self {
            AlertBatch::Wrapped { alerts } => alerts,
            AlertBatch::Bare(alerts) => alerts,
        }
    }
}
