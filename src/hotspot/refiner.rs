use super::{
    hotspot::{summary, Hotspot, HotspotLabel},
    rules::{promotion, Promotion, SeverityOutcome},
};
use crate::{
    alert::Alert,
    cluster::GeoClusterId,
    distribution::Distribution,
    error::{HotspotError, HotspotResult},
    geo::{great_circle_distance, Coord, EARTH_RADIUS_KM},
    timestamp::{format_timestamp, last_activity},
};
use chrono::{DateTime, Utc};
use crossbeam_channel::unbounded;
use log::{debug, warn};
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;

/// Parameters for turning geoclusters into hotspots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineParams {
    /// Minimum size of a geocluster, and of a single type within it, to be considered.
    pub min_alerts_for_hotspot: usize,
    /// Fraction a severity needs within a group to be predominant.
    pub severity_dominance_threshold: f64,
    /// Fraction of ALTA reports that makes a MEDIA dominated group a hotspot anyway.
    pub high_severity_in_medium_threshold: f64,
    /// Radius reported for a hotspot with a single member.
    pub default_single_point_radius_km: f64,
    /// Radius of the sphere distances are measured on.
    pub earth_radius_km: f64,
    /// Threads used to evaluate candidates. 1 keeps everything on the calling thread and 0 means
    /// one per CPU.
    pub worker_threads: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        RefineParams {
            min_alerts_for_hotspot: 3,
            severity_dominance_threshold: 0.50,
            high_severity_in_medium_threshold: 0.25,
            default_single_point_radius_km: 0.05,
            earth_radius_km: EARTH_RADIUS_KM,
            worker_threads: 1,
        }
    }
}

impl RefineParams {
    pub fn validate(&self) -> HotspotResult<()> {
        let fractions = [
            (
                "severity_dominance_threshold",
                self.severity_dominance_threshold,
            ),
            (
                "high_severity_in_medium_threshold",
                self.high_severity_in_medium_threshold,
            ),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(HotspotError::invalid_config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if self.min_alerts_for_hotspot == 0 {
            return Err(HotspotError::invalid_config(
                "min_alerts_for_hotspot must be at least 1".to_owned(),
            ));
        }

        if !(self.default_single_point_radius_km.is_finite()
            && self.default_single_point_radius_km >= 0.0)
        {
            return Err(HotspotError::invalid_config(format!(
                "default_single_point_radius_km must not be negative, got {}",
                self.default_single_point_radius_km
            )));
        }

        if !(self.earth_radius_km.is_finite() && self.earth_radius_km > 0.0) {
            return Err(HotspotError::invalid_config(format!(
                "earth_radius_km must be a positive number, got {}",
                self.earth_radius_km
            )));
        }

        Ok(())
    }
}

/// The reports of one incident type within one geocluster.
#[derive(Debug)]
struct Candidate<'a> {
    geocluster: GeoClusterId,
    incident_type: &'a str,
    /// Indexes into the alert slice, in input order.
    members: Vec<usize>,
}

/**
 * Splits geoclusters by incident type and decides which of the pieces are hotspots.
 *
 * Geoclusters are visited in ascending id order, and the types within a geocluster in the order
 * they first appear in the input. Hotspots are numbered from 1 in that order.
 */
#[derive(Debug, Clone)]
pub struct HotspotRefiner {
    params: RefineParams,
}

impl HotspotRefiner {
    pub fn new(params: RefineParams) -> HotspotResult<Self> {
        params.validate()?;
        Ok(HotspotRefiner { params })
    }

    pub fn params(&self) -> &RefineParams {
        &self.params
    }

    /**
     * Find the hotspots.
     *
     * #Arguments
     * * alerts - the validated reports.
     * * labels - the geocluster of each report, same order and length as `alerts`.
     */
    pub fn refine(&self, alerts: &[Alert], labels: &[GeoClusterId]) -> HotspotResult<Vec<Hotspot>> {
        if alerts.len() != labels.len() {
            return Err(HotspotError::ComputationFailure {
                alert_id: None,
                detail: format!(
                    "{} alerts but {} geocluster labels",
                    alerts.len(),
                    labels.len()
                ),
            });
        }

        let candidates = self.candidates(alerts, labels);
        debug!("{} hotspot candidates", candidates.len());

        let now = Utc::now();
        let threads = match self.params.worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
        .min(candidates.len());

        let results = if threads <= 1 {
            candidates
                .iter()
                .map(|cand| self.evaluate(alerts, cand, now))
                .collect::<HotspotResult<Vec<_>>>()?
        } else {
            self.evaluate_parallel(alerts, &candidates, now, threads)?
        };

        let hotspots = results
            .into_iter()
            .flatten()
            .zip(1..)
            .map(|(mut hotspot, label): (Hotspot, u32)| {
                hotspot.cluster_label = HotspotLabel::new(label);
                hotspot
            })
            .collect();

        Ok(hotspots)
    }

    /// Group the reports, dropping noise and anything too small to ever be a hotspot.
    fn candidates<'a>(&self, alerts: &'a [Alert], labels: &[GeoClusterId]) -> Vec<Candidate<'a>> {
        let min_alerts = self.params.min_alerts_for_hotspot;

        let mut geoclusters: HashMap<GeoClusterId, Vec<usize>> = HashMap::default();
        for (index, &label) in labels.iter().enumerate() {
            if !label.is_noise() {
                geoclusters.entry(label).or_default().push(index);
            }
        }

        let mut ids: Vec<GeoClusterId> = geoclusters.keys().copied().collect();
        ids.sort_unstable();

        let mut candidates = vec![];
        for id in ids {
            let members = &geoclusters[&id];
            if members.len() < min_alerts {
                debug!("{} skipped, only {} alerts", id, members.len());
                continue;
            }

            let mut by_type: Vec<Candidate<'a>> = vec![];
            for &index in members {
                let itype = alerts[index].incident_type.as_str();
                match by_type.iter_mut().find(|cand| cand.incident_type == itype) {
                    Some(cand) => cand.members.push(index),
                    None => by_type.push(Candidate {
                        geocluster: id,
                        incident_type: itype,
                        members: vec![index],
                    }),
                }
            }

            candidates.extend(
                by_type
                    .into_iter()
                    .filter(|cand| cand.members.len() >= min_alerts),
            );
        }

        candidates
    }

    fn evaluate_parallel(
        &self,
        alerts: &[Alert],
        candidates: &[Candidate],
        now: DateTime<Utc>,
        threads: usize,
    ) -> HotspotResult<Vec<Option<Hotspot>>> {
        let (to_workers, from_main) = unbounded();
        let (to_main, from_workers) = unbounded();

        for job in candidates.iter().enumerate() {
            // The receiver is still in scope, this cannot fail.
            let _ = to_workers.send(job);
        }
        drop(to_workers);

        std::thread::scope(|scope| -> HotspotResult<()> {
            for _ in 0..threads {
                let from_main = from_main.clone();
                let to_main = to_main.clone();

                std::thread::Builder::new()
                    .name("hotspot-refine".to_owned())
                    .spawn_scoped(scope, move || {
                        for (idx, cand) in from_main {
                            if to_main.send((idx, self.evaluate(alerts, cand, now))).is_err() {
                                break;
                            }
                        }
                    })
                    .map_err(|err| HotspotError::ComputationFailure {
                        alert_id: None,
                        detail: format!("unable to start refinement thread: {}", err),
                    })?;
            }

            Ok(())
        })?;
        drop(to_main);

        let mut results: Vec<Option<HotspotResult<Option<Hotspot>>>> =
            (0..candidates.len()).map(|_| None).collect();
        for (idx, res) in from_workers {
            results[idx] = Some(res);
        }

        results
            .into_iter()
            .map(|res| {
                res.unwrap_or_else(|| {
                    Err(HotspotError::ComputationFailure {
                        alert_id: None,
                        detail: "a refinement thread quit early".to_owned(),
                    })
                })
            })
            .collect()
    }

    /// Apply the promotion rules to a candidate and build the hotspot if it passes.
    ///
    /// The label of the returned hotspot is a placeholder, labels are handed out once every
    /// candidate has been evaluated.
    fn evaluate(
        &self,
        alerts: &[Alert],
        cand: &Candidate,
        now: DateTime<Utc>,
    ) -> HotspotResult<Option<Hotspot>> {
        let members: Vec<&Alert> = cand.members.iter().map(|&i| &alerts[i]).collect();

        let severities = Distribution::new(members.iter().map(|a| a.severity.as_str()));
        let outcome = SeverityOutcome::classify(
            &severities,
            self.params.severity_dominance_threshold,
            self.params.high_severity_in_medium_threshold,
        );

        let severity = match promotion(cand.incident_type, outcome) {
            Promotion::Promote { severity } => severity,
            Promotion::Reject => {
                debug!(
                    "{} {} with {} alerts rejected: {:?}",
                    cand.geocluster,
                    cand.incident_type,
                    members.len(),
                    outcome
                );
                return Ok(None);
            }
        };

        let (centroid, radius) = self.geometry(&members)?;

        let mut alert_ids: Vec<i64> = members.iter().map(|a| a.id).collect();
        alert_ids.sort_unstable();

        let activity = last_activity(members.iter().map(|a| a.timestamp.as_deref()), || now);
        if activity.fallback {
            warn!(
                "{} {}: no usable timestamps, reporting the current time",
                cand.geocluster, cand.incident_type
            );
        }

        let severity = severity.to_string();
        let public_summary = summary(cand.incident_type, &severity, members.len());

        let mut type_distribution = BTreeMap::new();
        type_distribution.insert(cand.incident_type.to_owned(), members.len());

        let severity_distribution: BTreeMap<String, usize> = severities
            .shares()
            .iter()
            .map(|share| (share.label.to_owned(), share.count))
            .collect();

        debug!(
            "{} {} with {} alerts promoted as {}",
            cand.geocluster,
            cand.incident_type,
            members.len(),
            severity
        );

        Ok(Some(Hotspot {
            cluster_label: HotspotLabel::new(1),
            geocluster: cand.geocluster,
            centroid_lat: centroid.lat,
            centroid_lon: centroid.lon,
            point_count: members.len(),
            dominant_type: cand.incident_type.to_owned(),
            dominant_severity: severity,
            alert_ids_in_cluster: alert_ids,
            estimated_radius_km: radius,
            public_summary,
            last_activity_timestamp: format_timestamp(&activity.time),
            type_distribution,
            severity_distribution,
        }))
    }

    /// Centroid and radius of a group of reports.
    fn geometry(&self, members: &[&Alert]) -> HotspotResult<(Coord, f64)> {
        debug_assert!(!members.is_empty());

        let count = members.len() as f64;
        let centroid = Coord {
            lat: members.iter().map(|a| a.coord.lat).sum::<f64>() / count,
            lon: members.iter().map(|a| a.coord.lon).sum::<f64>() / count,
        };

        if !(centroid.lat.is_finite() && centroid.lon.is_finite()) {
            return Err(HotspotError::ComputationFailure {
                alert_id: members.first().map(|a| a.id),
                detail: format!("non-finite centroid {}", centroid),
            });
        }

        if members.len() == 1 {
            return Ok((centroid, self.params.default_single_point_radius_km));
        }

        let mut radius = 0.0f64;
        for member in members {
            let dist = great_circle_distance(centroid, member.coord, self.params.earth_radius_km);
            if !dist.is_finite() {
                return Err(HotspotError::ComputationFailure {
                    alert_id: Some(member.id),
                    detail: "non-finite distance from the hotspot centroid".to_owned(),
                });
            }
            radius = radius.max(dist);
        }

        Ok((centroid, radius))
    }
}
