/*!
 * Putting it all together.
 *
 * Validate the batch, cluster it, then refine the clusters into hotspots. Each step only starts
 * once the one before it has finished with the whole batch.
 */
use crate::{
    alert::{validate_batch, Alert, RawAlert},
    cluster::{ClusterParams, DensityClusterer, GeoClusterId},
    error::{HotspotError, HotspotResult},
    hotspot::{Hotspot, HotspotRefiner, RefineParams},
};
use log::info;
use serde::Serialize;

/// All the knobs, with the documented defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub clustering: ClusterParams,
    pub refinement: RefineParams,
}

/// The geocluster a single report landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    pub alert_id: i64,
    pub cluster_label: GeoClusterId,
}

/// Everything one run of the engine produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringOutcome {
    /// One entry per input report, in input order.
    pub clustering_results: Vec<ClusterAssignment>,
    pub hotspot_summaries: Vec<Hotspot>,
}

/**
 * Finds hotspots in batches of classified incident reports.
 *
 * The engine holds nothing but its configuration, so one engine can serve any number of threads,
 * each with its own batch.
 */
#[derive(Debug, Clone)]
pub struct HotspotEngine {
    clusterer: DensityClusterer,
    refiner: HotspotRefiner,
}

static_assertions::assert_impl_all!(HotspotEngine: Send, Sync);

impl HotspotEngine {
    /// Check the configuration and build an engine.
    pub fn new(config: EngineConfig) -> HotspotResult<Self> {
        let clusterer = DensityClusterer::new(config.clustering)?;
        let refiner = HotspotRefiner::new(config.refinement)?;

        Ok(HotspotEngine { clusterer, refiner })
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            clustering: *self.clusterer.params(),
            refinement: *self.refiner.params(),
        }
    }

    /// Validate a batch as received and run it.
    pub fn run(&self, raw: &[RawAlert]) -> HotspotResult<ClusteringOutcome> {
        let alerts = validate_batch(raw)?;
        self.run_validated(&alerts)
    }

    /**
     * Run a batch of already built reports.
     *
     * Coordinates are still checked before anything else happens, an [Alert] can be built by hand
     * without going through validation.
     */
    pub fn run_validated(&self, alerts: &[Alert]) -> HotspotResult<ClusteringOutcome> {
        if alerts.is_empty() {
            return Ok(ClusteringOutcome::default());
        }

        if let Some((index, alert)) = alerts
            .iter()
            .enumerate()
            .find(|(_, alert)| !alert.coord.is_valid())
        {
            return Err(HotspotError::invalid_alert(
                index,
                Some(alert.id),
                format!("coordinates not finite: {}", alert.coord),
            ));
        }

        let labels = self
            .clusterer
            .cluster(alerts)
            .map_err(|err| HotspotError::ComputationFailure {
                alert_id: alerts.get(err.index).map(|a| a.id),
                detail: err.to_string(),
            })?;

        let clustering_results = alerts
            .iter()
            .zip(&labels)
            .map(|(alert, &cluster_label)| ClusterAssignment {
                alert_id: alert.id,
                cluster_label,
            })
            .collect();

        let hotspot_summaries = self.refiner.refine(alerts, &labels)?;

        info!(
            "{} alerts, {} noise, {} hotspots",
            alerts.len(),
            labels.iter().filter(|l| l.is_noise()).count(),
            hotspot_summaries.len()
        );

        Ok(ClusteringOutcome {
            clustering_results,
            hotspot_summaries,
        })
    }
}

/// Run a batch with a one-off engine.
pub fn find_hotspots(raw: &[RawAlert], config: EngineConfig) -> HotspotResult<ClusteringOutcome> {
    HotspotEngine::new(config)?.run(raw)
}
