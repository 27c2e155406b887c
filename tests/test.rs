use redalert::{
    find_hotspots, Alert, AlertBatch, ClusterParams, ClusteringOutcome, EngineConfig,
    GeoClusterId, HotspotEngine, HotspotError, NeighborSearch, RawAlert, RefineParams,
    EARTH_RADIUS_KM,
};
use std::collections::HashMap;

/*-------------------------------------------------------------------------------------------------
 *
 *                                          Helpers
 *
 *-----------------------------------------------------------------------------------------------*/
const BASE_LAT: f64 = -23.5505;
const BASE_LON: f64 = -46.6333;

/// A point the given number of meters north and east of the base point.
fn offset(north_m: f64, east_m: f64) -> (f64, f64) {
    let dlat = (north_m / 1000.0 / EARTH_RADIUS_KM).to_degrees();
    let dlon = (east_m / 1000.0 / EARTH_RADIUS_KM).to_degrees() / BASE_LAT.to_radians().cos();
    (BASE_LAT + dlat, BASE_LON + dlon)
}

fn raw(id: i64, (lat, lon): (f64, f64), sev: &str, itype: &str) -> RawAlert {
    RawAlert {
        alert_id: Some(id),
        latitude: Some(lat),
        longitude: Some(lon),
        severity: Some(sev.to_owned()),
        incident_type: Some(itype.to_owned()),
        timestamp: None,
    }
}

/// Corners of a 100 meter square, every corner within 150 meters of the others.
fn square() -> [(f64, f64); 4] {
    [
        offset(0.0, 0.0),
        offset(100.0, 0.0),
        offset(0.0, 100.0),
        offset(100.0, 100.0),
    ]
}

fn run(batch: &[RawAlert]) -> ClusteringOutcome {
    find_hotspots(batch, EngineConfig::default()).unwrap()
}

/// Deterministic pseudo random numbers in [0, 1).
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// A few dense neighborhoods with mixed types and severities plus scattered stragglers.
fn busy_batch() -> Vec<RawAlert> {
    const TYPES: [&str; 5] = [
        "ALAGAMENTO",
        "RISCO_DESLIZAMENTO",
        "DESLIZAMENTO_OCORRIDO",
        "OUTRO_PERIGO",
        "QUEDA_DE_ARVORE",
    ];
    const SEVERITIES: [&str; 4] = ["CRITICA", "ALTA", "MEDIA", "BAIXA"];

    let mut rng = XorShift(0x2545_f491_4f6c_dd1d);
    let centers = [(0.0, 0.0), (3000.0, 500.0), (-2500.0, 4000.0), (800.0, -6000.0)];

    let mut batch = Vec::new();
    for i in 0..320 {
        let point = if i % 8 == 7 {
            offset(rng.next() * 40_000.0 - 20_000.0, rng.next() * 40_000.0 - 20_000.0)
        } else {
            let (n, e) = centers[i % centers.len()];
            offset(n + rng.next() * 300.0, e + rng.next() * 300.0)
        };

        // Lean towards the first entries so plenty of groups get promoted.
        let itype = TYPES[((rng.next() * rng.next()) * TYPES.len() as f64) as usize];
        let sev = SEVERITIES[((rng.next() * rng.next()) * SEVERITIES.len() as f64) as usize];

        let mut alert = raw(1000 + i as i64, point, sev, itype);
        alert.timestamp = Some(format!("2024-06-{:02}T{:02}:15:00Z", 1 + i % 28, i % 24));
        batch.push(alert);
    }

    batch
}

/*-------------------------------------------------------------------------------------------------
 *
 *                                          Scenarios
 *
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_critical_flood_is_promoted() {
    let sevs = ["CRITICA", "CRITICA", "ALTA", "CRITICA"];
    let batch: Vec<RawAlert> = square()
        .iter()
        .zip(sevs)
        .enumerate()
        .map(|(i, (&pt, sev))| raw(i as i64 + 1, pt, sev, "ALAGAMENTO"))
        .collect();

    let outcome = run(&batch);

    assert!(outcome
        .clustering_results
        .iter()
        .all(|a| a.cluster_label == outcome.clustering_results[0].cluster_label));
    assert!(!outcome.clustering_results[0].cluster_label.is_noise());

    assert_eq!(outcome.hotspot_summaries.len(), 1);
    let hs = &outcome.hotspot_summaries[0];
    assert_eq!(hs.cluster_label.value(), 1);
    assert_eq!(hs.dominant_type, "ALAGAMENTO");
    assert_eq!(hs.dominant_severity, "CRITICA");
    assert_eq!(hs.point_count, 4);
    assert_eq!(hs.alert_ids_in_cluster, vec![1, 2, 3, 4]);
    assert_eq!(hs.severity_distribution["CRITICA"], 3);
    assert_eq!(hs.severity_distribution["ALTA"], 1);
    assert_eq!(hs.type_distribution["ALAGAMENTO"], 4);

    // The centroid sits in the middle of the square, about 71 meters from each corner.
    assert!(
        hs.estimated_radius_km > 0.065 && hs.estimated_radius_km < 0.076,
        "{}",
        hs.estimated_radius_km
    );
    assert_eq!(
        hs.public_summary,
        "Hotspot de Alagamento com severidade CRITICA. 4 alertas."
    );
}

#[test]
fn test_medium_with_high_minority_reports_medium() {
    let sevs = ["MEDIA", "MEDIA", "ALTA", "ALTA"];
    let batch: Vec<RawAlert> = square()
        .iter()
        .zip(sevs)
        .enumerate()
        .map(|(i, (&pt, sev))| raw(i as i64 + 1, pt, sev, "ALAGAMENTO"))
        .collect();

    let outcome = run(&batch);

    assert_eq!(outcome.hotspot_summaries.len(), 1);
    assert_eq!(outcome.hotspot_summaries[0].dominant_severity, "MEDIA");
    assert_eq!(outcome.hotspot_summaries[0].point_count, 4);
}

#[test]
fn test_isolated_points_are_noise() {
    let batch = vec![
        raw(1, offset(0.0, 0.0), "CRITICA", "ALAGAMENTO"),
        raw(2, offset(0.0, 1200.0), "CRITICA", "ALAGAMENTO"),
        raw(3, offset(0.0, 2400.0), "CRITICA", "ALAGAMENTO"),
    ];

    let outcome = run(&batch);

    assert_eq!(outcome.clustering_results.len(), 3);
    assert!(outcome
        .clustering_results
        .iter()
        .all(|a| a.cluster_label == GeoClusterId::NOISE));
    assert!(outcome.hotspot_summaries.is_empty());
}

#[test]
fn test_other_hazard_needs_critical() {
    let sevs = ["ALTA", "BAIXA", "ALTA", "BAIXA", "ALTA"];
    let batch: Vec<RawAlert> = sevs
        .iter()
        .enumerate()
        .map(|(i, sev)| raw(i as i64 + 1, offset(0.0, 0.0), sev, "OUTRO_PERIGO"))
        .collect();

    let outcome = run(&batch);

    assert!(outcome
        .clustering_results
        .iter()
        .all(|a| a.cluster_label.value() == 0));
    assert!(outcome.hotspot_summaries.is_empty());
}

#[test]
fn test_mixed_types_in_one_geocluster() {
    let mut batch = Vec::new();
    for (i, &pt) in square().iter().enumerate() {
        batch.push(raw(10 + i as i64, pt, "ALTA", "RISCO_DESLIZAMENTO"));
        batch.push(raw(20 + i as i64, pt, "CRITICA", "ALAGAMENTO"));
    }
    // Not enough of these to count.
    batch.push(raw(30, offset(50.0, 50.0), "CRITICA", "OUTRO_PERIGO"));
    batch.push(raw(31, offset(50.0, 50.0), "CRITICA", "OUTRO_PERIGO"));

    let outcome = run(&batch);

    assert_eq!(outcome.hotspot_summaries.len(), 2);

    let first = &outcome.hotspot_summaries[0];
    assert_eq!(first.cluster_label.value(), 1);
    assert_eq!(first.dominant_type, "RISCO_DESLIZAMENTO");
    assert_eq!(first.dominant_severity, "ALTA");
    assert_eq!(first.alert_ids_in_cluster, vec![10, 11, 12, 13]);

    let second = &outcome.hotspot_summaries[1];
    assert_eq!(second.cluster_label.value(), 2);
    assert_eq!(second.dominant_type, "ALAGAMENTO");
    assert_eq!(second.alert_ids_in_cluster, vec![20, 21, 22, 23]);

    assert_eq!(first.geocluster, second.geocluster);
}

/*-------------------------------------------------------------------------------------------------
 *
 *                                      Batch properties
 *
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_empty_batch() {
    let outcome = run(&[]);
    assert!(outcome.clustering_results.is_empty());
    assert!(outcome.hotspot_summaries.is_empty());
}

#[test]
fn test_one_assignment_per_alert() {
    let mut batch: Vec<RawAlert> = square()
        .iter()
        .map(|&pt| raw(5, pt, "CRITICA", "ALAGAMENTO"))
        .collect();
    batch.push(raw(5, offset(5000.0, 0.0), "BAIXA", "ALAGAMENTO"));
    batch.push(raw(6, offset(0.0, 0.0), "CRITICA", "ALAGAMENTO"));

    let outcome = run(&batch);

    let ids: Vec<i64> = outcome
        .clustering_results
        .iter()
        .map(|a| a.alert_id)
        .collect();
    assert_eq!(ids, vec![5, 5, 5, 5, 5, 6]);

    // Duplicated ids stay duplicated.
    assert_eq!(outcome.hotspot_summaries.len(), 1);
    assert_eq!(
        outcome.hotspot_summaries[0].alert_ids_in_cluster,
        vec![5, 5, 5, 5, 6]
    );
}

#[test]
fn test_hotspot_invariants() {
    let batch = busy_batch();
    let config = EngineConfig::default();
    let outcome = find_hotspots(&batch, config).unwrap();

    assert_eq!(outcome.clustering_results.len(), batch.len());
    assert!(!outcome.hotspot_summaries.is_empty());

    let label_of: HashMap<i64, GeoClusterId> = outcome
        .clustering_results
        .iter()
        .map(|a| (a.alert_id, a.cluster_label))
        .collect();
    let type_of: HashMap<i64, &str> = batch
        .iter()
        .map(|a| (a.alert_id.unwrap(), a.incident_type.as_deref().unwrap()))
        .collect();

    for (i, hs) in outcome.hotspot_summaries.iter().enumerate() {
        assert_eq!(hs.cluster_label.value() as usize, i + 1);
        assert_eq!(hs.point_count, hs.alert_ids_in_cluster.len());
        assert!(hs.point_count >= config.refinement.min_alerts_for_hotspot);
        assert!(hs
            .alert_ids_in_cluster
            .windows(2)
            .all(|pair| pair[0] < pair[1]));
        assert!(hs.estimated_radius_km >= 0.0);

        for id in &hs.alert_ids_in_cluster {
            let label = label_of[id];
            assert!(!label.is_noise());
            assert_eq!(label, hs.geocluster);
            assert_eq!(type_of[id], hs.dominant_type);
        }
    }
}

#[test]
fn test_runs_are_repeatable() {
    let batch = busy_batch();
    let engine = HotspotEngine::new(EngineConfig::default()).unwrap();

    let first = engine.run(&batch).unwrap();
    let second = engine.run(&batch).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_worker_threads_do_not_change_results() {
    let batch = busy_batch();

    let sequential = run(&batch);
    for threads in [0, 2, 5] {
        let config = EngineConfig {
            refinement: RefineParams {
                worker_threads: threads,
                ..RefineParams::default()
            },
            ..EngineConfig::default()
        };
        assert_eq!(find_hotspots(&batch, config).unwrap(), sequential);
    }
}

#[test]
fn test_brute_force_matches_index() {
    let batch = busy_batch();

    let config = EngineConfig {
        clustering: ClusterParams {
            search: NeighborSearch::BruteForce,
            ..ClusterParams::default()
        },
        ..EngineConfig::default()
    };

    assert_eq!(find_hotspots(&batch, config).unwrap(), run(&batch));
}

#[test]
fn test_last_activity_is_latest_report() {
    let stamps = [
        "2024-05-10T14:30:00Z",
        "2024-05-10 09:00:00",
        "2024-05-10T16:45:00-03:00",
        "not a time",
    ];
    let batch: Vec<RawAlert> = square()
        .iter()
        .zip(stamps)
        .enumerate()
        .map(|(i, (&pt, stamp))| RawAlert {
            timestamp: Some(stamp.to_owned()),
            ..raw(i as i64, pt, "CRITICA", "DESLIZAMENTO_OCORRIDO")
        })
        .collect();

    let outcome = run(&batch);
    assert_eq!(
        outcome.hotspot_summaries[0].last_activity_timestamp,
        "2024-05-10T19:45:00Z"
    );
}

/*-------------------------------------------------------------------------------------------------
 *
 *                                   Configuration and errors
 *
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_config_per_call() {
    let batch = vec![
        raw(1, offset(0.0, 0.0), "CRITICA", "ALAGAMENTO"),
        raw(2, offset(0.0, 1200.0), "CRITICA", "ALAGAMENTO"),
        raw(3, offset(0.0, 2400.0), "CRITICA", "ALAGAMENTO"),
    ];

    let wide = EngineConfig {
        clustering: ClusterParams {
            eps_km: 2.0,
            min_samples: 3,
            ..ClusterParams::default()
        },
        ..EngineConfig::default()
    };

    let outcome = find_hotspots(&batch, wide).unwrap();
    assert!(outcome
        .clustering_results
        .iter()
        .all(|a| a.cluster_label.value() == 0));
    assert_eq!(outcome.hotspot_summaries.len(), 1);
    assert_eq!(outcome.hotspot_summaries[0].point_count, 3);

    let strict = EngineConfig {
        refinement: RefineParams {
            min_alerts_for_hotspot: 4,
            ..RefineParams::default()
        },
        ..wide
    };
    assert!(find_hotspots(&batch, strict)
        .unwrap()
        .hotspot_summaries
        .is_empty());

    // The defaults are untouched by the calls above.
    assert!(run(&batch).hotspot_summaries.is_empty());
}

#[test]
fn test_invalid_batch() {
    let mut batch: Vec<RawAlert> = square()
        .iter()
        .enumerate()
        .map(|(i, &pt)| raw(i as i64, pt, "CRITICA", "ALAGAMENTO"))
        .collect();
    batch[2].latitude = None;

    match find_hotspots(&batch, EngineConfig::default()) {
        Err(HotspotError::InvalidInput {
            index, alert_id, ..
        }) => {
            assert_eq!(index, Some(2));
            assert_eq!(alert_id, Some(2));
        }
        other => panic!("expected invalid input, got {:?}", other),
    }

    batch[2].latitude = Some(f64::NAN);
    assert!(find_hotspots(&batch, EngineConfig::default())
        .unwrap_err()
        .is_invalid_input());
}

#[test]
fn test_out_of_range_coordinates_are_points() {
    let batch: Vec<RawAlert> = (0..4)
        .map(|i| RawAlert {
            timestamp: Some("2024-02-01T08:00:00Z".to_owned()),
            ..raw(i, (10.0, 180.0005 + 0.0001 * i as f64), "CRITICA", "ALAGAMENTO")
        })
        .collect();

    let indexed = run(&batch);
    assert!(indexed
        .clustering_results
        .iter()
        .all(|a| a.cluster_label.value() == 0));
    assert_eq!(indexed.hotspot_summaries.len(), 1);
    assert_eq!(indexed.hotspot_summaries[0].point_count, 4);

    let brute = EngineConfig {
        clustering: ClusterParams {
            search: NeighborSearch::BruteForce,
            ..ClusterParams::default()
        },
        ..EngineConfig::default()
    };
    assert_eq!(find_hotspots(&batch, brute).unwrap(), indexed);
}

#[test]
fn test_invalid_config() {
    let config = EngineConfig {
        refinement: RefineParams {
            severity_dominance_threshold: 1.5,
            ..RefineParams::default()
        },
        ..EngineConfig::default()
    };
    assert!(HotspotEngine::new(config).unwrap_err().is_invalid_input());
}

#[test]
fn test_validated_alerts() {
    let alerts: Vec<Alert> = square()
        .iter()
        .enumerate()
        .map(|(i, &(lat, lon))| Alert::new(i as i64, lat, lon, "ALTA", "ALAGAMENTO"))
        .collect();

    let engine = HotspotEngine::new(EngineConfig::default()).unwrap();
    let outcome = engine.run_validated(&alerts).unwrap();
    assert_eq!(outcome.hotspot_summaries.len(), 1);
    assert_eq!(outcome.hotspot_summaries[0].dominant_severity, "ALTA");
}

/*-------------------------------------------------------------------------------------------------
 *
 *                                          Wire format
 *
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_json_in_json_out() {
    let mut alerts = Vec::new();
    for (i, (lat, lon)) in square().iter().enumerate() {
        alerts.push(serde_json::json!({
            "alertId": 100 + i,
            "latitude": lat,
            "longitude": lon,
            "severityIA": "CRITICA",
            "typeIA": "RISCO_DESLIZAMENTO",
            "timestampReporte": "2024-01-02T03:04:05Z",
        }));
    }
    let input = serde_json::json!({ "alertsToCluster": alerts }).to_string();

    let batch: AlertBatch = serde_json::from_str(&input).unwrap();
    let outcome = run(&batch.into_alerts());
    let json = serde_json::to_value(&outcome).unwrap();

    let results = json["clusteringResults"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["alertId"], 100);
    assert_eq!(results[0]["clusterLabel"], 0);

    let hs = &json["hotspotSummaries"][0];
    assert_eq!(hs["clusterLabel"], 1);
    assert_eq!(hs["dominantType"], "RISCO_DESLIZAMENTO");
    assert_eq!(hs["dominantSeverity"], "CRITICA");
    assert_eq!(hs["pointCount"], 4);
    assert_eq!(hs["alertIdsInCluster"], serde_json::json!([100, 101, 102, 103]));
    assert_eq!(hs["lastActivityTimestamp"], "2024-01-02T03:04:05Z");
    assert_eq!(
        hs["publicSummary"],
        "Hotspot de Risco Deslizamento com severidade CRITICA. 4 alertas."
    );
    assert!(hs["centroidLat"].as_f64().unwrap() < 0.0);
    assert!(hs["centroidLon"].as_f64().unwrap() < 0.0);
}
