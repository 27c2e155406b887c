/*!
 * Turning geoclusters into hotspots.
 *
 * A geocluster can mix unrelated incidents that happen to be close together, so each one is split
 * by incident type first. Every piece is then judged on its own severity distribution by the
 * table in [rules].
 */

pub use hotspot::{Hotspot, HotspotLabel};
pub use refiner::{HotspotRefiner, RefineParams};
pub use rules::{
    promotion, IncidentType, Promotion, PromotionRule, Severity, SeverityOutcome, TypeCategory,
    PROMOTION_RULES,
};

#[allow(clippy::module_inception)]
mod hotspot;
mod refiner;
pub mod rules;
