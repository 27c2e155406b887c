//! The table deciding which groups of reports are hotspots.
use crate::distribution::Distribution;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The severity labels the classifier produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr, EnumIter)]
pub enum Severity {
    #[strum(serialize = "CRITICA")]
    Critical,
    #[strum(serialize = "ALTA")]
    High,
    #[strum(serialize = "MEDIA")]
    Medium,
    #[strum(serialize = "BAIXA")]
    Low,
}

/// The incident types the promotion rules know about.
///
/// The classifier may produce other labels, those never become hotspots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr, EnumIter)]
pub enum IncidentType {
    #[strum(serialize = "ALAGAMENTO")]
    Flooding,
    #[strum(serialize = "RISCO_DESLIZAMENTO")]
    LandslideRisk,
    #[strum(serialize = "DESLIZAMENTO_OCORRIDO")]
    Landslide,
    #[strum(serialize = "OUTRO_PERIGO")]
    OtherHazard,
}

/// Incident types sharing a row of the promotion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Floods and landslides.
    WaterAndEarth,
    /// Anything the classifier could not place.
    OtherHazard,
}

impl IncidentType {
    pub fn category(self) -> TypeCategory {
        use IncidentType::*;

        match self {
            Flooding | LandslideRisk | Landslide => TypeCategory::WaterAndEarth,
            OtherHazard => TypeCategory::OtherHazard,
        }
    }
}

/// What the severity distribution of a group says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityOutcome {
    /// One known severity makes up at least the dominance threshold.
    Dominant(Severity),
    /// MEDIA dominates but a large enough minority reported ALTA.
    MediumWithHighMinority,
    /// No label dominates, or the dominant label is not a known severity.
    Undetermined,
}

impl SeverityOutcome {
    /**
     * Classify a severity distribution.
     *
     * #Arguments
     * * severities - the distribution of severity labels in the group.
     * * dominance_threshold - fraction a label needs to be predominant.
     * * high_in_medium_threshold - fraction of ALTA that lifts a MEDIA group.
     */
    pub fn classify(
        severities: &Distribution,
        dominance_threshold: f64,
        high_in_medium_threshold: f64,
    ) -> Self {
        let dominant = severities
            .predominant(dominance_threshold)
            .and_then(|pred| pred.label.parse::<Severity>().ok());

        let high: &str = Severity::High.into();
        match dominant {
            Some(Severity::Medium) if severities.fraction(high) >= high_in_medium_threshold => {
                SeverityOutcome::MediumWithHighMinority
            }
            Some(severity) => SeverityOutcome::Dominant(severity),
            None => SeverityOutcome::Undetermined,
        }
    }
}

/// A row of the promotion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionRule {
    pub category: TypeCategory,
    pub outcome: SeverityOutcome,
    /// The severity reported for the hotspot.
    pub reported: Severity,
}

/// Every way a group can become a hotspot. A group matching no row is not a hotspot.
pub const PROMOTION_RULES: &[PromotionRule] = &[
    PromotionRule {
        category: TypeCategory::OtherHazard,
        outcome: SeverityOutcome::Dominant(Severity::Critical),
        reported: Severity::Critical,
    },
    PromotionRule {
        category: TypeCategory::WaterAndEarth,
        outcome: SeverityOutcome::Dominant(Severity::Critical),
        reported: Severity::Critical,
    },
    PromotionRule {
        category: TypeCategory::WaterAndEarth,
        outcome: SeverityOutcome::Dominant(Severity::High),
        reported: Severity::High,
    },
    PromotionRule {
        category: TypeCategory::WaterAndEarth,
        outcome: SeverityOutcome::MediumWithHighMinority,
        reported: Severity::Medium,
    },
];

/// The verdict for a group of reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Promote { severity: Severity },
    Reject,
}

/// Look up a group in the promotion table.
pub fn promotion(incident_type: &str, outcome: SeverityOutcome) -> Promotion {
    let category = match incident_type.parse::<IncidentType>() {
        Ok(itype) => itype.category(),
        Err(_) => return Promotion::Reject,
    };

    PROMOTION_RULES
        .iter()
        .find(|rule| rule.category == category && rule.outcome == outcome)
        .map(|rule| Promotion::Promote {
            severity: rule.reported,
        })
        .unwrap_or(Promotion::Reject)
}
