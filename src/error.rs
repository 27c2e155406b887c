use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Result type used throughout the library.
pub type HotspotResult<T> = Result<T, HotspotError>;

/// Everything that can go wrong while looking for hotspots.
#[derive(Debug, Clone, PartialEq)]
pub enum HotspotError {
    /// The batch or the configuration is malformed. Nothing was computed.
    InvalidInput {
        /// Position of the offending alert in the batch, if an alert is to blame.
        index: Option<usize>,
        /// Id of the offending alert, if it had one.
        alert_id: Option<i64>,
        reason: String,
    },
    /// Something went wrong in the numerics that validation should have caught.
    ComputationFailure {
        alert_id: Option<i64>,
        detail: String,
    },
}

impl HotspotError {
    pub(crate) fn invalid_alert(index: usize, alert_id: Option<i64>, reason: String) -> Self {
        HotspotError::InvalidInput {
            index: Some(index),
            alert_id,
            reason,
        }
    }

    pub(crate) fn invalid_config(reason: String) -> Self {
        HotspotError::InvalidInput {
            index: None,
            alert_id: None,
            reason,
        }
    }

    /// Was this caused by bad input rather than a failure in the engine itself?
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, HotspotError::InvalidInput { .. })
    }
}

impl Display for HotspotError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            HotspotError::InvalidInput {
                index,
                alert_id,
                reason,
            } => {
                write!(f, "invalid input")?;
                if let Some(index) = index {
                    write!(f, " at position {}", index)?;
                }
                if let Some(alert_id) = alert_id {
                    write!(f, " (alert {})", alert_id)?;
                }
                write!(f, ": {}", reason)
            }
            HotspotError::ComputationFailure { alert_id, detail } => {
                write!(f, "computation failure")?;
                if let Some(alert_id) = alert_id {
                    write!(f, " (alert {})", alert_id)?;
                }
                write!(f, ": {}", detail)
            }
        }
    }
}

impl Error for HotspotError {}

/// A point the density clusterer could not measure distances to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterError {
    /// Index of the point in the slice handed to the clusterer.
    pub index: usize,
    pub msg: &'static str,
}

impl Display for ClusterError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "point {}: {}", self.index, self.msg)
    }
}

impl Error for ClusterError {}
