use mandi_core::MandiError;
use thiserror::Error;

/// Errors raised by the trade aggregate itself.
///
/// Orchestration failures (missing signatures, capability denials, branch
/// override problems) are built directly as [`MandiError`] values by the
/// engine; this enum covers only what the state machine can refuse.
#[derive(Debug, Error)]
pub enum TradeError {
    /// The requested edge is not in the transition table.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The trade is in a terminal status and accepts no further transitions.
    #[error("trade {trade_id} is terminal in status {status}")]
    Terminal { trade_id: String, status: String },

    /// A trade number string did not match the TR-YYYY-NNNNN shape.
    #[error("malformed trade number {value:?}")]
    MalformedNumber { value: String },
}

impl From<TradeError> for MandiError {
    fn from(err: TradeError) -> Self {
        match err {
            TradeError::InvalidTransition { .. } | TradeError::Terminal { .. } => {
                MandiError::BusinessRule(err.to_string())
            }
            TradeError::MalformedNumber { .. } => MandiError::Validation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_map_to_business_rule() {
        let err = MandiError::from(TradeError::InvalidTransition {
            from: "COMPLETED".into(),
            to: "ACTIVE".into(),
        });
        assert_eq!(err.code(), "BUSINESS_RULE_ERROR");
        assert!(err.to_string().contains("invalid transition from COMPLETED to ACTIVE"));
    }

    #[test]
    fn malformed_number_maps_to_validation() {
        let err = MandiError::from(TradeError::MalformedNumber { value: "TR-26-1".into() });
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
