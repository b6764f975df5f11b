//! Outcome aggregation.

use courier_common::types::{DeliveryReport, DispatchOutcome};

/// Reduce per-recipient outcomes into a delivery report.
///
/// Pure and commutative: the report depends only on the multiset of success
/// flags, never on outcome order.
pub fn aggregate(outcomes: &[DispatchOutcome]) -> DeliveryReport {
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    DeliveryReport {
        total: outcomes.len(),
        succeeded,
        failed: outcomes.len() - succeeded,
    }
}
