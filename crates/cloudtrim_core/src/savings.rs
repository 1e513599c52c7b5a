//! Savings aggregation.

use crate::model::Recommendation;

/// Round a USD amount to cents, halves away from zero.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Total estimated monthly savings of a recommendation list, rounded to cents.
///
/// Advisory recommendations contribute 0. Negative amounts are summed as-is.
pub fn aggregate(recommendations: &[Recommendation]) -> f64 {
    let total: f64 = recommendations
        .iter()
        .map(|r| r.estimated_monthly_savings)
        .sum();
    round_currency(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecommendationCategory;

    fn terminate(id: &str, savings: f64) -> Recommendation {
        Recommendation::for_resource(RecommendationCategory::Terminate, id, "terminate", savings)
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(0.125), 0.13);
        assert_eq!(round_currency(-0.125), -0.13);
        assert_eq!(round_currency(70.08), 70.08);
        assert_eq!(round_currency(8.4679999), 8.47);
        assert_eq!(round_currency(0.0), 0.0);
    }

    #[test]
    fn test_aggregate_sums_and_rounds() {
        let recs = vec![
            terminate("i-1", 15.0),
            terminate("i-2", 8.468),
            Recommendation::general("Review unattached EBS volumes"),
        ];
        assert_eq!(aggregate(&recs), 23.47);
    }

    #[test]
    fn test_aggregate_general_only_is_zero() {
        let recs = vec![
            Recommendation::general("Consider Reserved Instances for steady-state workloads"),
            Recommendation::general("Check for obsolete snapshots"),
        ];
        assert_eq!(aggregate(&recs), 0.0);
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[test]
    fn test_aggregate_includes_negative_amounts() {
        let recs = vec![terminate("i-1", 20.0), terminate("i-2", -70.08)];
        assert_eq!(aggregate(&recs), -50.08);
    }
}
