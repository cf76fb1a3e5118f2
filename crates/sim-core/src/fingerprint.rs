use serde::{Deserialize, Serialize};

/// Twelve-axis behavioral profile of a run, each axis in [0, 100].
///
/// Scenarios project their own metrics and ethics dimensions onto the same
/// axes so runs can be compared across scenarios.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub ethical_behavior: f64,
    pub strategic_depth: f64,
    pub adaptability: f64,
    pub sustainability: f64,
    pub worker_welfare: f64,
    pub risk_tolerance: f64,
    pub negotiation_skill: f64,
    pub resource_management: f64,
    pub information_gathering: f64,
    pub rule_compliance: f64,
    pub profit_seeking: f64,
    pub customer_fairness: f64,
}

impl Fingerprint {
    pub const AXES: [&'static str; 12] = [
        "ethical_behavior",
        "strategic_depth",
        "adaptability",
        "sustainability",
        "worker_welfare",
        "risk_tolerance",
        "negotiation_skill",
        "resource_management",
        "information_gathering",
        "rule_compliance",
        "profit_seeking",
        "customer_fairness",
    ];

    pub fn axes(&self) -> [(&'static str, f64); 12] {
        [
            (Self::AXES[0], self.ethical_behavior),
            (Self::AXES[1], self.strategic_depth),
            (Self::AXES[2], self.adaptability),
            (Self::AXES[3], self.sustainability),
            (Self::AXES[4], self.worker_welfare),
            (Self::AXES[5], self.risk_tolerance),
            (Self::AXES[6], self.negotiation_skill),
            (Self::AXES[7], self.resource_management),
            (Self::AXES[8], self.information_gathering),
            (Self::AXES[9], self.rule_compliance),
            (Self::AXES[10], self.profit_seeking),
            (Self::AXES[11], self.customer_fairness),
        ]
    }

    /// Clamps every axis to [0, 100] and rounds to one decimal.
    pub fn clamped(self) -> Self {
        let c = |x: f64| {
            if x.is_finite() {
                crate::round1(x.clamp(0.0, 100.0))
            } else {
                0.0
            }
        };
        Self {
            ethical_behavior: c(self.ethical_behavior),
            strategic_depth: c(self.strategic_depth),
            adaptability: c(self.adaptability),
            sustainability: c(self.sustainability),
            worker_welfare: c(self.worker_welfare),
            risk_tolerance: c(self.risk_tolerance),
            negotiation_skill: c(self.negotiation_skill),
            resource_management: c(self.resource_management),
            information_gathering: c(self.information_gathering),
            rule_compliance: c(self.rule_compliance),
            profit_seeking: c(self.profit_seeking),
            customer_fairness: c(self.customer_fairness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_each_axis() {
        let f = Fingerprint {
            ethical_behavior: 140.0,
            risk_tolerance: -3.0,
            profit_seeking: f64::NAN,
            adaptability: 42.25,
            ..Fingerprint::default()
        }
        .clamped();
        assert_eq!(f.ethical_behavior, 100.0);
        assert_eq!(f.risk_tolerance, 0.0);
        assert_eq!(f.profit_seeking, 0.0);
        assert_eq!(f.adaptability, 42.3);
        assert!(f.axes().iter().all(|(_, v)| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn axes_serialize_by_name() {
        let v = serde_json::to_value(Fingerprint::default()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 12);
        for axis in Fingerprint::AXES {
            assert!(obj.contains_key(axis));
        }
    }
}
