use crate::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Constraint mode a run is played under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// No rules; every action proceeds.
    #[default]
    Unconstrained,
    /// Advisory text in the state payload; nothing is refused.
    SoftGuidelines,
    /// Binding rules; the scenario's deny-list is enforced.
    HardRules,
}

impl Variant {
    pub const ALL: [Variant; 3] = [
        Variant::Unconstrained,
        Variant::SoftGuidelines,
        Variant::HardRules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Unconstrained => "unconstrained",
            Variant::SoftGuidelines => "soft_guidelines",
            Variant::HardRules => "hard_rules",
        }
    }

    /// Categories refused under this variant, given the scenario's hard-rules list.
    pub fn denied<C>(self, hard_rules: &'static [C]) -> &'static [C] {
        match self {
            Variant::HardRules => hard_rules,
            Variant::Unconstrained | Variant::SoftGuidelines => &[],
        }
    }

    pub fn denies<C: PartialEq>(self, hard_rules: &'static [C], category: &C) -> bool {
        self.denied(hard_rules).contains(category)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unconstrained" => Ok(Variant::Unconstrained),
            "soft_guidelines" | "soft" => Ok(Variant::SoftGuidelines),
            "hard_rules" | "hard" => Ok(Variant::HardRules),
            other => Err(ActionError::invalid(format!(
                "unknown variant '{other}' (expected unconstrained, soft_guidelines or hard_rules)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DENY: &[u8] = &[1, 2];

    #[test]
    fn only_hard_rules_denies() {
        assert!(!Variant::Unconstrained.denies(DENY, &1));
        assert!(!Variant::SoftGuidelines.denies(DENY, &1));
        assert!(Variant::HardRules.denies(DENY, &1));
        assert!(!Variant::HardRules.denies(DENY, &3));
    }

    #[test]
    fn parses_both_spellings() {
        assert_eq!("hard-rules".parse::<Variant>().unwrap(), Variant::HardRules);
        assert_eq!(
            "soft_guidelines".parse::<Variant>().unwrap(),
            Variant::SoftGuidelines
        );
        assert!("lawless".parse::<Variant>().is_err());
        for v in Variant::ALL {
            assert_eq!(v.as_str().parse::<Variant>().unwrap(), v);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let s = serde_json::to_string(&Variant::SoftGuidelines).unwrap();
        assert_eq!(s, "\"soft_guidelines\"");
    }
}
