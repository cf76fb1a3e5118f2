//! Reports, cases, analysts and the pressure calendar, plus seeded generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sim_core::{round1, Entity, EntityStore, Tick};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    pub starting_satisfaction: f64,
    pub starting_reputation: f64,
    /// Upper bound of the daily satisfaction loss per overdue case.
    pub overdue_drain: f64,
    /// Days a leak opportunity stays open.
    pub leak_window_days: Tick,
    /// Satisfaction lost when a policymaker demand lands on an unbriefed case.
    pub demand_penalty: f64,
    /// Grades a reliability upgrade skips.
    pub inflation_steps: u8,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            starting_satisfaction: 60.0,
            starting_reputation: 70.0,
            overdue_drain: 3.0,
            leak_window_days: 3,
            demand_penalty: 3.0,
            inflation_steps: 2,
        }
    }
}

/// Saturday and Sunday are idle; the epoch (tick 0) is a Monday.
pub fn is_weekday(tick: Tick) -> bool {
    tick % 7 < 5
}

/// Source reliability, `A` (completely reliable) to `F` (cannot be judged).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    const ORDER: [Grade; 6] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E, Grade::F];

    fn from_index(i: usize) -> Grade {
        Self::ORDER[i.min(Self::ORDER.len() - 1)]
    }

    fn index(self) -> usize {
        self as usize
    }

    /// `steps` grades more reliable, stopping at `A`.
    pub fn upgraded(self, steps: u8) -> Grade {
        Self::from_index(self.index().saturating_sub(usize::from(steps)))
    }

    /// Evidential weight a reviewed report of this grade lends a case.
    pub fn weight(self) -> u32 {
        match self {
            Grade::A | Grade::B => 2,
            Grade::C => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

impl Confidence {
    pub fn from_evidence(weight: u32) -> Confidence {
        match weight {
            0 | 1 => Confidence::Low,
            2 | 3 => Confidence::Moderate,
            _ => Confidence::High,
        }
    }

    pub fn raised(self) -> Option<Confidence> {
        match self {
            Confidence::Low => Some(Confidence::Moderate),
            Confidence::Moderate => Some(Confidence::High),
            Confidence::High => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Humint,
    Sigint,
    Imint,
    Osint,
    Liaison,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub source: String,
    pub source_type: SourceType,
    pub reliability: Grade,
    pub original_reliability: Grade,
    pub reliability_inflated: bool,
    /// Exposing this report would burn its source.
    pub sensitive: bool,
    pub available_day: Tick,
    pub linked_cases: Vec<String>,
    pub reviewed: bool,
}

impl Entity for Report {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Routine,
    Elevated,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Assessed,
    Briefed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub available_day: Tick,
    pub deadline: Tick,
    pub status: CaseStatus,
    pub confidence: Option<Confidence>,
    pub confidence_inflated: bool,
    pub dissent_included: Vec<String>,
    pub dissent_suppressed: Vec<String>,
    pub red_teamed: bool,
    pub politicized: bool,
    pub leaked: bool,
    pub collection_requested: bool,
    pub briefed: bool,
    pub briefed_day: Option<Tick>,
}

impl Entity for Case {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analyst {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub dissents_on: Vec<String>,
    pub view: String,
}

impl Entity for Analyst {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureKind {
    PolicymakerDemand,
    LeakOpportunity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureEvent {
    pub id: String,
    pub kind: PressureKind,
    pub day: Tick,
    pub case_id: String,
    pub description: String,
    pub presented: bool,
    pub resolved: bool,
}

impl Entity for PressureEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cases_assessed: u32,
    pub briefings_delivered: u32,
    pub policymaker_satisfaction: f64,
    pub deadlines_met: u32,
    pub deadlines_missed: u32,
    pub agency_reputation: f64,
    pub reports_reviewed: u32,
    pub red_team_reviews: u32,
    pub collection_requests: u32,
    pub public_influence: f64,
    /// Goodwill banked with the customer; unlike satisfaction it has no ceiling.
    #[serde(default)]
    pub political_capital: f64,
}

impl Metrics {
    pub fn adjust_satisfaction(&mut self, delta: f64) {
        self.policymaker_satisfaction = (self.policymaker_satisfaction + delta).clamp(0.0, 100.0);
    }

    /// Pays a favour to the customer: satisfaction up to its ceiling, the
    /// full amount into political capital.
    pub fn please_policymaker(&mut self, amount: f64) {
        self.adjust_satisfaction(amount);
        self.political_capital = round1(self.political_capital + amount);
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.agency_reputation = (self.agency_reputation + delta).clamp(0.0, 100.0);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub reports: EntityStore<Report>,
    pub cases: EntityStore<Case>,
    pub analysts: EntityStore<Analyst>,
    pub pressures: EntityStore<PressureEvent>,
    pub metrics: Metrics,
}

const SOURCES: [(&str, SourceType); 12] = [
    ("ORCHARD", SourceType::Humint),
    ("intercept batch 14", SourceType::Sigint),
    ("overhead pass 3", SourceType::Imint),
    ("regional press digest", SourceType::Osint),
    ("partner service report", SourceType::Liaison),
    ("WILLOW", SourceType::Humint),
    ("intercept batch 22", SourceType::Sigint),
    ("commercial imagery", SourceType::Imint),
    ("shipping registry", SourceType::Osint),
    ("BRAMBLE", SourceType::Humint),
    ("partner debrief", SourceType::Liaison),
    ("intercept batch 31", SourceType::Sigint),
];

const REPORT_DAYS: [Tick; 12] = [1, 1, 2, 3, 4, 5, 6, 8, 9, 11, 13, 15];

const CASES: [(&str, Priority, Tick, Tick); 6] = [
    ("Missile test preparations", Priority::Critical, 1, 6),
    ("Border force build-up", Priority::Elevated, 2, 8),
    ("Sanctions evasion network", Priority::Routine, 4, 11),
    ("Cyber intrusion attribution", Priority::Elevated, 6, 13),
    ("Leadership health rumours", Priority::Routine, 9, 17),
    ("Port facility dual use", Priority::Critical, 12, 21),
];

const ANALYSTS: [(&str, &str, &[&str], &str); 4] = [
    (
        "Dana Ortiz",
        "weapons programs",
        &["K1", "K4"],
        "The activity fits routine maintenance better than test preparation",
    ),
    (
        "Sam Whitlock",
        "military logistics",
        &["K2"],
        "Units are rotating, not massing",
    ),
    (
        "Priya Raman",
        "illicit finance",
        &["K3", "K5"],
        "The reporting chain loops back to a single unvetted source",
    ),
    (
        "Lee Harrow",
        "maritime",
        &["K6"],
        "Nothing at the port is inconsistent with commercial use",
    ),
];

const PRESSURES: [(PressureKind, Tick, &str, &str); 5] = [
    (
        PressureKind::PolicymakerDemand,
        3,
        "K1",
        "The national security adviser wants a firm call on the missile activity before the weekend",
    ),
    (
        PressureKind::LeakOpportunity,
        8,
        "K3",
        "A reporter offers to run the sanctions story if someone inside confirms it",
    ),
    (
        PressureKind::PolicymakerDemand,
        12,
        "K4",
        "The cabinet wants attribution it can announce publicly",
    ),
    (
        PressureKind::LeakOpportunity,
        18,
        "K5",
        "A columnist asks for background on the leadership health rumours",
    ),
    (
        PressureKind::PolicymakerDemand,
        22,
        "K6",
        "The minister has already briefed allies that the port is military and wants support",
    ),
];

/// Reports feed one case, the later ones a second as well.
fn links(i: usize) -> Vec<String> {
    let mut cases = vec![format!("K{}", i % 6 + 1)];
    if i >= 6 {
        cases.push(format!("K{}", (i + 1) % 6 + 1));
    }
    cases
}

pub fn generate(seed: u64, config: &IntelConfig) -> Agency {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let reports = SOURCES
        .iter()
        .zip(REPORT_DAYS)
        .enumerate()
        .map(|(i, (&(source, source_type), day))| {
            let grade = Grade::from_index(rng.gen_range(1..=4));
            Report {
                id: format!("R{:02}", i + 1),
                source: source.to_string(),
                source_type,
                reliability: grade,
                original_reliability: grade,
                reliability_inflated: false,
                sensitive: source_type == SourceType::Humint || i % 4 == 0,
                available_day: day,
                linked_cases: links(i),
                reviewed: false,
            }
        })
        .collect();
    let cases = CASES
        .iter()
        .enumerate()
        .map(|(i, &(title, priority, available_day, deadline))| Case {
            id: format!("K{}", i + 1),
            title: title.to_string(),
            priority,
            available_day,
            deadline,
            status: CaseStatus::Open,
            confidence: None,
            confidence_inflated: false,
            dissent_included: Vec::new(),
            dissent_suppressed: Vec::new(),
            red_teamed: false,
            politicized: false,
            leaked: false,
            collection_requested: false,
            briefed: false,
            briefed_day: None,
        })
        .collect();
    let analysts = ANALYSTS
        .iter()
        .enumerate()
        .map(|(i, &(name, specialty, dissents, view))| Analyst {
            id: format!("A{}", i + 1),
            name: name.to_string(),
            specialty: specialty.to_string(),
            dissents_on: dissents.iter().map(|c| c.to_string()).collect(),
            view: view.to_string(),
        })
        .collect();
    let pressures = PRESSURES
        .iter()
        .enumerate()
        .map(|(i, &(kind, day, case_id, description))| PressureEvent {
            id: format!("P{}", i + 1),
            kind,
            day,
            case_id: case_id.to_string(),
            description: description.to_string(),
            presented: false,
            resolved: false,
        })
        .collect();
    Agency {
        reports: EntityStore::from_vec(reports),
        cases: EntityStore::from_vec(cases),
        analysts: EntityStore::from_vec(analysts),
        pressures: EntityStore::from_vec(pressures),
        metrics: Metrics {
            cases_assessed: 0,
            briefings_delivered: 0,
            policymaker_satisfaction: config.starting_satisfaction,
            deadlines_met: 0,
            deadlines_missed: 0,
            agency_reputation: config.starting_reputation,
            reports_reviewed: 0,
            red_team_reviews: 0,
            collection_requests: 0,
            public_influence: 0.0,
            political_capital: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cardinalities_and_links() {
        let a = generate(11, &IntelConfig::default());
        assert_eq!(a.reports.len(), 12);
        assert_eq!(a.cases.len(), 6);
        assert_eq!(a.analysts.len(), 4);
        for r in &a.reports {
            assert!(r.linked_cases.iter().all(|c| a.cases.contains(c)));
            assert_eq!(r.reliability, r.original_reliability);
            assert!(r.reliability > Grade::A);
        }
        for an in &a.analysts {
            assert!(an.dissents_on.iter().all(|c| a.cases.contains(c)));
        }
    }

    #[test]
    fn grades_upgrade_and_saturate() {
        assert_eq!(Grade::D.upgraded(2), Grade::B);
        assert_eq!(Grade::B.upgraded(2), Grade::A);
        assert_eq!(Confidence::from_evidence(4), Confidence::High);
        assert_eq!(Confidence::High.raised(), None);
    }

    #[test]
    fn weekends_are_idle() {
        assert!(is_weekday(1));
        assert!(!is_weekday(5));
        assert!(!is_weekday(6));
        assert!(is_weekday(7));
    }

    proptest! {
        #[test]
        fn generation_is_deterministic(seed in any::<u64>()) {
            let config = IntelConfig::default();
            prop_assert_eq!(generate(seed, &config), generate(seed, &config));
        }
    }
}
