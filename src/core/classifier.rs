//! Rule-based CTG classification into Category I/II/III.
//!
//! Rules are evaluated in table order and the first match wins. The table
//! ends with an unconditional default, so every input gets exactly one
//! finding.

use crate::core::events::{Event, EventKind, EventSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal clinical category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    I,
    II,
    III,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::I => "I",
            Category::II => "II",
            Category::III => "III",
        };
        f.pad(s)
    }
}

/// Severity of a finding; drives the flag paint/erase decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The clinical finding selected by the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finding {
    AbsentVariability,
    LateDecelsReducedVariability,
    ProlongedDeceleration,
    Bradycardia,
    TachycardiaReducedVariability,
    Tachycardia,
    MinimalVariability,
    MarkedVariability,
    LateDecelerations,
    EarlyDecelerations,
    ReassuringReactive,
    Reassuring,
    Normal,
}

impl Finding {
    /// Status label reported with the classification.
    pub fn label(self) -> &'static str {
        match self {
            Finding::AbsentVariability => "Absent Variability",
            Finding::LateDecelsReducedVariability => "Late Decels + Reduced Variability",
            Finding::ProlongedDeceleration => "Prolonged Deceleration",
            Finding::Bradycardia => "Bradycardia",
            Finding::TachycardiaReducedVariability => "Tachycardia + Reduced Variability",
            Finding::Tachycardia => "Tachycardia",
            Finding::MinimalVariability => "Minimal Variability",
            Finding::MarkedVariability => "Marked Variability",
            Finding::LateDecelerations => "Late Decelerations",
            Finding::EarlyDecelerations => "Early Decelerations",
            Finding::ReassuringReactive => "Reassuring (Reactive)",
            Finding::Reassuring => "Reassuring",
            Finding::Normal => "Normal",
        }
    }
}

/// Inputs the rules look at.
#[derive(Debug, Clone)]
struct Evidence<'a> {
    baseline: f64,
    variability: f64,
    events: &'a EventSummary,
}

impl Evidence<'_> {
    fn moderate_variability(&self) -> bool {
        (5.0..=25.0).contains(&self.variability)
    }

    fn normal_baseline(&self) -> bool {
        (110.0..=160.0).contains(&self.baseline)
    }
}

struct Rule {
    finding: Finding,
    category: Category,
    severity: Severity,
    rationale: &'static str,
    applies: fn(&Evidence) -> bool,
}

/// Ordered decision list; first match wins.
static RULES: [Rule; 12] = [
    Rule {
        finding: Finding::AbsentVariability,
        category: Category::III,
        severity: Severity::High,
        rationale: "Absent variability indicates compromised fetal neurologic function. Immediate delivery may be required.",
        applies: |e| e.variability < 3.0,
    },
    Rule {
        finding: Finding::LateDecelsReducedVariability,
        category: Category::III,
        severity: Severity::High,
        rationale: "Recurrent late decelerations with reduced variability indicate fetal hypoxia and uteroplacental insufficiency.",
        applies: |e| e.events.has(EventKind::LateDecel) && e.variability < 5.0,
    },
    Rule {
        finding: Finding::ProlongedDeceleration,
        category: Category::III,
        severity: Severity::High,
        rationale: "Prolonged deceleration detected (>90 seconds). Associated with reduced oxygen transfer and poor neonatal outcomes.",
        applies: |e| e.events.prolonged > 0,
    },
    Rule {
        finding: Finding::Bradycardia,
        category: Category::III,
        severity: Severity::High,
        rationale: "Baseline FHR <110 bpm indicates severe fetal bradycardia.",
        applies: |e| e.baseline < 110.0,
    },
    Rule {
        finding: Finding::TachycardiaReducedVariability,
        category: Category::III,
        severity: Severity::High,
        rationale: "Persistent tachycardia with reduced variability may indicate fetal infection or distress.",
        applies: |e| e.baseline > 160.0 && e.variability < 5.0,
    },
    Rule {
        finding: Finding::Tachycardia,
        category: Category::II,
        severity: Severity::Medium,
        rationale: "Baseline FHR >160 bpm. Monitor for infection or fetal distress.",
        applies: |e| e.baseline > 160.0,
    },
    Rule {
        finding: Finding::MinimalVariability,
        category: Category::II,
        severity: Severity::Medium,
        rationale: "Minimal baseline variability (3-5 bpm). May indicate fetal sleep cycle or CNS depression.",
        applies: |e| (3.0..5.0).contains(&e.variability),
    },
    Rule {
        finding: Finding::MarkedVariability,
        category: Category::II,
        severity: Severity::Medium,
        rationale: "Marked baseline variability (>25 bpm). Requires continued observation.",
        applies: |e| e.variability > 25.0,
    },
    Rule {
        finding: Finding::LateDecelerations,
        category: Category::II,
        severity: Severity::Medium,
        rationale: "Late decelerations detected. Indicates possible uteroplacental insufficiency.",
        applies: |e| e.events.has(EventKind::LateDecel),
    },
    Rule {
        finding: Finding::EarlyDecelerations,
        category: Category::II,
        severity: Severity::Medium,
        rationale: "Early decelerations present (head compression). Generally benign but monitor if appearing early in labor.",
        applies: |e| e.events.has(EventKind::EarlyDecel),
    },
    Rule {
        finding: Finding::ReassuringReactive,
        category: Category::I,
        severity: Severity::Low,
        rationale: "Fetal heart rate patterns are reassuring. Presence of accelerations indicates fetal well-being.",
        applies: |e| e.events.accelerations >= 2 && e.moderate_variability() && e.normal_baseline(),
    },
    Rule {
        finding: Finding::Reassuring,
        category: Category::I,
        severity: Severity::Low,
        rationale: "Fetal heart rate patterns appear reassuring with moderate variability and normal baseline.",
        applies: |e| e.moderate_variability() && e.normal_baseline(),
    },
];

static DEFAULT_RULE: Rule = Rule {
    finding: Finding::Normal,
    category: Category::I,
    severity: Severity::Low,
    rationale: "Fetal heart rate patterns appear within normal limits.",
    applies: |_| true,
};

/// Outcome of classifying one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub baseline_bpm: f64,
    pub variability: f64,
    pub category: Category,
    pub finding: Finding,
    /// Human-readable status label
    pub status: String,
    pub severity: Severity,
    /// Clinical explanation for the finding
    pub rationale: String,
    pub event_summary: EventSummary,
}

/// Classify a window from its statistics and detected events.
///
/// Inputs must be finite; the session rejects non-finite windows before
/// they get here.
pub fn classify(baseline: f64, variability: f64, events: &[Event]) -> ClassificationResult {
    let summary = EventSummary::from_events(events);
    let evidence = Evidence {
        baseline,
        variability,
        events: &summary,
    };

    let rule = RULES
        .iter()
        .find(|rule| (rule.applies)(&evidence))
        .unwrap_or(&DEFAULT_RULE);

    ClassificationResult {
        baseline_bpm: baseline,
        variability,
        category: rule.category,
        finding: rule.finding,
        status: rule.finding.label().to_string(),
        severity: rule.severity,
        rationale: rule.rationale.to_string(),
        event_summary: summary,
    }
}
