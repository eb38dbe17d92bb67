//! Rule-based health risk inference
//!
//! A fixed, ordered rule table is evaluated against every aggregate row, then
//! a single volatility rule against the global score. Rules are independent:
//! one row may trigger several of them. The output is sorted by descending
//! likelihood with a stable sort, so ties keep emission order (row order,
//! then rule order).

use std::cmp::Ordering;
use std::fmt;

use crate::types::{EmotionAggregate, RiskPrediction};

/// Condition on one aggregate row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// Emotion is one of `emotions` and its proportion exceeds `threshold`
    Above {
        emotions: &'static [&'static str],
        threshold: f64,
    },
    /// Emotion is one of `emotions` and its proportion is under `threshold`
    Below {
        emotions: &'static [&'static str],
        threshold: f64,
    },
    /// Like `Above`, and the average confidence is under `max_confidence`
    AboveWithLowConfidence {
        emotions: &'static [&'static str],
        threshold: f64,
        max_confidence: f64,
    },
}

impl Trigger {
    pub fn emotions(&self) -> &'static [&'static str] {
        match self {
            Trigger::Above { emotions, .. }
            | Trigger::Below { emotions, .. }
            | Trigger::AboveWithLowConfidence { emotions, .. } => emotions,
        }
    }

    /// Whether the row satisfies the trigger; `emotion` is already lowercase
    fn fires(&self, emotion: &str, row: &EmotionAggregate) -> bool {
        if !self.emotions().contains(&emotion) {
            return false;
        }
        match *self {
            Trigger::Above { threshold, .. } => row.proportion > threshold,
            Trigger::Below { threshold, .. } => row.proportion < threshold,
            Trigger::AboveWithLowConfidence {
                threshold,
                max_confidence,
                ..
            } => row.proportion > threshold && row.avg_confidence < max_confidence,
        }
    }

    /// Distance past the threshold, in proportion points
    fn excess(&self, proportion: f64) -> f64 {
        match *self {
            Trigger::Above { threshold, .. }
            | Trigger::AboveWithLowConfidence { threshold, .. } => proportion - threshold,
            Trigger::Below { threshold, .. } => threshold - proportion,
        }
    }

    /// Human-readable condition, for rule listings
    pub fn describe(&self) -> String {
        let emotions = self.emotions().join(" or ");
        match *self {
            Trigger::Above { threshold, .. } => format!("{emotions} > {threshold}%"),
            Trigger::Below { threshold, .. } => format!("{emotions} < {threshold}%"),
            Trigger::AboveWithLowConfidence {
                threshold,
                max_confidence,
                ..
            } => format!("{emotions} > {threshold}% with confidence < {max_confidence}%"),
        }
    }
}

/// One row-level rule: `likelihood = min(cap, base + excess)`
#[derive(Clone, Copy)]
pub struct RiskRule {
    pub risk: &'static str,
    pub trigger: Trigger,
    pub base: f64,
    pub cap: f64,
    pub suggestions: &'static str,
    explain: fn(&str, &EmotionAggregate) -> String,
}

impl fmt::Debug for RiskRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskRule")
            .field("risk", &self.risk)
            .field("trigger", &self.trigger)
            .field("base", &self.base)
            .field("cap", &self.cap)
            .finish_non_exhaustive()
    }
}

impl RiskRule {
    /// Evaluate the rule against one row
    pub fn evaluate(&self, row: &EmotionAggregate) -> Option<RiskPrediction> {
        let emotion = row.emotion.to_lowercase();
        if !self.trigger.fires(&emotion, row) {
            return None;
        }
        Some(RiskPrediction {
            risk: self.risk.to_string(),
            likelihood: (self.base + self.trigger.excess(row.proportion)).min(self.cap),
            explanation: (self.explain)(&emotion, row),
            suggestions: self.suggestions.to_string(),
        })
    }
}

/// The rule evaluated against the global volatility score
#[derive(Debug, Clone, Copy)]
pub struct VolatilityRule {
    pub risk: &'static str,
    pub threshold: f64,
    pub base: f64,
    pub cap: f64,
    pub suggestions: &'static str,
}

impl VolatilityRule {
    pub fn evaluate(&self, volatility_score: f64) -> Option<RiskPrediction> {
        if volatility_score <= self.threshold || volatility_score.is_nan() {
            return None;
        }
        Some(RiskPrediction {
            risk: self.risk.to_string(),
            likelihood: (self.base + volatility_score).min(self.cap),
            explanation: format!(
                "Emotional fluctuations (volatility score: {volatility_score:.1}) suggest potential mood disorders."
            ),
            suggestions: self.suggestions.to_string(),
        })
    }
}

/// Row-level rules, in emission order
pub static RISK_RULES: [RiskRule; 7] = [
    RiskRule {
        risk: "Cardiovascular Issues",
        trigger: Trigger::Above {
            emotions: &["angry"],
            threshold: 40.0,
        },
        base: 60.0,
        cap: 80.0,
        suggestions: "Practice anger management techniques (e.g., deep breathing, meditation), engage in regular physical activity (e.g., 30 min/day), and consult a healthcare provider for cardiovascular screening.",
        explain: explain_cardiovascular,
    },
    RiskRule {
        risk: "Chronic Stress",
        trigger: Trigger::Above {
            emotions: &["angry"],
            threshold: 40.0,
        },
        base: 55.0,
        cap: 75.0,
        suggestions: "Incorporate stress-reduction practices like mindfulness or yoga, ensure adequate sleep (7-8 hours/night), and seek counseling if stress persists.",
        explain: explain_chronic_stress,
    },
    RiskRule {
        risk: "Depression",
        trigger: Trigger::Above {
            emotions: &["sad"],
            threshold: 50.0,
        },
        base: 70.0,
        cap: 90.0,
        suggestions: "Seek professional help from a therapist or counselor, engage in social activities, and consider cognitive-behavioral therapy (CBT) or support groups.",
        explain: explain_depression,
    },
    RiskRule {
        risk: "Anxiety",
        trigger: Trigger::Above {
            emotions: &["sad"],
            threshold: 50.0,
        },
        base: 60.0,
        cap: 80.0,
        suggestions: "Practice relaxation techniques (e.g., progressive muscle relaxation), maintain a balanced diet, and consult a mental health professional for anxiety management strategies.",
        explain: explain_anxiety,
    },
    RiskRule {
        risk: "Anxiety Disorders",
        trigger: Trigger::Above {
            emotions: &["fear"],
            threshold: 30.0,
        },
        base: 60.0,
        cap: 80.0,
        suggestions: "Try mindfulness meditation, seek therapy (e.g., exposure therapy or CBT), and build a support network to manage anxiety triggers.",
        explain: explain_anxiety_disorders,
    },
    RiskRule {
        risk: "Low Mood",
        trigger: Trigger::Below {
            emotions: &["happy", "surprise"],
            threshold: 20.0,
        },
        base: 50.0,
        cap: 70.0,
        suggestions: "Engage in activities that boost positive emotions (e.g., hobbies, exercise, social connections), practice gratitude journaling, and consult a mental health professional if low mood persists.",
        explain: explain_low_mood,
    },
    RiskRule {
        risk: "Emotional Suppression",
        trigger: Trigger::AboveWithLowConfidence {
            emotions: &["neutral"],
            threshold: 50.0,
            max_confidence: 60.0,
        },
        base: 50.0,
        cap: 60.0,
        suggestions: "Explore expressive therapies (e.g., art or music therapy), practice emotional awareness through journaling, and seek counseling to address suppressed emotions.",
        explain: explain_emotional_suppression,
    },
];

/// Volatility-derived rule, emitted after all row-level rules
pub static MOOD_DISORDER_RULE: VolatilityRule = VolatilityRule {
    risk: "Mood Disorders",
    threshold: 10.0,
    base: 60.0,
    cap: 80.0,
    suggestions: "Consult a psychiatrist for mood disorder evaluation, maintain a consistent daily routine, and consider mood-stabilizing activities like regular exercise and stress management.",
};

fn explain_cardiovascular(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "High anger ({:.1}%) with confidence {:.1}% increases risk of hypertension and heart disease.",
        row.proportion, row.avg_confidence
    )
}

fn explain_chronic_stress(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "Elevated anger ({:.1}%) contributes to stress-related disorders.",
        row.proportion
    )
}

fn explain_depression(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "High sadness ({:.1}%) with confidence {:.1}% suggests risk of depression.",
        row.proportion, row.avg_confidence
    )
}

fn explain_anxiety(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "Persistent sadness ({:.1}%) may contribute to anxiety disorders.",
        row.proportion
    )
}

fn explain_anxiety_disorders(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "High fear ({:.1}%) with confidence {:.1}% indicates potential anxiety disorders.",
        row.proportion, row.avg_confidence
    )
}

fn explain_low_mood(emotion: &str, row: &EmotionAggregate) -> String {
    format!(
        "Low positive emotions ({emotion}: {:.1}%) may indicate a low mood, increasing the risk of emotional instability or early depression.",
        row.proportion
    )
}

fn explain_emotional_suppression(_: &str, row: &EmotionAggregate) -> String {
    format!(
        "High neutral emotions ({:.1}%) with low confidence ({:.1}%) may indicate emotional suppression.",
        row.proportion, row.avg_confidence
    )
}

/// Evaluate every rule and rank the resulting predictions
pub fn infer_risks(aggregates: &[EmotionAggregate], volatility_score: f64) -> Vec<RiskPrediction> {
    let mut predictions: Vec<RiskPrediction> = aggregates
        .iter()
        .flat_map(|row| RISK_RULES.iter().filter_map(move |rule| rule.evaluate(row)))
        .collect();

    predictions.extend(MOOD_DISORDER_RULE.evaluate(volatility_score));

    // sort_by is stable: equal likelihoods keep emission order
    predictions.sort_by(|a, b| {
        b.likelihood
            .partial_cmp(&a.likelihood)
            .unwrap_or(Ordering::Equal)
    });

    log::debug!(
        "{} risk rule(s) fired over {} emotion(s)",
        predictions.len(),
        aggregates.len()
    );

    predictions
}
