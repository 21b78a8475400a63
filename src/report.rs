//! Plain-text rendering of a prediction

use crate::types::prediction::{Personality, PredictionResult, ProbabilitySource};

const BAR_WIDTH: usize = 30;

/// Descriptive text shown for a personality
#[derive(Debug, Clone, Copy)]
pub struct PersonalityProfile {
    pub description: &'static str,
    pub characteristics: &'static [&'static str],
    pub suggestions: &'static [&'static str],
}

impl PersonalityProfile {
    pub fn of(personality: Personality) -> Self {
        match personality {
            Personality::Extrovert => Self {
                description: "You are energetic and enjoy social interaction!",
                characteristics: &[
                    "Draws energy from social interaction",
                    "Adapts easily",
                    "Expressive and open",
                    "Enjoys teamwork",
                ],
                suggestions: &[
                    "Make use of your networking skills",
                    "Keep your social time in balance",
                    "Develop your leadership skills",
                ],
            },
            Personality::Introvert => Self {
                description: "You are reflective and enjoy calm and quiet!",
                characteristics: &[
                    "Draws energy from time alone",
                    "Thinks deeply",
                    "Focuses on the quality of relationships",
                    "Creative and reflective",
                ],
                suggestions: &[
                    "Make use of your analytical skills",
                    "Look for supportive environments",
                    "Develop specialist expertise",
                ],
            },
        }
    }
}

fn bar(probability: f64) -> String {
    let filled = (probability.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Render the result card, probability breakdown and insights.
pub fn render_report(result: &PredictionResult) -> String {
    let profile = PersonalityProfile::of(result.label);
    let probs = &result.class_probabilities;

    let mut out = format!(
        "Personality: {}\n{}\nConfidence: {:.2}%",
        result.label, profile.description, result.confidence_score
    );
    if result.probability_source == ProbabilitySource::Fallback {
        out.push_str(" (model provides no probability estimate)");
    }
    out.push_str("\n\nProbability distribution:\n");
    for personality in [Personality::Introvert, Personality::Extrovert] {
        let p = probs.of(personality);
        out.push_str(&format!(
            "  {:<10} {} {:>6.2}%\n",
            personality.as_str(),
            bar(p),
            p * 100.0
        ));
    }

    out.push_str("\nYour characteristics:\n");
    out.push_str(&bullets(profile.characteristics));
    out.push_str("Suggestions:\n");
    out.push_str(&bullets(profile.suggestions));

    out
}

fn bullets(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("  - {line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::ClassProbabilities;

    #[test]
    fn test_render_estimated() {
        let probs = ClassProbabilities::from_class_vector([0.2, 0.8]).unwrap();
        let report = render_report(&PredictionResult::estimated(Personality::Extrovert, probs));

        assert!(report.starts_with("Personality: Extrovert\n"));
        assert!(report.contains("Confidence: 80.00%\n"));
        assert!(report.contains("Introvert"));
        assert!(report.contains(" 20.00%"));
        assert!(report.contains("Enjoys teamwork"));
        assert!(!report.contains("no probability estimate"));
    }

    #[test]
    fn test_render_fallback() {
        let report = render_report(&PredictionResult::fallback(Personality::Introvert));
        assert!(report.contains("Confidence: 75.00% (model provides no probability estimate)"));
        assert!(report.contains("Thinks deeply"));
    }

    #[test]
    fn test_render_layout() {
        let report = render_report(&PredictionResult::fallback(Personality::Introvert));
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Personality: Introvert");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Probability distribution:");
        assert!(lines[5].starts_with("  Introvert "));
        assert!(lines[6].starts_with("  Extrovert "));
        assert_eq!(lines[8], "Your characteristics:");
        assert_eq!(lines[9], "  - Draws energy from time alone");
        assert_eq!(lines[13], "Suggestions:");
        assert_eq!(lines.len(), 17);
        assert!(report.ends_with('\n'));
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar(0.5).chars().count(), BAR_WIDTH);
        assert_eq!(bar(1.0).chars().filter(|c| *c == '█').count(), BAR_WIDTH);
        assert_eq!(bar(0.0).chars().filter(|c| *c == '█').count(), 0);
    }
}
