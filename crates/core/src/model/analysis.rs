use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of analysing a question paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperAnalysis {
    pub metadata: PaperMetadata,
    /// Topic name -> share of the paper in percent.
    pub topic_distribution: BTreeMap<String, f64>,
    /// Difficulty bucket -> share of the paper in percent.
    pub difficulty_analysis: BTreeMap<String, f64>,
    pub score_prediction: Option<ScorePrediction>,
    pub recommendations: Vec<TopicRecommendation>,
    pub key_insights: Vec<String>,
    pub study_plan: Option<StudyPlan>,
}

impl PaperAnalysis {
    /// Topic with the largest share of the paper.
    #[must_use]
    pub fn dominant_topic(&self) -> Option<(&str, f64)> {
        self.topic_distribution
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(topic, share)| (topic.as_str(), *share))
    }

    /// Recommendations marked high priority, in service order.
    pub fn high_priority(&self) -> impl Iterator<Item = &TopicRecommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.priority.as_deref().is_some_and(|p| p.eq_ignore_ascii_case("high")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperMetadata {
    pub subject: Option<String>,
    pub total_questions_estimated: Option<u32>,
    pub analysis_timestamp: Option<String>,
    pub paper_difficulty_overall: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePrediction {
    pub expected_score: f64,
    pub score_range: Option<(f64, f64)>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicRecommendation {
    pub topic: String,
    pub subject: Option<String>,
    pub weight_in_paper: Option<f64>,
    pub current_mastery: Option<f64>,
    pub priority: Option<String>,
    pub recommended_time: Option<String>,
    pub resources: Vec<String>,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyPlan {
    pub total_days: Option<u32>,
    pub daily_target: Option<String>,
    pub schedule: Vec<StudyDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyDay {
    pub day: String,
    pub focus: String,
    pub topics: Vec<String>,
    pub activities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_payload_and_finds_dominant_topic() {
        let analysis: PaperAnalysis = serde_json::from_str(
            r#"{
                "metadata": {"subject": "Physics", "total_questions_estimated": 50},
                "topic_distribution": {"Physics_Optics": 25.0, "Physics_Thermodynamics": 30.0},
                "score_prediction": {"expected_score": 75.0, "score_range": [68.0, 82.0], "confidence": 0.85},
                "recommendations": [
                    {"topic": "Thermodynamics", "priority": "high"},
                    {"topic": "Optics", "priority": "low"}
                ],
                "unknown_section": {"ignored": true}
            }"#,
        )
        .unwrap();

        assert_eq!(analysis.metadata.subject.as_deref(), Some("Physics"));
        assert_eq!(analysis.dominant_topic(), Some(("Physics_Thermodynamics", 30.0)));
        assert_eq!(
            analysis.score_prediction.as_ref().and_then(|p| p.score_range),
            Some((68.0, 82.0))
        );
        let high: Vec<_> = analysis.high_priority().map(|r| r.topic.as_str()).collect();
        assert_eq!(high, vec!["Thermodynamics"]);
        assert!(analysis.study_plan.is_none());
    }
}
