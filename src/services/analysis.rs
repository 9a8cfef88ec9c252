//! Question, answer and question-set analysis on top of the feature
//! extractor, the heuristic scorers and the model registry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use quizsense_ml::MlError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{require_text, AnalysisError, ValidationError};
use crate::analytics::difficulty::{
    difficulty_distribution, identify_problematic_questions, score_difficulty, score_distribution,
    CoarseTier, DifficultyAnalysis, DifficultyTier, DistributionMetrics, ProblematicQuestion,
};
use crate::analytics::insights::{
    assess_answer, identify_comprehension_issues, performance_insights,
    insufficient_data_insight, question_performance_recommendations, question_recommendations,
    student_recommendations, LOW_CONFIDENCE,
};
use crate::analytics::performance::{
    aggregate, aggregate_with_minimum, find_common_mistakes, CommonMistake, PerformanceSummary,
};
use crate::features::matrix::{answer_record, performance_record};
use crate::features::{FeatureMatrix, FeatureVector, TextFeatureExtractor};
use crate::models::{
    ComprehensionPrediction, DifficultyPrediction, ModelRegistry, RegistryError, DIFFICULTY_LABEL,
};
use crate::records::{AnsweredQuestion, QuestionType, RawAnswerRecord, RawQuestionRecord};
use crate::store::{AnswerFilter, AnswerStore};

/// Questions with fewer answers than this are left out of the difficulty training set.
pub const MIN_ATTEMPTS_PER_QUESTION: usize = 3;
pub const DEFAULT_SET_MIN_ATTEMPTS: usize = 5;
pub const DEFAULT_DAYS_BACK: i64 = 30;
const QUESTION_PREVIEW_CHARS: usize = 200;
const SUBJECT_MIN_QUESTIONS: usize = 10;

fn first<T>(mut values: Vec<T>) -> Result<T, RegistryError> {
    if values.is_empty() {
        return Err(MlError::EmptyInput.into());
    }
    Ok(values.swap_remove(0))
}

/// Question features with the type defaulting to short answer.
pub fn question_features(
    extractor: &TextFeatureExtractor,
    text: &str,
    question_type: Option<QuestionType>,
) -> FeatureVector {
    extractor.extract_question(text, Some(question_type.unwrap_or(QuestionType::ShortAnswer)))
}

/// Question+answer row in the shape the score and comprehension models use.
pub fn answer_row(
    extractor: &TextFeatureExtractor,
    question: &FeatureVector,
    question_text: &str,
    answer_text: &str,
    correct_answer: Option<&str>,
    time_taken: f64,
    score_ratio: Option<f64>,
) -> FeatureVector {
    let answer = extractor.extract_answer(answer_text, Some(question_text), correct_answer);
    answer_record(question, &answer, time_taken, score_ratio)
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionAnalysisRequest {
    pub question_text: String,
    #[serde(default)]
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnalysis {
    pub difficulty_prediction: DifficultyPrediction,
    pub features_extracted: FeatureVector,
    pub recommendations: Vec<String>,
    pub analysis_timestamp: DateTime<Utc>,
}

pub fn analyze_question(
    extractor: &TextFeatureExtractor,
    registry: &ModelRegistry,
    request: &QuestionAnalysisRequest,
) -> Result<QuestionAnalysis, AnalysisError> {
    require_text("question_text", &request.question_text)?;
    let question_type = request.question_type.as_deref().and_then(QuestionType::parse);
    let features = question_features(extractor, &request.question_text, question_type);

    let matrix = FeatureMatrix::build(std::slice::from_ref(&features));
    let prediction = first(registry.predict_difficulty(&matrix)?)?;
    let tier = DifficultyTier::parse(&prediction.predicted_difficulty);
    let recommendations = question_recommendations(tier, prediction.confidence, &features);

    Ok(QuestionAnalysis {
        difficulty_prediction: prediction,
        features_extracted: features,
        recommendations,
        analysis_timestamp: Utc::now(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchAnalysisRequest {
    pub questions: Vec<QuestionAnalysisRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchQuestionAnalysis {
    pub total_questions: usize,
    pub processed_questions: usize,
    pub failed_questions: usize,
    pub results: Vec<QuestionAnalysis>,
    /// Seconds.
    pub processing_time: f64,
}

/// Analyzes every question independently; failures are counted, not returned.
pub fn analyze_questions(
    extractor: &TextFeatureExtractor,
    registry: &ModelRegistry,
    requests: &[QuestionAnalysisRequest],
) -> BatchQuestionAnalysis {
    let started = Instant::now();
    let outcomes: Vec<Result<QuestionAnalysis, AnalysisError>> = requests
        .par_iter()
        .map(|request| analyze_question(extractor, registry, request))
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failed_questions = 0;
    for outcome in outcomes {
        match outcome {
            Ok(analysis) => results.push(analysis),
            Err(err) => {
                tracing::warn!(error = %err, "question analysis failed");
                failed_questions += 1;
            }
        }
    }

    BatchQuestionAnalysis {
        total_questions: requests.len(),
        processed_questions: results.len(),
        failed_questions,
        results,
        processing_time: started.elapsed().as_secs_f64(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerAnalysisRequest {
    pub question_text: String,
    pub answer_text: String,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Seconds; absent means 0.
    #[serde(default)]
    pub time_taken: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScorePrediction {
    pub predicted_score: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensionAnalysis {
    pub comprehension_cluster: usize,
    pub cluster_confidence: f64,
    pub cluster_distances: Vec<f64>,
    pub issues_identified: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerAnalysis {
    pub score_prediction: ScorePrediction,
    pub comprehension_analysis: ComprehensionAnalysis,
    pub features_extracted: FeatureVector,
    pub analysis_timestamp: DateTime<Utc>,
}

pub fn analyze_answer(
    extractor: &TextFeatureExtractor,
    registry: &ModelRegistry,
    request: &AnswerAnalysisRequest,
) -> Result<AnswerAnalysis, AnalysisError> {
    require_text("question_text", &request.question_text)?;
    require_text("answer_text", &request.answer_text)?;
    let time_taken = request.time_taken.unwrap_or(0.0);
    if !time_taken.is_finite() || time_taken < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "time_taken",
            reason: "must be a non-negative number of seconds".to_string(),
        }
        .into());
    }

    let question_type = request.question_type.as_deref().and_then(QuestionType::parse);
    let question = question_features(extractor, &request.question_text, question_type);
    let features = answer_row(
        extractor,
        &question,
        &request.question_text,
        &request.answer_text,
        request.correct_answer.as_deref(),
        time_taken,
        None,
    );

    let matrix = FeatureMatrix::build(std::slice::from_ref(&features));
    let predicted_score = first(registry.predict_score(&matrix)?)?;
    let ComprehensionPrediction {
        comprehension_cluster,
        cluster_confidence,
        cluster_distances,
    } = first(registry.analyze_comprehension(&matrix)?)?;
    let assessment = assess_answer(Some(predicted_score), Some(cluster_confidence));

    Ok(AnswerAnalysis {
        score_prediction: ScorePrediction {
            predicted_score,
            recommendations: student_recommendations(predicted_score),
        },
        comprehension_analysis: ComprehensionAnalysis {
            comprehension_cluster,
            cluster_confidence,
            cluster_distances,
            issues_identified: assessment.issues,
            recommendations: assessment.recommendations,
        },
        features_extracted: features,
        analysis_timestamp: Utc::now(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionPerformance {
    pub question_id: i64,
    pub performance_metrics: PerformanceSummary,
    /// `performance_` feature group for the question.
    pub performance_features: FeatureVector,
    pub difficulty_analysis: DifficultyAnalysis,
    pub common_mistakes: Vec<CommonMistake>,
    pub comprehension_issues: Vec<String>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Performance report for one question.
///
/// Below `min_samples` answers the statistics are zeroed and the insights
/// only say so.
pub async fn question_performance(
    store: &AnswerStore,
    question_id: i64,
    min_samples: usize,
    mistake_min_frequency: usize,
) -> Result<QuestionPerformance, AnalysisError> {
    if store.question(question_id).await?.is_none() {
        return Err(AnalysisError::NotFound(format!("Question {question_id} not found")));
    }
    let answers = store.answers(&AnswerFilter::for_question(question_id)).await?;
    if answers.is_empty() {
        return Err(AnalysisError::NotFound(
            "No performance data found for this question".to_string(),
        ));
    }

    let summary = aggregate_with_minimum(&answers, min_samples);
    let mistakes = find_common_mistakes(&answers, mistake_min_frequency);
    let (comprehension_issues, insights, recommendations) = if summary.is_sufficient(min_samples) {
        (
            identify_comprehension_issues(&summary, &mistakes),
            performance_insights(&summary),
            question_performance_recommendations(&summary, &mistakes),
        )
    } else {
        tracing::info!(
            question_id,
            attempts = summary.total_attempts,
            min_samples,
            "question performance below minimum"
        );
        (
            Vec::new(),
            vec![insufficient_data_insight(summary.total_attempts, min_samples)],
            Vec::new(),
        )
    };

    Ok(QuestionPerformance {
        question_id,
        difficulty_analysis: score_difficulty(&summary),
        comprehension_issues,
        insights,
        recommendations,
        common_mistakes: mistakes,
        performance_features: performance_record(&summary),
        performance_metrics: summary,
    })
}

/// Answers grouped under their question, in question id order.
fn group_by_question(answered: &[AnsweredQuestion]) -> BTreeMap<i64, (&RawQuestionRecord, Vec<RawAnswerRecord>)> {
    let mut groups: BTreeMap<i64, (&RawQuestionRecord, Vec<RawAnswerRecord>)> = BTreeMap::new();
    for item in answered {
        groups
            .entry(item.question.question_id)
            .or_insert_with(|| (&item.question, Vec::new()))
            .1
            .push(item.answer.clone());
    }
    groups
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionSetRequest {
    #[serde(default)]
    pub subject_filter: Option<String>,
    #[serde(default)]
    pub min_attempts: Option<usize>,
    #[serde(default)]
    pub include_recent_only: bool,
    #[serde(default)]
    pub days_back: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStatistics {
    pub total_attempts: usize,
    pub unique_students: usize,
    pub high_performers: usize,
    pub struggling_students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDifficultyReport {
    pub question_id: i64,
    pub question_text: String,
    pub subject: String,
    pub calculated_difficulty: CoarseTier,
    pub difficulty_score: f64,
    pub confidence: f64,
    pub performance_metrics: DistributionMetrics,
    pub student_statistics: StudentStatistics,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetAnalysis {
    pub total_questions_analyzed: usize,
    pub analysis_summary: BTreeMap<String, usize>,
    pub questions: Vec<QuestionDifficultyReport>,
    pub overall_insights: Vec<String>,
    pub analysis_timestamp: DateTime<Utc>,
}

fn preview(text: &str) -> String {
    if text.chars().count() > QUESTION_PREVIEW_CHARS {
        let head: String = text.chars().take(QUESTION_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Distribution-aware classification of every question with enough answers.
pub async fn analyze_question_set(
    store: &AnswerStore,
    request: &QuestionSetRequest,
) -> Result<QuestionSetAnalysis, AnalysisError> {
    let min_attempts = request.min_attempts.unwrap_or(DEFAULT_SET_MIN_ATTEMPTS);
    let mut filter = AnswerFilter {
        subject: request.subject_filter.clone(),
        ..Default::default()
    };
    if request.include_recent_only {
        let days = request.days_back.unwrap_or(DEFAULT_DAYS_BACK).max(0);
        filter = filter.since(Utc::now() - Duration::days(days));
    }

    let answered = store.answered_questions(&filter).await?;
    let questions: Vec<QuestionDifficultyReport> = group_by_question(&answered)
        .into_iter()
        .filter(|(_, (_, answers))| answers.len() >= min_attempts)
        .map(|(question_id, (question, answers))| {
            let summary = aggregate(&answers);
            let analysis = score_distribution(&summary);
            QuestionDifficultyReport {
                question_id,
                question_text: preview(&question.question_text),
                subject: question
                    .subject
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                calculated_difficulty: analysis.calculated_difficulty,
                difficulty_score: analysis.difficulty_score,
                confidence: analysis.confidence,
                performance_metrics: analysis.metrics,
                student_statistics: StudentStatistics {
                    total_attempts: summary.total_attempts,
                    unique_students: summary.unique_students,
                    high_performers: summary.high_performer_count,
                    struggling_students: summary.struggling_count,
                },
                recommendations: analysis.recommendations,
            }
        })
        .collect();

    let mut analysis_summary: BTreeMap<String, usize> = CoarseTier::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for q in &questions {
        *analysis_summary
            .entry(q.calculated_difficulty.as_str().to_string())
            .or_insert(0) += 1;
    }

    tracing::info!(
        analyzed = questions.len(),
        subject = request.subject_filter.as_deref().unwrap_or("*"),
        min_attempts,
        "question set analyzed"
    );

    Ok(QuestionSetAnalysis {
        total_questions_analyzed: questions.len(),
        overall_insights: question_set_insights(
            &questions,
            &analysis_summary,
            request.subject_filter.as_deref(),
        ),
        analysis_summary,
        questions,
        analysis_timestamp: Utc::now(),
    })
}

fn question_set_insights(
    questions: &[QuestionDifficultyReport],
    counts: &BTreeMap<String, usize>,
    subject: Option<&str>,
) -> Vec<String> {
    if questions.is_empty() {
        return vec!["No questions found with sufficient student data".to_string()];
    }

    let total = questions.len() as f64;
    let share = |tier: CoarseTier| counts.get(tier.as_str()).copied().unwrap_or(0) as f64 / total;
    let mut insights = Vec::new();
    if share(CoarseTier::Hard) > 0.4 {
        insights.push(
            "High proportion of difficult questions detected - consider curriculum review".to_string(),
        );
    }
    if share(CoarseTier::Easy) > 0.5 {
        insights.push(
            "Many questions are too easy - consider increasing overall difficulty".to_string(),
        );
    }
    if share(CoarseTier::Medium) > 0.6 {
        insights.push("Good balance of moderate difficulty questions".to_string());
    }

    if let Some(subject) = subject {
        let avg = questions.iter().map(|q| q.difficulty_score).sum::<f64>() / total;
        if avg > 0.7 {
            insights.push(format!("{subject} appears to be a challenging subject area"));
        } else if avg < 0.3 {
            insights.push(format!("{subject} questions may need more complexity"));
        }
    }
    insights
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub total_answers: usize,
    pub avg_score: f64,
    pub question_count: usize,
    pub student_count: usize,
    pub difficulty_distribution: BTreeMap<String, usize>,
    pub problematic_questions: Vec<ProblematicQuestion>,
    pub improvement_suggestions: Vec<String>,
}

/// Subject roll-up. Questions with fewer than `min_samples` answers are
/// counted but left out of the difficulty distribution.
pub async fn subject_performance(
    store: &AnswerStore,
    subject: &str,
    min_samples: usize,
) -> Result<SubjectPerformance, AnalysisError> {
    require_text("subject", subject)?;
    let answered = store
        .answered_questions(&AnswerFilter::for_subject(subject))
        .await?;
    if answered.is_empty() {
        return Err(AnalysisError::NotFound("Subject not found".to_string()));
    }

    let all_answers: Vec<RawAnswerRecord> = answered.iter().map(|a| a.answer.clone()).collect();
    let overall = aggregate_with_minimum(&all_answers, min_samples);
    let students: HashSet<i64> = all_answers.iter().map(|a| a.student_id).collect();

    let grouped = group_by_question(&answered);
    let question_count = grouped.len();
    let per_question: Vec<(i64, DifficultyAnalysis, PerformanceSummary)> = grouped
        .into_iter()
        .map(|(question_id, (_, answers))| {
            (question_id, aggregate_with_minimum(&answers, min_samples))
        })
        .filter(|(_, summary)| summary.is_sufficient(min_samples))
        .map(|(question_id, summary)| (question_id, score_difficulty(&summary), summary))
        .collect();
    let thin_questions = question_count - per_question.len();
    let analyses: Vec<DifficultyAnalysis> = per_question.iter().map(|(_, a, _)| a.clone()).collect();
    let difficulty_distribution = difficulty_distribution(&analyses)
        .into_iter()
        .map(|(tier, count)| (tier.as_str().to_string(), count))
        .collect();

    let mut improvement_suggestions = Vec::new();
    if !overall.is_sufficient(min_samples) {
        improvement_suggestions.push(insufficient_data_insight(overall.total_attempts, min_samples));
    } else if overall.avg_score_ratio < 0.6 {
        improvement_suggestions.push("Focus on fundamental concepts review".to_string());
    }
    if thin_questions > 0 {
        improvement_suggestions.push(format!(
            "Collect more answers for {thin_questions} question(s) with insufficient data"
        ));
    }
    if question_count < SUBJECT_MIN_QUESTIONS {
        improvement_suggestions.push("Consider adding more practice questions".to_string());
    }

    Ok(SubjectPerformance {
        subject: subject.to_string(),
        total_answers: all_answers.len(),
        avg_score: overall.avg_score_ratio,
        question_count,
        student_count: students.len(),
        difficulty_distribution,
        problematic_questions: identify_problematic_questions(&per_question, LOW_CONFIDENCE),
        improvement_suggestions,
    })
}

/// Question-only rows labelled with the heuristic difficulty tier of each
/// question that has at least `min_attempts` answers.
pub fn difficulty_training_matrix(
    extractor: &TextFeatureExtractor,
    answered: &[AnsweredQuestion],
    min_attempts: usize,
) -> FeatureMatrix {
    let labelled: Vec<(FeatureVector, String)> = group_by_question(answered)
        .into_iter()
        .filter(|(_, (_, answers))| answers.len() >= min_attempts)
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(_, (question, answers))| {
            let tier = score_difficulty(&aggregate(&answers)).calculated_difficulty;
            let features =
                question_features(extractor, &question.question_text, question.question_type);
            (features, tier.as_str().to_string())
        })
        .collect();

    let (vectors, labels): (Vec<FeatureVector>, Vec<String>) = labelled.into_iter().unzip();
    FeatureMatrix::build(&vectors).with_labels(DIFFICULTY_LABEL, labels)
}

/// One question+answer row per answer, with `score_ratio` as the target.
pub fn answer_training_matrix(
    extractor: &TextFeatureExtractor,
    answered: &[AnsweredQuestion],
) -> FeatureMatrix {
    let unique: HashMap<i64, &RawQuestionRecord> = answered
        .iter()
        .map(|a| (a.question.question_id, &a.question))
        .collect();
    let question_rows: HashMap<i64, FeatureVector> = unique
        .into_par_iter()
        .map(|(id, q)| (id, question_features(extractor, &q.question_text, q.question_type)))
        .collect();

    let empty = FeatureVector::new();
    let rows: Vec<FeatureVector> = answered
        .par_iter()
        .map(|item| {
            let question = question_rows
                .get(&item.question.question_id)
                .unwrap_or(&empty);
            answer_row(
                extractor,
                question,
                &item.question.question_text,
                &item.answer.answer_text,
                item.question.correct_answer.as_deref(),
                item.answer.time_taken_seconds,
                Some(item.answer.score_ratio().unwrap_or(0.0)),
            )
        })
        .collect();
    FeatureMatrix::build(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::matrix::SCORE_RATIO;

    fn answered(qid: i64, text: &str, student: i64, score: f64) -> AnsweredQuestion {
        AnsweredQuestion {
            question: RawQuestionRecord {
                question_id: qid,
                question_text: text.to_string(),
                question_type: Some(QuestionType::Essay),
                subject: Some("biology".into()),
                correct_answer: Some("light energy".into()),
                points: Some(10),
            },
            answer: RawAnswerRecord {
                student_id: student,
                question_id: qid,
                answer_text: "plants use light energy".into(),
                score,
                max_score: 10.0,
                time_taken_seconds: 60.0,
                attempt_number: 1,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(250);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 203);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_difficulty_matrix_skips_thin_questions() {
        let mut rows: Vec<AnsweredQuestion> =
            (0..4).map(|s| answered(1, "What is photosynthesis?", s, 9.0)).collect();
        rows.push(answered(2, "Explain osmosis.", 1, 2.0));

        let m = difficulty_training_matrix(&TextFeatureExtractor::default(), &rows, 3);
        assert_eq!(m.n_rows(), 1);
        assert_eq!(m.label_column(DIFFICULTY_LABEL).unwrap(), &["easy".to_string()]);
        assert!(m.column_index("is_essay").is_some());
    }

    #[test]
    fn test_answer_matrix_has_target_and_prefixes() {
        let rows = vec![answered(1, "What is photosynthesis?", 1, 5.0)];
        let m = answer_training_matrix(&TextFeatureExtractor::default(), &rows);
        assert_eq!(m.numeric_column(SCORE_RATIO).unwrap(), vec![0.5]);
        assert!(m.column_index("q_word_count").is_some());
        assert!(m.column_index("a_correct_answer_similarity").is_some());
        assert_eq!(m.numeric_column("time_taken").unwrap(), vec![60.0]);
    }

    #[test]
    fn test_question_set_insights() {
        let mut counts = BTreeMap::new();
        counts.insert("hard".to_string(), 0);
        counts.insert("easy".to_string(), 0);
        counts.insert("medium".to_string(), 0);
        assert_eq!(
            question_set_insights(&[], &counts, None),
            vec!["No questions found with sufficient student data"]
        );
    }

    #[test]
    fn test_rejects_blank_question() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), Default::default());
        let err = analyze_question(
            &TextFeatureExtractor::default(),
            &registry,
            &QuestionAnalysisRequest {
                question_text: "  ".into(),
                question_type: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(_)));
    }
}
