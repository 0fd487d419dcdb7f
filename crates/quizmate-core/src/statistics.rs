//! Accuracy, timing, and per-topic statistics over committed answers.
//!
//! Every function here is a pure read of an answer list. The session calls
//! them once at completion; callers may call them again on the same list and
//! get the same numbers back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::Answer;

/// Accuracy below this fraction marks a topic as weak (strictly below).
pub const WEAK_TOPIC_THRESHOLD: f64 = 0.6;

/// Correct/total counts for one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStat {
    pub correct: u32,
    pub total: u32,
}

impl TopicStat {
    /// Accuracy as a fraction in `[0, 1]`; 0 when nothing was answered.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// `correct / total <` [`WEAK_TOPIC_THRESHOLD`], decided in integer
    /// arithmetic (`5 * correct < 3 * total`) so a topic at exactly 60% is
    /// never weak.
    pub fn is_weak(&self) -> bool {
        self.total > 0 && 5 * u64::from(self.correct) < 3 * u64::from(self.total)
    }
}

/// One row of the topic performance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
}

impl TopicPerformance {
    pub fn stat(&self) -> TopicStat {
        TopicStat {
            correct: self.correct,
            total: self.total,
        }
    }
}

/// `round(100 * correct / total)` with halves rounded up; 0 when `total == 0`.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (c, t) = (u64::from(correct), u64::from(total));
    ((200 * c + t) / (2 * t)) as u32
}

/// Percentage of answers marked correct.
pub fn compute_accuracy(answers: &[Answer]) -> u32 {
    let correct = answers.iter().filter(|a| a.is_correct).count() as u32;
    percentage(correct, answers.len() as u32)
}

/// Sum of per-answer time in seconds. Negative readings count as zero.
pub fn compute_total_time(answers: &[Answer]) -> f64 {
    answers.iter().map(|a| a.time_taken_secs.max(0.0)).sum()
}

/// Mean seconds per answered question; 0 when nothing was answered.
pub fn compute_average_time(answers: &[Answer]) -> f64 {
    if answers.is_empty() {
        0.0
    } else {
        compute_total_time(answers) / answers.len() as f64
    }
}

/// Group answers by topic in first-seen order.
pub fn compute_topic_performance(answers: &[Answer]) -> Vec<TopicPerformance> {
    let mut rows: Vec<TopicPerformance> = Vec::new();
    for answer in answers {
        let row = match rows.iter().position(|r| r.topic == answer.topic) {
            Some(pos) => &mut rows[pos],
            None => {
                rows.push(TopicPerformance {
                    topic: answer.topic.clone(),
                    correct: 0,
                    total: 0,
                });
                let last = rows.len() - 1;
                &mut rows[last]
            }
        };
        row.total += 1;
        if answer.is_correct {
            row.correct += 1;
        }
    }
    rows
}

/// Topics below the weak threshold, in topic performance order.
pub fn compute_weak_topics(answers: &[Answer]) -> Vec<String> {
    weak_topics(&compute_topic_performance(answers))
}

/// Weak topics from an already computed performance table.
pub fn weak_topics(performance: &[TopicPerformance]) -> Vec<String> {
    performance
        .iter()
        .filter(|row| row.stat().is_weak())
        .map(|row| row.topic.clone())
        .collect()
}

/// Topic stats keyed by topic, the shape the recommendation service expects.
pub fn questions_by_topic(performance: &[TopicPerformance]) -> BTreeMap<String, TopicStat> {
    performance
        .iter()
        .map(|row| (row.topic.clone(), row.stat()))
        .collect()
}

/// Everything the completion summary reports, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub accuracy: u32,
    pub correct_count: u32,
    pub total_answered: u32,
    pub total_time_secs: f64,
    pub average_time_secs: f64,
    pub topic_performance: Vec<TopicPerformance>,
    pub weak_topics: Vec<String>,
}

pub fn compute_session_stats(answers: &[Answer]) -> SessionStats {
    let topic_performance = compute_topic_performance(answers);
    let weak_topics = weak_topics(&topic_performance);

    SessionStats {
        accuracy: compute_accuracy(answers),
        correct_count: answers.iter().filter(|a| a.is_correct).count() as u32,
        total_answered: answers.len() as u32,
        total_time_secs: compute_total_time(answers),
        average_time_secs: compute_average_time(answers),
        topic_performance,
        weak_topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::AnswerValue;
    use crate::model::QuestionType;

    fn answer(index: usize, topic: &str, correct: bool, secs: f64) -> Answer {
        Answer {
            question_index: index,
            question_type: QuestionType::TrueFalse,
            user_answer: AnswerValue::Boolean(true),
            is_correct: correct,
            time_taken_secs: secs,
            topic: topic.into(),
        }
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn accuracy_of_empty_list_is_zero() {
        assert_eq!(compute_accuracy(&[]), 0);
        assert_eq!(compute_average_time(&[]), 0.0);
    }

    #[test]
    fn total_time_clamps_negative_readings() {
        let answers = vec![
            answer(0, "A", true, 4.5),
            answer(1, "A", true, -3.0),
            answer(2, "A", false, 1.5),
        ];
        assert!((compute_total_time(&answers) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn topic_performance_keeps_first_seen_order() {
        let answers = vec![
            answer(0, "Zoology", true, 1.0),
            answer(1, "Botany", false, 1.0),
            answer(2, "Zoology", false, 1.0),
            answer(3, "Algae", true, 1.0),
        ];
        let rows = compute_topic_performance(&answers);
        let topics: Vec<_> = rows.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["Zoology", "Botany", "Algae"]);
        assert_eq!(rows[0].stat(), TopicStat { correct: 1, total: 2 });

        let total: u32 = rows.iter().map(|r| r.total).sum();
        assert_eq!(total as usize, answers.len());
    }

    #[test]
    fn exactly_sixty_percent_is_not_weak() {
        let mut answers = Vec::new();
        for i in 0..5 {
            answers.push(answer(i, "Edge", i < 3, 1.0)); // 3/5
        }
        for i in 5..10 {
            answers.push(answer(i, "Below", i < 7, 1.0)); // 2/5
        }
        assert_eq!(compute_weak_topics(&answers), vec!["Below".to_string()]);
    }

    #[test]
    fn weak_threshold_matches_fraction() {
        for total in 1..=20u32 {
            for correct in 0..=total {
                let stat = TopicStat { correct, total };
                assert_eq!(
                    stat.is_weak(),
                    (correct as f64 / total as f64) < WEAK_TOPIC_THRESHOLD,
                    "{correct}/{total}"
                );
            }
        }
    }

    #[test]
    fn session_stats_are_reproducible() {
        let answers = vec![
            answer(0, "A", true, 2.0),
            answer(1, "B", false, 3.0),
            answer(2, "A", true, 1.0),
        ];
        let first = compute_session_stats(&answers);
        let second = compute_session_stats(&answers);
        assert_eq!(first, second);
        assert_eq!(first.accuracy, 67);
        assert_eq!(first.correct_count, 2);
        assert_eq!(first.weak_topics, vec!["B".to_string()]);
        assert!((first.average_time_secs - 2.0).abs() < f64::EPSILON);

        let by_topic = questions_by_topic(&first.topic_performance);
        assert_eq!(by_topic["A"], TopicStat { correct: 2, total: 2 });
    }
}
