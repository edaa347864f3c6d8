//! Survey results aggregation.
//!
//! One query lists the questions, one scan loads every answer in the
//! survey, and all grouping happens in memory: round trips stay constant
//! regardless of how many responses exist. Aggregation is read-only and a
//! pure function of store contents, so repeated calls with no intervening
//! writes serialize identically.

use crate::coerce::coerce_numeric;
use crate::error::Error;
use crate::orm::questions::QuestionType;
use crate::orm::{answers, questions, surveys};
use sea_orm::{entity::*, query::*, ColumnTrait, DatabaseConnection, EntityTrait};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// How many raw samples a text/date block returns.
const TEXT_SAMPLE_LIMIT: usize = 50;

/// Counter map serializing as a JSON object in insertion order, so option
/// lists keep their declared order and histograms run 1..max.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountMap(Vec<(String, i64)>);

impl CountMap {
    /// A map with every key present at zero.
    pub fn with_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        CountMap(keys.into_iter().map(|key| (key, 0)).collect())
    }

    pub fn increment(&mut self, key: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.0.push((key.to_owned(), 1)),
        }
    }

    pub fn get(&self, key: &str) -> i64 {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CountMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// One per-question result block, shaped for the results endpoint.
#[derive(Debug, PartialEq, Serialize)]
pub struct QuestionResults {
    pub id: i32,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub total: i64,
    pub results: ResultData,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultData {
    /// Most recent raw values, newest first, for text/date questions.
    Samples(Vec<String>),
    /// Per-option tallies for choice/multiple questions.
    Tallies(CountMap),
    /// Mean and integer-bucket histogram for star/scale questions.
    Rating { average: f64, distribution: CountMap },
}

/// Computes the result block of every question in the survey, in question
/// order.
pub async fn aggregate_survey(
    db: &DatabaseConnection,
    survey_id: i32,
) -> Result<Vec<QuestionResults>, Error> {
    surveys::Entity::find_by_id(survey_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;

    let question_list = questions::Entity::find()
        .filter(questions::Column::SurveyId.eq(survey_id))
        .order_by_asc(questions::Column::Order)
        .all(db)
        .await?;

    let question_ids: Vec<i32> = question_list.iter().map(|q| q.id).collect();
    let mut by_question: HashMap<i32, Vec<answers::Model>> = HashMap::new();
    if !question_ids.is_empty() {
        let rows = answers::Entity::find()
            .filter(answers::Column::QuestionId.is_in(question_ids))
            .order_by_asc(answers::Column::Id)
            .all(db)
            .await?;
        for row in rows {
            by_question.entry(row.question_id).or_default().push(row);
        }
    }

    Ok(question_list
        .iter()
        .map(|question| {
            let rows = by_question.remove(&question.id).unwrap_or_default();
            aggregate_question(question, &rows)
        })
        .collect())
}

/// Builds one question's result block from its answers.
///
/// `rows` must be ordered by ascending answer id; `aggregate_survey` loads
/// them that way.
pub fn aggregate_question(
    question: &questions::Model,
    rows: &[answers::Model],
) -> QuestionResults {
    let kind = question.kind();
    let (total, results) = match kind {
        QuestionType::Text | QuestionType::Date => sample_texts(rows),
        QuestionType::Choice => (rows.len() as i64, tally(question, rows, false)),
        QuestionType::Multiple => (rows.len() as i64, tally(question, rows, true)),
        QuestionType::Star | QuestionType::Scale => (
            rows.len() as i64,
            rate(rows, kind.max_rating().unwrap_or(5)),
        ),
    };

    QuestionResults {
        id: question.id,
        text: question.text.clone(),
        question_type: kind,
        total,
        results,
    }
}

/// Newest-first non-empty raw values, capped at TEXT_SAMPLE_LIMIT, with
/// the non-empty count as the total.
fn sample_texts(rows: &[answers::Model]) -> (i64, ResultData) {
    let non_empty: Vec<&str> = rows
        .iter()
        .map(|a| a.value.as_str())
        .filter(|v| !v.trim().is_empty())
        .collect();

    let samples = non_empty
        .iter()
        .rev()
        .take(TEXT_SAMPLE_LIMIT)
        .map(|v| (*v).to_owned())
        .collect();

    (non_empty.len() as i64, ResultData::Samples(samples))
}

/// Occurrence counts per option value.
///
/// Declared options start at zero so unvoted options still appear; values
/// outside the declared list are tallied under their literal text, which
/// covers options renamed or removed after responses came in. A
/// `multiple` answer is comma-split and each selection counts once.
fn tally(question: &questions::Model, rows: &[answers::Model], split: bool) -> ResultData {
    let mut counts = CountMap::with_keys(question.option_labels());

    for row in rows {
        let value = row.value.trim();
        if value.is_empty() {
            continue;
        }
        if split && value.contains(',') {
            for part in value.split(',') {
                let part = part.trim();
                if !part.is_empty() {
                    counts.increment(part);
                }
            }
        } else {
            counts.increment(value);
        }
    }

    ResultData::Tallies(counts)
}

/// Mean (one decimal) and 1..max integer histogram of the numeric
/// answers. Values are truncated toward zero to their bucket; only values
/// inside the valid range count. Zero numeric answers yields average 0
/// over an all-zero histogram, never an error.
fn rate(rows: &[answers::Model], max: i64) -> ResultData {
    let mut distribution = CountMap::with_keys((1..=max).map(|i| i.to_string()));
    let mut sum: i64 = 0;
    let mut valid: i64 = 0;

    for row in rows {
        let value = match row.numeric_value.or_else(|| coerce_numeric(&row.value)) {
            Some(v) => v,
            None => continue,
        };
        let bucket = value.trunc() as i64;
        if (1..=max).contains(&bucket) {
            distribution.increment(&bucket.to_string());
            sum += bucket;
            valid += 1;
        }
    }

    let average = if valid > 0 {
        (sum as f64 / valid as f64 * 10.0).round() / 10.0
    } else {
        0.0
    };

    ResultData::Rating {
        average,
        distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i32, question_type: &str, options: Option<&str>) -> questions::Model {
        questions::Model {
            id,
            survey_id: 1,
            text: format!("Question {}", id),
            question_type: question_type.to_owned(),
            options: options.map(str::to_owned),
            order: id,
            page_number: 1,
            required: false,
        }
    }

    fn answer(id: i32, question_id: i32, value: &str) -> answers::Model {
        answers::Model {
            id,
            response_id: id,
            question_id,
            value: value.to_owned(),
            numeric_value: coerce_numeric(value),
        }
    }

    #[test]
    fn test_star_average_and_distribution() {
        let q = question(1, "star", None);
        let rows = vec![answer(1, 1, "3"), answer(2, 1, "4"), answer(3, 1, "5")];
        let block = aggregate_question(&q, &rows);

        assert_eq!(block.total, 3);
        match block.results {
            ResultData::Rating {
                average,
                distribution,
            } => {
                assert_eq!(average, 4.0);
                assert_eq!(distribution.len(), 5);
                assert_eq!(distribution.get("1"), 0);
                assert_eq!(distribution.get("2"), 0);
                assert_eq!(distribution.get("3"), 1);
                assert_eq!(distribution.get("4"), 1);
                assert_eq!(distribution.get("5"), 1);
            }
            other => panic!("expected rating block, got {:?}", other),
        }
    }

    #[test]
    fn test_star_zero_data_is_well_formed() {
        let q = question(1, "star", None);
        let block = aggregate_question(&q, &[]);

        assert_eq!(block.total, 0);
        match block.results {
            ResultData::Rating {
                average,
                distribution,
            } => {
                assert_eq!(average, 0.0);
                assert!((1..=5).all(|i| distribution.get(&i.to_string()) == 0));
            }
            other => panic!("expected rating block, got {:?}", other),
        }
    }

    #[test]
    fn test_star_ignores_unparseable_and_out_of_range() {
        let q = question(1, "star", None);
        let rows = vec![
            answer(1, 1, "4"),
            answer(2, 1, "not a number"),
            answer(3, 1, "9"),
            answer(4, 1, ""),
        ];
        let block = aggregate_question(&q, &rows);

        // All four answers count toward the total, only the in-range
        // numeric one toward the mean.
        assert_eq!(block.total, 4);
        match block.results {
            ResultData::Rating { average, .. } => assert_eq!(average, 4.0),
            other => panic!("expected rating block, got {:?}", other),
        }
    }

    #[test]
    fn test_scale_uses_ten_buckets_and_decimal_comma() {
        let q = question(1, "scale", None);
        let rows = vec![answer(1, 1, "7,5"), answer(2, 1, "10")];
        let block = aggregate_question(&q, &rows);

        match block.results {
            ResultData::Rating {
                average,
                distribution,
            } => {
                // 7.5 truncates into bucket 7.
                assert_eq!(distribution.len(), 10);
                assert_eq!(distribution.get("7"), 1);
                assert_eq!(distribution.get("10"), 1);
                assert_eq!(average, 8.5);
            }
            other => panic!("expected rating block, got {:?}", other),
        }
    }

    #[test]
    fn test_choice_declared_options_complete() {
        let q = question(1, "choice", Some("A,B,C"));
        let rows = vec![answer(1, 1, "A"), answer(2, 1, "A"), answer(3, 1, "C")];
        let block = aggregate_question(&q, &rows);

        assert_eq!(block.total, 3);
        match block.results {
            ResultData::Tallies(counts) => {
                assert_eq!(counts.get("A"), 2);
                assert_eq!(counts.get("B"), 0);
                assert_eq!(counts.get("C"), 1);
            }
            other => panic!("expected tally block, got {:?}", other),
        }
    }

    #[test]
    fn test_choice_undeclared_value_tallied_literally() {
        let q = question(1, "choice", Some("A,B"));
        let rows = vec![answer(1, 1, "Removed option")];
        let block = aggregate_question(&q, &rows);

        match block.results {
            ResultData::Tallies(counts) => {
                assert_eq!(counts.get("A"), 0);
                assert_eq!(counts.get("B"), 0);
                assert_eq!(counts.get("Removed option"), 1);
            }
            other => panic!("expected tally block, got {:?}", other),
        }
    }

    #[test]
    fn test_choice_empty_options_falls_back_to_observed_values() {
        let q = question(1, "choice", None);
        let rows = vec![answer(1, 1, "Yes"), answer(2, 1, "Yes"), answer(3, 1, "No")];
        let block = aggregate_question(&q, &rows);

        match block.results {
            ResultData::Tallies(counts) => {
                assert_eq!(counts.len(), 2);
                assert_eq!(counts.get("Yes"), 2);
                assert_eq!(counts.get("No"), 1);
            }
            other => panic!("expected tally block, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_splits_and_counts_each_selection() {
        let q = question(1, "multiple", Some("Pop,Rock"));
        let rows = vec![answer(1, 1, "Pop, Rock")];
        let block = aggregate_question(&q, &rows);

        // One answer, two option increments.
        assert_eq!(block.total, 1);
        match block.results {
            ResultData::Tallies(counts) => {
                assert_eq!(counts.get("Pop"), 1);
                assert_eq!(counts.get("Rock"), 1);
            }
            other => panic!("expected tally block, got {:?}", other),
        }
    }

    #[test]
    fn test_text_samples_newest_first_and_capped() {
        let q = question(1, "text", None);
        let rows: Vec<answers::Model> = (1..=60)
            .map(|i| answer(i, 1, &format!("comment {}", i)))
            .collect();
        let block = aggregate_question(&q, &rows);

        assert_eq!(block.total, 60);
        match block.results {
            ResultData::Samples(samples) => {
                assert_eq!(samples.len(), 50);
                assert_eq!(samples[0], "comment 60");
                assert_eq!(samples[49], "comment 11");
            }
            other => panic!("expected sample block, got {:?}", other),
        }
    }

    #[test]
    fn test_text_skips_empty_values() {
        let q = question(1, "text", None);
        let rows = vec![answer(1, 1, "real"), answer(2, 1, ""), answer(3, 1, "   ")];
        let block = aggregate_question(&q, &rows);

        assert_eq!(block.total, 1);
        assert_eq!(
            block.results,
            ResultData::Samples(vec!["real".to_owned()])
        );
    }

    #[test]
    fn test_unknown_type_aggregates_as_text() {
        let q = question(1, "slider", None);
        let rows = vec![answer(1, 1, "anything")];
        let block = aggregate_question(&q, &rows);

        assert_eq!(block.question_type, QuestionType::Text);
        assert_eq!(
            block.results,
            ResultData::Samples(vec!["anything".to_owned()])
        );
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let q = question(1, "star", None);
        let rows = vec![answer(1, 1, "4"), answer(2, 1, "4"), answer(3, 1, "5")];
        let block = aggregate_question(&q, &rows);

        match block.results {
            ResultData::Rating { average, .. } => assert_eq!(average, 4.3),
            other => panic!("expected rating block, got {:?}", other),
        }
    }

    #[test]
    fn test_count_map_serializes_in_insertion_order() {
        let q = question(1, "scale", None);
        let block = aggregate_question(&q, &[]);
        let json = serde_json::to_string(&block.results).expect("serialize");

        assert_eq!(
            json,
            "{\"average\":0.0,\"distribution\":{\"1\":0,\"2\":0,\"3\":0,\"4\":0,\"5\":0,\
             \"6\":0,\"7\":0,\"8\":0,\"9\":0,\"10\":0}}"
        );
    }
}
