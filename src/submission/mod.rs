//! Response ingestion and reconciliation.
//!
//! Both entry points are one transaction each: `submit_response` writes a
//! new response plus its whole answer set in a single batch, and
//! `reconcile_response` applies a keyed create/update/delete diff that
//! keeps every surviving answer's identity intact.

use crate::coerce::coerce_numeric;
use crate::error::Error;
use crate::orm::{answers, questions, responses, surveys};
use sea_orm::{entity::*, query::*, ColumnTrait, DatabaseConnection, DbErr, EntityTrait};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// One submitted answer: the question it targets and its raw value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnswerInput {
    pub question_id: i32,
    pub value: String,
}

/// Creates a response and all of its answers.
///
/// The answer set is written with one batched insert, so the store cost is
/// one round trip for the response and one for the answers no matter how
/// many questions the survey has.
pub async fn submit_response(
    db: &DatabaseConnection,
    survey_id: i32,
    user_id: Option<i32>,
    submitted: &[AnswerInput],
) -> Result<responses::Model, Error> {
    surveys::Entity::find_by_id(survey_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;

    let known = survey_question_ids(db, survey_id).await?;
    reject_unknown_questions(&known, submitted)?;

    // question_id is unique within a response; a duplicate in one payload
    // resolves to its last occurrence.
    let submitted = dedup_last_wins(submitted);

    let txn = db.begin().await?;

    let response = responses::ActiveModel {
        survey_id: Set(survey_id),
        user_id: Set(user_id),
        submitted_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let rows: Vec<answers::ActiveModel> = submitted
        .iter()
        .map(|answer| answers::ActiveModel {
            response_id: Set(response.id),
            question_id: Set(answer.question_id),
            value: Set(answer.value.clone()),
            numeric_value: Set(coerce_numeric(&answer.value)),
            ..Default::default()
        })
        .collect();

    if !rows.is_empty() {
        answers::Entity::insert_many(rows).exec(&txn).await?;
    }

    txn.commit().await?;

    log::debug!(
        "response {} submitted for survey {} with {} answers",
        response.id,
        survey_id,
        submitted.len()
    );
    Ok(response)
}

/// The actions one reconciliation will apply.
#[derive(Debug, Default, PartialEq)]
pub struct ReconcilePlan {
    /// (answer id, new raw value). The answer row is updated in place.
    pub update: Vec<(i32, String)>,
    /// (question id, raw value) for questions with no existing answer.
    pub create: Vec<(i32, String)>,
    /// Answer ids whose question is absent from the submission.
    pub delete: Vec<i32>,
}

/// Keyed three-way diff between a response's stored answers and a
/// submitted answer set.
///
/// A question present in both sides becomes an in-place update of the
/// existing row, never a delete-and-recreate, so answer identity survives
/// every edit. Answers for questions the submission no longer covers are
/// deleted: a submission declares the complete new answer set.
pub fn plan_reconcile(existing: &[answers::Model], submitted: &[AnswerInput]) -> ReconcilePlan {
    let submitted = dedup_last_wins(submitted);

    let by_question: HashMap<i32, &answers::Model> =
        existing.iter().map(|a| (a.question_id, a)).collect();

    let mut plan = ReconcilePlan::default();
    let mut covered: HashSet<i32> = HashSet::new();

    for answer in submitted {
        match by_question.get(&answer.question_id) {
            Some(current) => {
                covered.insert(answer.question_id);
                if current.value != answer.value {
                    plan.update.push((current.id, answer.value));
                }
            }
            None => plan.create.push((answer.question_id, answer.value)),
        }
    }

    plan.delete = existing
        .iter()
        .filter(|a| !covered.contains(&a.question_id))
        .map(|a| a.id)
        .collect();

    plan
}

/// Replaces a response's answer set with `submitted`, preserving answer
/// identity for every question that stays answered.
pub async fn reconcile_response(
    db: &DatabaseConnection,
    response_id: i32,
    submitted: &[AnswerInput],
) -> Result<responses::Model, Error> {
    let response = responses::Entity::find_by_id(response_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Response not found"))?;

    let known = survey_question_ids(db, response.survey_id).await?;
    reject_unknown_questions(&known, submitted)?;

    let txn = db.begin().await?;

    let existing = answers::Entity::find()
        .filter(answers::Column::ResponseId.eq(response_id))
        .all(&txn)
        .await?;

    let plan = plan_reconcile(&existing, submitted);

    for (answer_id, value) in &plan.update {
        let row = answers::ActiveModel {
            id: Set(*answer_id),
            value: Set(value.clone()),
            numeric_value: Set(coerce_numeric(value)),
            ..Default::default()
        };
        row.update(&txn).await?;
    }

    if !plan.create.is_empty() {
        let rows: Vec<answers::ActiveModel> = plan
            .create
            .iter()
            .map(|(question_id, value)| answers::ActiveModel {
                response_id: Set(response_id),
                question_id: Set(*question_id),
                value: Set(value.clone()),
                numeric_value: Set(coerce_numeric(value)),
                ..Default::default()
            })
            .collect();
        answers::Entity::insert_many(rows).exec(&txn).await?;
    }

    if !plan.delete.is_empty() {
        answers::Entity::delete_many()
            .filter(answers::Column::Id.is_in(plan.delete.clone()))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(response)
}

/// Deletes a response and its answers.
pub async fn delete_response(db: &DatabaseConnection, response_id: i32) -> Result<(), Error> {
    let response = responses::Entity::find_by_id(response_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Response not found"))?;

    let txn = db.begin().await?;
    answers::Entity::delete_many()
        .filter(answers::Column::ResponseId.eq(response.id))
        .exec(&txn)
        .await?;
    responses::Entity::delete_by_id(response.id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Ids of every question belonging to a survey.
async fn survey_question_ids(
    db: &DatabaseConnection,
    survey_id: i32,
) -> Result<HashSet<i32>, DbErr> {
    Ok(questions::Entity::find()
        .filter(questions::Column::SurveyId.eq(survey_id))
        .all(db)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect())
}

fn reject_unknown_questions(known: &HashSet<i32>, submitted: &[AnswerInput]) -> Result<(), Error> {
    for answer in submitted {
        if !known.contains(&answer.question_id) {
            return Err(Error::Validation(format!(
                "Question {} does not belong to this survey",
                answer.question_id
            )));
        }
    }
    Ok(())
}

/// Collapses duplicate question ids; the later occurrence keeps the slot
/// of the first.
fn dedup_last_wins(submitted: &[AnswerInput]) -> Vec<AnswerInput> {
    let mut slots: HashMap<i32, usize> = HashMap::new();
    let mut out: Vec<AnswerInput> = Vec::with_capacity(submitted.len());

    for answer in submitted {
        match slots.get(&answer.question_id) {
            Some(&idx) => out[idx].value = answer.value.clone(),
            None => {
                slots.insert(answer.question_id, out.len());
                out.push(answer.clone());
            }
        }
    }
    out
}
