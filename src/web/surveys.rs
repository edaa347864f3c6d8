//! Survey listing, management and results endpoints.

use crate::db::get_db_pool;
use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::orm::{questions, responses, surveys};
use crate::results;
use crate::web::questions::QuestionForm;
use actix_web::{get, patch, post, web, HttpResponse};
use sea_orm::{entity::*, query::*, ColumnTrait, DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_surveys)
        .service(create_survey)
        .service(view_survey)
        .service(update_survey)
        .service(view_survey_results);
}

#[derive(Serialize)]
pub struct QuestionView {
    pub id: i32,
    pub survey: i32,
    pub text: String,
    pub question_type: String,
    pub options: Option<String>,
    pub order: i32,
    pub page_number: i32,
    pub required: bool,
}

impl From<questions::Model> for QuestionView {
    fn from(q: questions::Model) -> Self {
        QuestionView {
            id: q.id,
            survey: q.survey_id,
            text: q.text,
            question_type: q.question_type,
            options: q.options,
            order: q.order,
            page_number: q.page_number,
            required: q.required,
        }
    }
}

#[derive(Serialize)]
pub struct SurveyView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionView>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
}

/// Embeds each survey's questions with one grouped query.
async fn attach_questions(
    db: &DatabaseConnection,
    survey_list: Vec<surveys::Model>,
) -> Result<Vec<SurveyView>, Error> {
    let survey_ids: Vec<i32> = survey_list.iter().map(|s| s.id).collect();

    let mut by_survey: HashMap<i32, Vec<QuestionView>> = HashMap::new();
    if !survey_ids.is_empty() {
        let rows = questions::Entity::find()
            .filter(questions::Column::SurveyId.is_in(survey_ids))
            .order_by_asc(questions::Column::Order)
            .all(db)
            .await?;
        for question in rows {
            by_survey
                .entry(question.survey_id)
                .or_default()
                .push(question.into());
        }
    }

    Ok(survey_list
        .into_iter()
        .map(|survey| SurveyView {
            id: survey.id,
            title: survey.title,
            description: survey.description,
            questions: by_survey.remove(&survey.id).unwrap_or_default(),
            is_active: survey.is_active,
            created_at: survey.created_at,
        })
        .collect())
}

/// Staff see every survey; students see active surveys they have not yet
/// answered.
#[get("/surveys")]
async fn list_surveys(client: ClientCtx) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();

    let survey_list = if client.is_staff() {
        surveys::Entity::find()
            .order_by_desc(surveys::Column::CreatedAt)
            .all(db)
            .await?
    } else {
        let answered: Vec<i32> = responses::Entity::find()
            .filter(responses::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.survey_id)
            .collect();

        let mut query = surveys::Entity::find()
            .filter(surveys::Column::IsActive.eq(true))
            .order_by_desc(surveys::Column::CreatedAt);
        if !answered.is_empty() {
            query = query.filter(surveys::Column::Id.is_not_in(answered));
        }
        query.all(db).await?
    };

    let views = attach_questions(db, survey_list).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[get("/surveys/{survey_id}")]
async fn view_survey(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    client.require_login()?;
    let db = get_db_pool();

    let survey = surveys::Entity::find_by_id(path.into_inner())
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;

    // Inactive surveys are invisible to students.
    if !survey.is_active && !client.is_staff() {
        return Err(Error::NotFound("Survey not found"));
    }

    let mut views = attach_questions(db, vec![survey]).await?;
    match views.pop() {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(Error::NotFound("Survey not found")),
    }
}

#[derive(Deserialize, Validate)]
pub struct SurveyForm {
    #[validate(length(min = 1, max = 255))]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    questions: Vec<QuestionForm>,
}

fn default_active() -> bool {
    true
}

#[post("/surveys")]
async fn create_survey(
    client: ClientCtx,
    form: web::Json<SurveyForm>,
) -> Result<HttpResponse, Error> {
    client.require_staff()?;
    let form = form.into_inner();
    form.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;
    for question in &form.questions {
        question.check()?;
    }

    let db = get_db_pool();
    let txn = db.begin().await?;

    let survey = surveys::ActiveModel {
        title: Set(form.title),
        description: Set(form.description),
        is_active: Set(form.is_active),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !form.questions.is_empty() {
        let rows: Vec<questions::ActiveModel> = form
            .questions
            .iter()
            .enumerate()
            .map(|(position, q)| q.to_active_model(survey.id, position as i32))
            .collect();
        questions::Entity::insert_many(rows).exec(&txn).await?;
    }

    txn.commit().await?;
    log::info!("survey {} created with {} questions", survey.id, form.questions.len());

    let mut views = attach_questions(db, vec![survey]).await?;
    match views.pop() {
        Some(view) => Ok(HttpResponse::Created().json(view)),
        None => Err(Error::NotFound("Survey not found")),
    }
}

#[derive(Deserialize, Validate)]
pub struct SurveyUpdateForm {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
}

#[patch("/surveys/{survey_id}")]
async fn update_survey(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<SurveyUpdateForm>,
) -> Result<HttpResponse, Error> {
    client.require_staff()?;
    let form = form.into_inner();
    form.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let db = get_db_pool();
    let survey_id = path.into_inner();
    let survey = surveys::Entity::find_by_id(survey_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;

    let mut row: surveys::ActiveModel = survey.into();
    if let Some(title) = form.title {
        row.title = Set(title);
    }
    if let Some(description) = form.description {
        row.description = Set(description);
    }
    if let Some(is_active) = form.is_active {
        row.is_active = Set(is_active);
    }
    row.update(db).await?;

    let survey = surveys::Entity::find_by_id(survey_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;
    let mut views = attach_questions(db, vec![survey]).await?;
    match views.pop() {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(Error::NotFound("Survey not found")),
    }
}

/// Aggregated results, staff only.
#[get("/surveys/{survey_id}/results")]
async fn view_survey_results(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_staff()?;
    let blocks = results::aggregate_survey(get_db_pool(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(blocks))
}
