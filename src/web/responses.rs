//! Response submission and editing endpoints.

use crate::db::get_db_pool;
use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::orm::{answers, responses};
use crate::submission::{self, AnswerInput};
use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::{entity::*, query::*, ColumnTrait, DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_response)
        .service(list_responses)
        .service(view_response)
        .service(update_response)
        .service(delete_response);
}

#[derive(Serialize)]
struct AnswerView {
    question_id: i32,
    value: String,
}

#[derive(Serialize)]
struct ResponseView {
    id: i32,
    survey_id: i32,
    user_id: Option<i32>,
    submitted_at: chrono::NaiveDateTime,
    answers: Vec<AnswerView>,
}

/// Builds views for a batch of responses with one grouped answers query.
async fn response_views(
    db: &DatabaseConnection,
    response_list: Vec<responses::Model>,
) -> Result<Vec<ResponseView>, Error> {
    let ids: Vec<i32> = response_list.iter().map(|r| r.id).collect();

    let mut by_response: HashMap<i32, Vec<AnswerView>> = HashMap::new();
    if !ids.is_empty() {
        let rows = answers::Entity::find()
            .filter(answers::Column::ResponseId.is_in(ids))
            .order_by_asc(answers::Column::Id)
            .all(db)
            .await?;
        for row in rows {
            by_response.entry(row.response_id).or_default().push(AnswerView {
                question_id: row.question_id,
                value: row.value,
            });
        }
    }

    Ok(response_list
        .into_iter()
        .map(|response| ResponseView {
            id: response.id,
            survey_id: response.survey_id,
            user_id: response.user_id,
            submitted_at: response.submitted_at,
            answers: by_response.remove(&response.id).unwrap_or_default(),
        })
        .collect())
}

async fn response_view(
    db: &DatabaseConnection,
    response: responses::Model,
) -> Result<ResponseView, Error> {
    let mut views = response_views(db, vec![response]).await?;
    views.pop().ok_or(Error::NotFound("Response not found"))
}

#[derive(Deserialize)]
struct SubmitForm {
    survey_id: i32,
    answers: Vec<AnswerInput>,
}

#[post("/responses")]
async fn create_response(
    client: ClientCtx,
    form: web::Json<SubmitForm>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();

    let response =
        submission::submit_response(db, form.survey_id, Some(user_id), &form.answers).await?;
    Ok(HttpResponse::Created().json(response_view(db, response).await?))
}

/// Own responses; staff see everyone's.
#[get("/responses")]
async fn list_responses(client: ClientCtx) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();

    let mut query = responses::Entity::find().order_by_desc(responses::Column::Id);
    if !client.is_staff() {
        query = query.filter(responses::Column::UserId.eq(user_id));
    }
    let response_list = query.all(db).await?;

    Ok(HttpResponse::Ok().json(response_views(db, response_list).await?))
}

#[get("/responses/{response_id}")]
async fn view_response(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let response = responses::Entity::find_by_id(path.into_inner())
        .one(db)
        .await?
        .ok_or(Error::NotFound("Response not found"))?;

    client.require_owner_or_staff(response.user_id)?;
    Ok(HttpResponse::Ok().json(response_view(db, response).await?))
}

#[derive(Deserialize)]
struct EditForm {
    answers: Vec<AnswerInput>,
}

/// Full-replacement edit: the payload declares the complete new answer
/// set. Owner or staff.
#[put("/responses/{response_id}")]
async fn update_response(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<EditForm>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let response_id = path.into_inner();

    let response = responses::Entity::find_by_id(response_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Response not found"))?;
    client.require_owner_or_staff(response.user_id)?;

    let response = submission::reconcile_response(db, response_id, &form.answers).await?;
    Ok(HttpResponse::Ok().json(response_view(db, response).await?))
}

#[delete("/responses/{response_id}")]
async fn delete_response(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let response_id = path.into_inner();

    let response = responses::Entity::find_by_id(response_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("Response not found"))?;
    client.require_owner_or_staff(response.user_id)?;

    submission::delete_response(db, response_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
