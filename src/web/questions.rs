//! Question management endpoints, staff only.

use crate::db::get_db_pool;
use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::orm::questions::QuestionType;
use crate::orm::{answers, questions, surveys};
use crate::web::surveys::QuestionView;
use actix_web::{delete, post, web, HttpResponse};
use sea_orm::{entity::*, query::*, ColumnTrait, EntityTrait};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_question).service(delete_question);
}

#[derive(Clone, Deserialize, Validate)]
pub struct QuestionForm {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    pub question_type: String,
    /// Comma-separated labels, meaningful for choice/multiple.
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_page")]
    pub page_number: i32,
    #[serde(default)]
    pub required: bool,
}

fn default_page() -> i32 {
    1
}

impl QuestionForm {
    /// Field bounds plus a strict question-type check.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::Validation(e.to_string()))?;
        if QuestionType::parse(&self.question_type).is_none() {
            return Err(Error::Validation(format!(
                "Unknown question type: {}",
                self.question_type
            )));
        }
        Ok(())
    }

    /// `fallback_order` is used when the payload leaves `order` at zero,
    /// so embedded question lists keep their submission order.
    pub fn to_active_model(&self, survey_id: i32, fallback_order: i32) -> questions::ActiveModel {
        let order = if self.order != 0 { self.order } else { fallback_order };
        questions::ActiveModel {
            survey_id: Set(survey_id),
            text: Set(self.text.clone()),
            question_type: Set(self.question_type.clone()),
            options: Set(self.options.clone()),
            order: Set(order),
            page_number: Set(self.page_number),
            required: Set(self.required),
            ..Default::default()
        }
    }
}

#[post("/surveys/{survey_id}/questions")]
async fn create_question(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<QuestionForm>,
) -> Result<HttpResponse, Error> {
    client.require_staff()?;
    let form = form.into_inner();
    form.check()?;

    let db = get_db_pool();
    let survey = surveys::Entity::find_by_id(path.into_inner())
        .one(db)
        .await?
        .ok_or(Error::NotFound("Survey not found"))?;

    let question = form.to_active_model(survey.id, form.order).insert(db).await?;
    Ok(HttpResponse::Created().json(QuestionView::from(question)))
}

/// Removes a question and every answer referencing it.
#[delete("/questions/{question_id}")]
async fn delete_question(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    client.require_staff()?;
    let db = get_db_pool();

    let question = questions::Entity::find_by_id(path.into_inner())
        .one(db)
        .await?
        .ok_or(Error::NotFound("Question not found"))?;

    let txn = db.begin().await?;
    answers::Entity::delete_many()
        .filter(answers::Column::QuestionId.eq(question.id))
        .exec(&txn)
        .await?;
    questions::Entity::delete_by_id(question.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}
