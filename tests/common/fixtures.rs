//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use pulse::orm::{questions, surveys, users};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a test user with the given role ("student" or "staff").
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: &str,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(format!("{}@test.com", username)),
        role: Set(role.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create an active survey.
pub async fn create_test_survey(
    db: &DatabaseConnection,
    title: &str,
) -> Result<surveys::Model, DbErr> {
    surveys::ActiveModel {
        title: Set(title.to_owned()),
        description: Set(String::new()),
        is_active: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a question on a survey.
pub async fn create_test_question(
    db: &DatabaseConnection,
    survey_id: i32,
    text: &str,
    question_type: &str,
    options: Option<&str>,
    order: i32,
) -> Result<questions::Model, DbErr> {
    questions::ActiveModel {
        survey_id: Set(survey_id),
        text: Set(text.to_owned()),
        question_type: Set(question_type.to_owned()),
        options: Set(options.map(str::to_owned)),
        order: Set(order),
        page_number: Set(1),
        required: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}
