//! SeaORM Entity for questions table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub survey_id: i32,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    /// Stored as plain text so rows written by a newer deployment with
    /// additional types still load. See QuestionType::from_str.
    pub question_type: String,
    /// Comma-separated option labels for choice/multiple questions.
    #[sea_orm(column_type = "Text", nullable)]
    pub options: Option<String>,
    pub order: i32,
    pub page_number: i32,
    pub required: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::surveys::Entity",
        from = "Column::SurveyId",
        to = "super::surveys::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Survey,
    #[sea_orm(has_many = "super::answers::Entity")]
    Answers,
}

impl Related<super::surveys::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::answers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The six question kinds the results engine understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Date,
    Star,
    Scale,
    Choice,
    Multiple,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Date => "date",
            QuestionType::Star => "star",
            QuestionType::Scale => "scale",
            QuestionType::Choice => "choice",
            QuestionType::Multiple => "multiple",
        }
    }

    /// Strict parse for inbound payloads.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(QuestionType::Text),
            "date" => Some(QuestionType::Date),
            "star" => Some(QuestionType::Star),
            "scale" => Some(QuestionType::Scale),
            "choice" => Some(QuestionType::Choice),
            "multiple" => Some(QuestionType::Multiple),
            _ => None,
        }
    }

    /// Lenient parse for stored rows. Unrecognized types degrade to `text`
    /// so their answers are never mis-aggregated as numbers or tallies.
    pub fn from_str(value: &str) -> Self {
        Self::parse(value).unwrap_or(QuestionType::Text)
    }

    /// Upper bound of the valid rating range for numeric question kinds.
    pub fn max_rating(self) -> Option<i64> {
        match self {
            QuestionType::Star => Some(5),
            QuestionType::Scale => Some(10),
            _ => None,
        }
    }
}

impl Model {
    pub fn kind(&self) -> QuestionType {
        QuestionType::from_str(&self.question_type)
    }

    /// Declared option labels, trimmed, empties dropped.
    pub fn option_labels(&self) -> Vec<String> {
        match &self.options {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            None => Vec::new(),
        }
    }
}
