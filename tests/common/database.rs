//! Test database setup and management
#![allow(dead_code)]

use pulse::orm::{answers, questions, responses, surveys, users};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema};

/// A fresh private in-memory database with the full schema.
/// Every test gets its own, so tests never conflict.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();

    db.execute(backend.build(&schema.create_table_from_entity(users::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(surveys::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(questions::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(responses::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(answers::Entity)))
        .await?;

    Ok(db)
}
