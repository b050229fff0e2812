// PostgreSQL-backed room store.

use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    Answer, AnswerAction, AnswerId, CategoryId, JoinRequest, JoinRequestId, JoinRequestStatus,
    Question, QuestionId, Room, RoomId, RoomStatus, RoomStore, StoreError, UserId,
};
use crate::interface_adapters::question_bank::QuestionBank;

#[derive(Clone)]
pub struct PostgresStore {
    pub db: PgPool,
}

const ROOM_COLUMNS: &str = "id, owner_id, guest_id, status, guest_ready, selected_categories, \
     current_turn, current_question, current_question_ordinal, max_questions, language";

const REQUEST_COLUMNS: &str = "id, room_id, requester_id, message, status, created_at, updated_at";

impl PostgresStore {
    // Upsert the bank so draws see every configured category.
    pub async fn seed_questions(&self, bank: &QuestionBank) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        for category in &bank.categories {
            sqlx::query(
                r#"
                INSERT INTO categories (id, name)
                VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(category.id)
            .bind(&category.name)
            .execute(&mut *tx)
            .await?;

            for question in &category.questions {
                sqlx::query(
                    r#"
                    INSERT INTO questions (id, category_id, text)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (id) DO UPDATE SET
                        category_id = EXCLUDED.category_id,
                        text = EXCLUDED.text
                    "#,
                )
                .bind(question.id)
                .bind(category.id)
                .bind(&question.text)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_room<'e, E>(executor: E, room: &Room) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    let categories: Vec<i64> = room.selected_categories.iter().map(|id| id.0).collect();
    sqlx::query(
        r#"
        INSERT INTO rooms (
            id, owner_id, guest_id, status, guest_ready, selected_categories,
            current_turn, current_question, current_question_ordinal, max_questions, language
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            guest_id = EXCLUDED.guest_id,
            status = EXCLUDED.status,
            guest_ready = EXCLUDED.guest_ready,
            selected_categories = EXCLUDED.selected_categories,
            current_turn = EXCLUDED.current_turn,
            current_question = EXCLUDED.current_question,
            current_question_ordinal = EXCLUDED.current_question_ordinal
        "#,
    )
    .bind(room.id.0)
    .bind(room.owner_id.0)
    .bind(room.guest_id.map(|id| id.0))
    .bind(room.status.as_str())
    .bind(room.guest_ready)
    .bind(categories)
    .bind(room.current_turn.map(|id| id.0))
    .bind(room.current_question.map(|id| id.0))
    .bind(to_i32(room.current_question_ordinal))
    .bind(to_i32(room.max_questions))
    .bind(&room.language)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_answer<'e, E>(executor: E, answer: &Answer) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO answers (id, room_id, question_id, author_id, text, action)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(answer.id.0)
    .bind(answer.room_id.0)
    .bind(answer.question_id.0)
    .bind(answer.author_id.0)
    .bind(&answer.text)
    .bind(answer.action.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_request<'e, E>(executor: E, request: &JoinRequest) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO join_requests (id, room_id, requester_id, message, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            message = EXCLUDED.message,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(request.id.0)
    .bind(request.room_id.0)
    .bind(request.requester_id.0)
    .bind(request.message.as_deref())
    .bind(request.status.as_str())
    .bind(to_i64(request.created_at))
    .bind(to_i64(request.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl RoomStore for PostgresStore {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.db)
            .await?;
        row.map(|row| room_from_row(&row)).transpose()
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        upsert_room(&self.db, room).await
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        // Requests and answers cascade.
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id.0)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_join_requests(
        &self,
        room_id: RoomId,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM join_requests \
             WHERE room_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at, id"
        ))
        .bind(room_id.0)
        .bind(status.map(|status| status.as_str()))
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(request_from_row).collect()
    }

    async fn get_join_request(&self, id: JoinRequestId) -> Result<Option<JoinRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM join_requests WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;
        row.map(|row| request_from_row(&row)).transpose()
    }

    async fn save_join_request(&self, request: &JoinRequest) -> Result<(), StoreError> {
        upsert_request(&self.db, request).await
    }

    async fn commit_acceptance(&self, room: &Room, request: &JoinRequest) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        upsert_room(&mut *tx, room).await?;
        upsert_request(&mut *tx, request).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_answer(&self, room: &Room, answer: &Answer) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        insert_answer(&mut *tx, answer).await?;
        upsert_room(&mut *tx, room).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn answers_for_room(&self, room_id: RoomId) -> Result<Vec<Answer>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, room_id, question_id, author_id, text, action
            FROM answers
            WHERE room_id = $1
            ORDER BY seq
            "#,
        )
        .bind(room_id.0)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(answer_from_row).collect()
    }

    async fn pick_random_question(
        &self,
        categories: &[CategoryId],
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StoreError> {
        let categories: Vec<i64> = categories.iter().map(|id| id.0).collect();
        let exclude: Vec<i64> = exclude.iter().map(|id| id.0).collect();
        let row = sqlx::query(
            r#"
            SELECT id, category_id, text
            FROM questions
            WHERE category_id = ANY($1) AND NOT (id = ANY($2))
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .bind(categories)
        .bind(exclude)
        .fetch_optional(&self.db)
        .await?;
        row.map(|row| question_from_row(&row)).transpose()
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        let row = sqlx::query("SELECT id, category_id, text FROM questions WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await?;
        row.map(|row| question_from_row(&row)).transpose()
    }
}

fn room_from_row(row: &PgRow) -> Result<Room, StoreError> {
    let status: String = row.try_get("status")?;
    let categories: Vec<i64> = row.try_get("selected_categories")?;
    Ok(Room {
        id: RoomId(row.try_get::<Uuid, _>("id")?),
        owner_id: UserId(row.try_get("owner_id")?),
        guest_id: row.try_get::<Option<i64>, _>("guest_id")?.map(UserId),
        status: RoomStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown room status {status}")))?,
        guest_ready: row.try_get("guest_ready")?,
        selected_categories: categories.into_iter().map(CategoryId).collect(),
        current_turn: row.try_get::<Option<i64>, _>("current_turn")?.map(UserId),
        current_question: row
            .try_get::<Option<i64>, _>("current_question")?
            .map(QuestionId),
        current_question_ordinal: to_u32(row.try_get("current_question_ordinal")?)?,
        max_questions: to_u32(row.try_get("max_questions")?)?,
        language: row.try_get("language")?,
    })
}

fn request_from_row(row: &PgRow) -> Result<JoinRequest, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(JoinRequest {
        id: JoinRequestId(row.try_get::<Uuid, _>("id")?),
        room_id: RoomId(row.try_get::<Uuid, _>("room_id")?),
        requester_id: UserId(row.try_get("requester_id")?),
        message: row.try_get("message")?,
        status: JoinRequestStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown request status {status}")))?,
        created_at: to_u64(row.try_get("created_at")?)?,
        updated_at: to_u64(row.try_get("updated_at")?)?,
    })
}

fn answer_from_row(row: &PgRow) -> Result<Answer, StoreError> {
    let action: String = row.try_get("action")?;
    Ok(Answer {
        id: AnswerId(row.try_get::<Uuid, _>("id")?),
        room_id: RoomId(row.try_get::<Uuid, _>("room_id")?),
        question_id: QuestionId(row.try_get("question_id")?),
        author_id: UserId(row.try_get("author_id")?),
        text: row.try_get("text")?,
        action: AnswerAction::parse(&action)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown answer action {action}")))?,
    })
}

fn question_from_row(row: &PgRow) -> Result<Question, StoreError> {
    Ok(Question {
        id: QuestionId(row.try_get("id")?),
        category_id: CategoryId(row.try_get("category_id")?),
        text: row.try_get("text")?,
    })
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u32(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative counter {value}")))
}

fn to_u64(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative timestamp {value}")))
}
