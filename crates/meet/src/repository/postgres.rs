use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    CHEST_NUMBER_COUNTER, CounterStore, DepartmentStore, EventStore, ParticipantStore, TeamStore,
};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    ChestNumber, Department, Event, EventParts, Participant, PointSchedule, RosterEntry, Round,
    Team,
};

/// PostgreSQL-backed store. Queries are checked at runtime so the crate builds
/// without a database. Events are stored as one row each with their rounds,
/// admission roster and winners embedded as JSONB, so an event write is a single
/// versioned UPDATE.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    participant_id: Uuid,
    name: String,
    registration_code: String,
    department_id: Uuid,
    cohort: Option<String>,
    semester: Option<i16>,
    gender: String,
    chest_number: i32,
    created_at: NaiveDateTime,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StorageError;

    fn try_from(row: ParticipantRow) -> StorageResult<Self> {
        Ok(Self {
            participant_id: row.participant_id,
            name: row.name,
            registration_code: row.registration_code,
            department_id: row.department_id,
            cohort: row.cohort,
            semester: row.semester,
            gender: row.gender.parse().map_err(StorageError::Corrupt)?,
            chest_number: ChestNumber(row.chest_number),
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    department_id: Uuid,
    name: String,
    code: String,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            department_id: row.department_id,
            name: row.name,
            code: row.code,
        }
    }
}

#[derive(FromRow)]
struct TeamRow {
    team_id: Uuid,
    name: String,
    department_id: Uuid,
    event_id: Uuid,
    members: Vec<Uuid>,
    created_at: NaiveDateTime,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Self {
            team_id: row.team_id,
            name: row.name,
            department_id: row.department_id,
            event_id: row.event_id,
            members: row.members,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    event_id: Uuid,
    name: String,
    discipline: String,
    gender_category: String,
    status: String,
    points_first: Option<i32>,
    points_second: Option<i32>,
    points_third: Option<i32>,
    team_size: Option<i16>,
    rounds: Json<Vec<Round>>,
    current_round_index: i32,
    admission_roster: Json<Vec<RosterEntry>>,
    winners: Json<Vec<RosterEntry>>,
    version: i64,
    created_at: NaiveDateTime,
}

impl TryFrom<EventRow> for Event {
    type Error = StorageError;

    fn try_from(row: EventRow) -> StorageResult<Self> {
        let current_round_index = usize::try_from(row.current_round_index).map_err(|_| {
            StorageError::Corrupt(format!(
                "event {} has a negative round index {}",
                row.event_id, row.current_round_index
            ))
        })?;

        Event::from_parts(EventParts {
            event_id: row.event_id,
            name: row.name,
            discipline: row.discipline.parse().map_err(StorageError::Corrupt)?,
            gender_category: row.gender_category.parse().map_err(StorageError::Corrupt)?,
            points: PointSchedule {
                first: row.points_first,
                second: row.points_second,
                third: row.points_third,
            },
            team_size: row.team_size,
            created_at: row.created_at,
            status: row.status.parse().map_err(StorageError::Corrupt)?,
            rounds: row.rounds.0,
            current_round_index,
            admission_roster: row.admission_roster.0,
            winners: row.winners.0,
            version: row.version,
        })
    }
}

const PARTICIPANT_COLUMNS: &str = "participant_id, name, registration_code, department_id, \
     cohort, semester, gender, chest_number, created_at";

const EVENT_COLUMNS: &str = "event_id, name, discipline, gender_category, status, \
     points_first, points_second, points_third, team_size, rounds, current_round_index, \
     admission_roster, winners, version, created_at";

/// Maps unique-key violations to `ConstraintViolation` naming the constraint.
fn map_insert_error(error: sqlx::Error) -> StorageError {
    let error = StorageError::from(error);
    if !error.is_unique_violation() {
        return error;
    }

    let constraint = match &error {
        StorageError::Database(sqlx::Error::Database(db_err)) => db_err.constraint(),
        _ => None,
    };
    StorageError::ConstraintViolation(constraint.unwrap_or("unique constraint").to_string())
}

#[async_trait]
impl ParticipantStore for PgStore {
    async fn get_participant(&self, id: Uuid) -> StorageResult<Option<Participant>> {
        let row: Option<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE participant_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Participant::try_from).transpose()
    }

    async fn find_participant_by_code(&self, code: &str) -> StorageResult<Option<Participant>> {
        let row: Option<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE registration_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Participant::try_from).transpose()
    }

    async fn list_participants(&self) -> StorageResult<Vec<Participant>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY chest_number"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Participant::try_from).collect()
    }

    async fn insert_participant(&self, participant: &Participant) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO participants (
                participant_id, name, registration_code, department_id,
                cohort, semester, gender, chest_number, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(participant.participant_id)
        .bind(&participant.name)
        .bind(&participant.registration_code)
        .bind(participant.department_id)
        .bind(&participant.cohort)
        .bind(participant.semester)
        .bind(participant.gender.as_str())
        .bind(participant.chest_number.0)
        .bind(participant.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn update_participant(&self, participant: &Participant) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET name = $2,
                department_id = $3,
                cohort = $4,
                semester = $5,
                gender = $6
            WHERE participant_id = $1
            "#,
        )
        .bind(participant.participant_id)
        .bind(&participant.name)
        .bind(participant.department_id)
        .bind(&participant.cohort)
        .bind(participant.semester)
        .bind(participant.gender.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "participant {} no longer exists",
                participant.participant_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl DepartmentStore for PgStore {
    async fn get_department(&self, id: Uuid) -> StorageResult<Option<Department>> {
        let row: Option<DepartmentRow> = sqlx::query_as(
            "SELECT department_id, name, code FROM departments WHERE department_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Department::from))
    }

    async fn list_departments(&self) -> StorageResult<Vec<Department>> {
        let rows: Vec<DepartmentRow> =
            sqlx::query_as("SELECT department_id, name, code FROM departments ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn insert_department(&self, department: &Department) -> StorageResult<()> {
        sqlx::query("INSERT INTO departments (department_id, name, code) VALUES ($1, $2, $3)")
            .bind(department.department_id)
            .bind(&department.name)
            .bind(&department.code)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;

        Ok(())
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn get_team(&self, id: Uuid) -> StorageResult<Option<Team>> {
        let row: Option<TeamRow> = sqlx::query_as(
            r#"
            SELECT team_id, name, department_id, event_id, members, created_at
            FROM teams
            WHERE team_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Team::from))
    }

    async fn list_teams(&self) -> StorageResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            r#"
            SELECT team_id, name, department_id, event_id, members, created_at
            FROM teams
            ORDER BY created_at, team_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn list_teams_for_event(&self, event_id: Uuid) -> StorageResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            r#"
            SELECT team_id, name, department_id, event_id, members, created_at
            FROM teams
            WHERE event_id = $1
            ORDER BY created_at, team_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn insert_team(&self, team: &Team) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (team_id, name, department_id, event_id, members, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(team.team_id)
        .bind(&team.name)
        .bind(team.department_id)
        .bind(team.event_id)
        .bind(team.members.as_slice())
        .bind(team.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn delete_team(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE team_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn get_event(&self, id: Uuid) -> StorageResult<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self) -> StorageResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at, event_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn insert_event(&self, event: &Event) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (
                event_id, name, discipline, gender_category, status,
                points_first, points_second, points_third, team_size,
                rounds, current_round_index, admission_roster, winners, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(event.event_id)
        .bind(&event.name)
        .bind(event.discipline.as_str())
        .bind(event.gender_category.as_str())
        .bind(event.status().as_str())
        .bind(event.points.first)
        .bind(event.points.second)
        .bind(event.points.third)
        .bind(event.team_size)
        .bind(Json(event.rounds()))
        .bind(event.current_round_index() as i32)
        .bind(Json(event.admission_roster()))
        .bind(Json(event.winners()))
        .bind(event.version())
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn save_event(&self, event: &Event) -> StorageResult<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE events
            SET status = $3,
                rounds = $4,
                current_round_index = $5,
                admission_roster = $6,
                winners = $7,
                version = version + 1
            WHERE event_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(event.event_id)
        .bind(event.version())
        .bind(event.status().as_str())
        .bind(Json(event.rounds()))
        .bind(event.current_round_index() as i32)
        .bind(Json(event.admission_roster()))
        .bind(Json(event.winners()))
        .fetch_optional(&self.pool)
        .await?;

        version.ok_or_else(|| {
            StorageError::Conflict(format!(
                "event {} changed since version {}",
                event.event_id,
                event.version()
            ))
        })
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn read_counter(&self, name: &str) -> StorageResult<Option<i64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM counters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn bootstrap_chest_counter(&self, floor: i64) -> StorageResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, value)
            SELECT $1, GREATEST($2::BIGINT, COALESCE(MAX(chest_number), 0)::BIGINT)
            FROM participants
            ON CONFLICT (name)
            DO UPDATE SET value = GREATEST(counters.value, EXCLUDED.value)
            RETURNING value
            "#,
        )
        .bind(CHEST_NUMBER_COUNTER)
        .bind(floor)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    async fn compare_and_advance(
        &self,
        name: &str,
        expected: i64,
        next: i64,
    ) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE counters SET value = $3 WHERE name = $1 AND value = $2")
            .bind(name)
            .bind(expected)
            .bind(next)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
