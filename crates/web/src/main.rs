use anyhow::Context;
use meet::{Database, InMemoryStore, Meet};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;

use config::Config;
use middleware::auth::ApiKeys;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::departments::handlers::list_departments,
        features::departments::handlers::get_department,
        features::departments::handlers::create_department,
        features::participants::handlers::list_participants,
        features::participants::handlers::get_participant,
        features::participants::handlers::get_participant_stats,
        features::participants::handlers::get_participant_achievements,
        features::participants::handlers::register_participant,
        features::participants::handlers::update_participant,
        features::teams::handlers::list_teams,
        features::teams::handlers::get_team,
        features::teams::handlers::register_team,
        features::teams::handlers::delete_team,
        features::events::handlers::list_events,
        features::events::handlers::get_event,
        features::events::handlers::get_round,
        features::events::handlers::create_event,
        features::events::handlers::admit_roster,
        features::events::handlers::open_heat,
        features::events::handlers::close_heat,
        features::events::handlers::apply_heat_commands,
        features::events::handlers::record_qualification,
        features::events::handlers::record_rank,
        features::events::handlers::advance_round,
        features::events::handlers::update_current_round,
        features::events::handlers::close_event,
        features::standings::handlers::get_standings,
        features::standings::handlers::get_leaderboard,
    ),
    components(
        schemas(
            meet::dto::department::CreateDepartmentRequest,
            meet::dto::participant::CreateParticipantRequest,
            meet::dto::participant::UpdateParticipantRequest,
            meet::dto::team::CreateTeamRequest,
            meet::dto::team::TeamDetail,
            meet::dto::event::CreateEventRequest,
            meet::dto::event::AdmitRosterRequest,
            meet::dto::event::OpenHeatRequest,
            meet::dto::event::HeatOutcome,
            meet::dto::event::CloseHeatRequest,
            meet::dto::event::HeatCommandsRequest,
            meet::dto::event::RecordQualificationRequest,
            meet::dto::event::QualificationResponse,
            meet::dto::event::RecordRankRequest,
            meet::dto::event::RankResponse,
            meet::dto::event::AdvanceRoundRequest,
            meet::dto::event::UpdateCurrentRoundRequest,
            meet::dto::event::PendingHeat,
            meet::dto::event::CloseEventRequest,
            meet::dto::event::RoundSnapshot,
            meet::dto::standings::MedalTally,
            meet::dto::standings::ParticipantStats,
            meet::dto::standings::DepartmentStats,
            meet::dto::standings::Standings,
            meet::dto::standings::Achievement,
            meet::dto::standings::LeaderboardResponse,
            meet::models::Department,
            meet::models::Participant,
            meet::models::ChestNumber,
            meet::models::Gender,
            meet::models::Team,
            meet::models::Event,
            meet::models::Discipline,
            meet::models::GenderCategory,
            meet::models::EventStatus,
            meet::models::PointSchedule,
            meet::models::Round,
            meet::models::RoundStatus,
            meet::models::RoundParticipant,
            meet::models::RosterEntry,
            meet::models::Rank,
            meet::models::Medal,
            meet::models::HeatCommand,
        )
    ),
    tags(
        (name = "departments", description = "Department endpoints"),
        (name = "participants", description = "Registration and participant endpoints"),
        (name = "teams", description = "Team registration for group events"),
        (name = "events", description = "Events, rounds and heats"),
        (name = "standings", description = "Recomputed points and medal standings"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting meet API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let meet = match &config.database_url {
        Some(database_url) => {
            tracing::info!(
                "Connecting to database at: {}",
                database_url.split('@').next_back().unwrap_or("unknown")
            );
            let db = Database::new(database_url)
                .await
                .context("Failed to initialize database")?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations");
            db.run_migrations()
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Database migrations completed successfully");

            Meet::new(db.store(), config.engine.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data will be kept in memory only");
            Meet::new(InMemoryStore::new(), config.engine.clone())
        }
    };

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, every write route will answer 401");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = features::router(meet, api_keys)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(ServiceBuilder::new().layer(cors));

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}
