/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use brightline_api::{app::{self, AppState}, config::Config};
/// use brightline_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let integrations = app::integrations_from_config(&config)?;
/// let state = AppState::new(pool, config, integrations);
/// let app = app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::auth::{optional_auth, require_auth},
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use brightline_shared::{
    intake::IntakeService,
    integrations::{
        crm::{CrmClient, HttpCrmClient, NoopCrmClient},
        notifier::{HttpEmailNotifier, NoopNotifier, Notifier},
        storage::LocalStorage,
        Integrations,
    },
    security::captcha::HttpCaptchaVerifier,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Extra room on top of the upload limit for multipart framing and fields
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Form and upload pipeline
    pub intake: IntakeService,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config, integrations: Integrations) -> Self {
        let intake = IntakeService::new(db.clone(), integrations, config.uploads.max_bytes);
        Self {
            db,
            config: Arc::new(config),
            intake,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// External collaborators
    pub fn integrations(&self) -> &Integrations {
        self.intake.integrations()
    }
}

/// Builds the production collaborators from configuration
///
/// Email is switched off unless both `EMAIL_API_URL` and `NOTIFY_EMAIL_TO` are
/// set, and CRM sync unless `CRM_API_URL` is set. CAPTCHA is never switched
/// off: without a secret every check fails.
pub fn integrations_from_config(config: &Config) -> anyhow::Result<Integrations> {
    let settings = &config.integrations;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()?;

    let captcha = Arc::new(HttpCaptchaVerifier::new(
        client.clone(),
        settings.captcha_secret.clone(),
        settings.captcha_verify_url.clone(),
    ));

    let notifier: Arc<dyn Notifier> = match (&settings.email_api_url, &settings.notify_email_to) {
        (Some(url), Some(to)) => Arc::new(HttpEmailNotifier::new(
            client.clone(),
            url.clone(),
            settings.email_api_key.clone(),
            settings.email_from.clone(),
            to.clone(),
        )),
        _ => {
            info!("Email notifications disabled (EMAIL_API_URL or NOTIFY_EMAIL_TO not set)");
            Arc::new(NoopNotifier)
        }
    };

    let crm: Arc<dyn CrmClient> = match &settings.crm_api_url {
        Some(url) => Arc::new(HttpCrmClient::new(
            client,
            url.clone(),
            settings.crm_api_key.clone(),
        )),
        None => {
            info!("CRM sync disabled (CRM_API_URL not set)");
            Arc::new(NoopCrmClient)
        }
    };

    Ok(Integrations {
        captcha,
        notifier,
        crm,
        storage: Arc::new(LocalStorage::new(config.uploads.dir.clone())),
    })
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                      # Health check (public)
/// └── /v1/
///     ├── /auth/                   # register, login, refresh (public)
///     ├── /users/                  # me, list, update (authenticated)
///     ├── /services/               # read public, write content_editor+
///     ├── /industries/
///     ├── /locations/
///     ├── /case-studies/
///     ├── /impact-stories/
///     ├── /forms/                  # contact, quote, demo (public), submissions (admin)
///     └── /uploads/                # multipart upload, list, get, delete (authenticated)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per route group: required or optional)
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // User routes (require JWT authentication)
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/me", get(routes::users::me))
        .route("/:id", axum::routing::patch(routes::users::update_user))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    // Content routes: anyone can read, editors can write
    let content_routes = Router::new()
        .route(
            "/services",
            get(routes::services::list_services).post(routes::services::create_service),
        )
        .route(
            "/services/:slug",
            get(routes::services::get_service)
                .patch(routes::services::update_service)
                .delete(routes::services::delete_service),
        )
        .route(
            "/industries",
            get(routes::industries::list_industries).post(routes::industries::create_industry),
        )
        .route(
            "/locations",
            get(routes::locations::list_locations).post(routes::locations::create_location),
        )
        .route(
            "/case-studies",
            get(routes::case_studies::list_case_studies)
                .post(routes::case_studies::create_case_study),
        )
        .route(
            "/case-studies/:slug",
            get(routes::case_studies::get_case_study)
                .patch(routes::case_studies::update_case_study)
                .delete(routes::case_studies::delete_case_study),
        )
        .route(
            "/impact-stories",
            get(routes::impact_stories::list_impact_stories)
                .post(routes::impact_stories::create_impact_story),
        )
        .route(
            "/impact-stories/:slug",
            get(routes::impact_stories::get_impact_story)
                .patch(routes::impact_stories::update_impact_story)
                .delete(routes::impact_stories::delete_impact_story),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), optional_auth));

    // Form routes: public submissions (optional auth links the user)
    let form_routes = Router::new()
        .route("/contact", post(routes::forms::submit_contact))
        .route("/quote", post(routes::forms::submit_quote))
        .route("/demo", post(routes::forms::submit_demo))
        .route("/submissions", get(routes::forms::list_submissions))
        .route("/submissions/:id", get(routes::forms::get_submission))
        .layer(axum::middleware::from_fn_with_state(state.clone(), optional_auth));

    // Upload routes (require JWT authentication)
    let upload_routes = Router::new()
        .route(
            "/",
            post(routes::uploads::upload_file)
                .get(routes::uploads::list_uploads)
                .layer(DefaultBodyLimit::max(
                    state.config.uploads.max_bytes + MULTIPART_OVERHEAD_BYTES,
                )),
        )
        .route(
            "/:id",
            get(routes::uploads::get_upload).delete(routes::uploads::delete_upload),
        )
        .route("/:id/analysis", put(routes::uploads::put_analysis))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/forms", form_routes)
        .nest("/uploads", upload_routes)
        .merge(content_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
