mod db;
mod error;
mod lessons;
mod payments;
mod slug;
mod students;
mod uploads;
mod validation;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lessons::{LessonService, LessonsRepository};
use payments::PaymentService;
use students::StudentsRepository;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        students::create_student,
        students::list_students,
        students::get_student_by_id,
        students::update_student,
        payments::record_payment_handler,
    ),
    components(
        schemas(
            students::Student,
            students::CreateStudentRequest,
            students::UpdateStudentRequest,
            payments::Payment,
            payments::RecordPaymentRequest,
        )
    ),
    tags(
        (name = "students", description = "Student registry and balance endpoints"),
        (name = "payments", description = "Payment recording endpoints")
    ),
    info(
        title = "Tutor CRM API",
        version = "1.0.0",
        description = "Back office for a private tutoring practice: students, lessons, and billing"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    students_repo: StudentsRepository,
    lesson_service: LessonService,
    payment_service: PaymentService,
}

impl AppState {
    fn new(db: PgPool) -> Self {
        let students_repo = StudentsRepository::new(db.clone());
        let lessons_repo = LessonsRepository::new(db.clone());

        Self {
            lesson_service: LessonService::new(db.clone(), lessons_repo, students_repo.clone()),
            payment_service: PaymentService::new(db),
            students_repo,
        }
    }
}

/// Handler for GET /
/// Liveness probe
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool, upload_dir: &str) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let state = AppState::new(db);

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Stored lesson materials and homework files
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .route("/", get(health))
        // Student registry
        .route("/api/students", post(students::create_student))
        .route("/api/students", get(students::list_students))
        .route("/api/students/:id", get(students::get_student_by_id))
        .route("/api/students/:id", patch(students::update_student))
        .route(
            "/api/students/:id/transactions",
            get(students::get_student_transactions),
        )
        .route(
            "/api/students/:id/payments",
            get(students::get_student_payments),
        )
        .route(
            "/api/students/:id/reconcile",
            post(students::reconcile_student),
        )
        // Lesson scheduling and billing
        .route("/api/lessons", post(lessons::create_lessons_handler))
        .route("/api/lessons", get(lessons::get_lessons_handler))
        .route("/api/lessons/:id", get(lessons::get_lesson_by_id_handler))
        .route("/api/lessons/:id", patch(lessons::update_lesson_handler))
        .route(
            "/api/lessons/:id/series",
            patch(lessons::update_series_handler),
        )
        .route(
            "/api/lessons/:id/homeworks",
            post(lessons::create_homeworks_handler),
        )
        .route(
            "/api/lessons/:id/homeworks",
            get(lessons::get_homeworks_handler),
        )
        // Payments
        .route("/api/payments", post(payments::record_payment_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Tutor CRM API - Starting...");

    // Get configuration from environment variables
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

    // Ensure the uploads directory exists before serving it
    std::fs::create_dir_all(&upload_dir).expect("Failed to create uploads directory");

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(db_pool, &upload_dir);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Tutor CRM API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests;
