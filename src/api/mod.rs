mod handlers;

pub use handlers::{parse_kinds, EndDateResponse, ReorderInput, ValidationReport};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use planner_core::Planner;

pub fn create_router(db: Database) -> Router {
    let api = Router::new()
        // Sprints
        .route(
            "/sprints",
            get(handlers::list_sprints).post(handlers::create_sprint),
        )
        .route(
            "/sprints/{id}",
            get(handlers::get_sprint)
                .put(handlers::update_sprint)
                .delete(handlers::delete_sprint),
        )
        .route("/sprints/{id}/timeline", get(handlers::get_timeline))
        .route("/sprints/{id}/workload", get(handlers::get_workload))
        .route("/sprints/{id}/items", get(handlers::list_sprint_items))
        // Members
        .route(
            "/members",
            get(handlers::list_members).post(handlers::create_member),
        )
        .route(
            "/members/{id}",
            get(handlers::get_member).delete(handlers::delete_member),
        )
        // Work items
        .route("/items", post(handlers::create_item))
        .route("/items/validate", post(handlers::validate_item))
        .route(
            "/items/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/items/{id}/subtasks", get(handlers::list_subtasks))
        .route(
            "/items/{id}/subtasks/initialize",
            post(handlers::initialize_priorities),
        )
        .route("/items/{id}/reorder", post(handlers::reorder_item))
        // Calendar
        .route("/calendar/end-date", get(handlers::end_date))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Planner::new(db))
}
