use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::handlers::{beers, bottles, breweries, health, login, pictures, ratings, users};
use crate::state::AppState;

/// Builds the full router. Layers apply to every route.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    let router = Router::new()
        .route("/health", get(health::health_get))
        .route("/login", post(login::login_post))
        .merge(user_routes())
        .merge(catalog_routes())
        .merge(possession_routes())
        .layer(layers);

    match cors_layer(&config.security) {
        Some(cors) => router.layer(cors).with_state(state),
        None => router.with_state(state),
    }
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::users_get).post(users::users_post))
        // GET takes a username, PUT and DELETE take the user id
        .route(
            "/users/:key",
            get(users::user_get).put(users::user_put).delete(users::user_delete),
        )
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/breweries", get(breweries::breweries_get).post(breweries::breweries_post))
        .route("/breweries/:name", get(breweries::brewery_get))
        .route("/beers", get(beers::beers_get).post(beers::beers_post))
        .route("/beers/:brewery/:name/:abv", get(beers::beer_get))
}

fn possession_routes() -> Router<AppState> {
    Router::new()
        .route("/bottles", get(bottles::bottles_get).post(bottles::bottles_post))
        .route("/bottles/:id", put(bottles::bottle_put).delete(bottles::bottle_delete))
        .route("/ratings", get(ratings::ratings_get).post(ratings::ratings_post))
        .route("/pictures", get(pictures::pictures_get).post(pictures::pictures_post))
        .route("/pictures/:id", get(pictures::picture_get))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
