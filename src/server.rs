use crate::analysis::TextAnalyzer;
use crate::archive::ArchiveClient;
use crate::completion::GroqClient;
use crate::config::{Config, ConfigError};
use crate::handlers::{
    book_text_analysis, fetch_book_content, fetch_book_metadata, health_check, root, AppState,
    SharedState,
};
use crate::middleware::logging_middleware;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let archive = ArchiveClient::new(&config.base_url)?;
        let completion = GroqClient::from_config(&config)?;
        tracing::info!(model = completion.model(), "Completion client ready");

        let state = Arc::new(AppState {
            archive,
            analyzer: TextAnalyzer::new(Arc::new(completion)),
        });

        let app = create_app(state).layer(cors_layer(&config)?);

        Ok(Self {
            app,
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Gutenberg API listening on {}", self.bind_addr);
        tracing::info!("Book routes available under /api/v1/book");

        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

/// Build the router around already-constructed clients
pub fn create_app(state: SharedState) -> Router {
    let books = Router::new()
        .route("/:book_id", get(fetch_book_content))
        .route("/metadata/:book_id", get(fetch_book_metadata))
        .route("/text-analysis/:book_id", post(book_text_analysis));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1/book", books)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

fn cors_layer(config: &Config) -> Result<CorsLayer, ConfigError> {
    let origins = config
        .allowed_origins()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| ConfigError::Invalid(format!("CORS origin '{}': {}", origin, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn config(origins: &str) -> Config {
        let vars: HashMap<String, String> = [
            ("BASE_URL", "https://www.gutenberg.org"),
            ("GROQ_API_KEY", "gsk_test"),
            ("CORS_ORIGINS", origins),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Config::from_vars(&vars).unwrap()
    }

    fn cors_app(origins: &str) -> Router {
        Router::new()
            .route("/", get(root))
            .layer(cors_layer(&config(origins)).unwrap())
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin() {
        let response = cors_app("http://localhost:3000")
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    }

    #[tokio::test]
    async fn test_preflight_from_unlisted_origin() {
        let response = cors_app("http://localhost:3000")
            .oneshot(preflight("https://evil.example.com"))
            .await
            .unwrap();

        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_simple_request_from_second_listed_origin() {
        let request = Request::builder()
            .uri("/")
            .header(header::ORIGIN, "https://reader.example.com")
            .body(Body::empty())
            .unwrap();

        let response = cors_app("http://localhost:3000,https://reader.example.com")
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://reader.example.com"
        );
    }
}
