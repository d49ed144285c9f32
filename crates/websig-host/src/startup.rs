use crate::{
    config::Settings,
    routes::{health, host_page_handler},
    templates::inline_json,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, IntoMakeService},
    serve::Serve,
    Router,
};
use log::{error, info};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{
    net::TcpListener,
    select,
    signal::unix::{signal, SignalKind},
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

/// Lets the signer frame use WebAuthn from a cross-origin context
pub const PERMISSIONS_POLICY: &str =
    "publickey-credentials-get=*, publickey-credentials-create=*, camera=*, display-capture=*";

pub struct Application {
    server: Serve<TcpListener, IntoMakeService<Router>, Router>,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let address = format!("{}:{}", config.host.domain, config.host.port);
        let socket_addr = SocketAddr::from_str(&address)?;
        let pkg_dir = config.host.pkg_dir.clone();
        let app_state = build_app_state(&config)?;
        let server = build_server(socket_addr, app_state, &pkg_dir).await?;
        Ok(Self { server })
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        info!("Starting server...");
        match self.server.with_graceful_shutdown(shutdown_signal()).await {
            Ok(_) => {
                info!("Shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!("Server shutdown error: {}", e);
                Err(anyhow!("Error during server shutdown: {}", e))
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub title: String,
    /// Inline-safe JSON of the embed settings
    pub embed_settings: String,
}

pub fn build_app_state(config: &Settings) -> Result<AppState, anyhow::Error> {
    config.embed.validate()?;
    info!(
        "Embedding {} as {} ({:?})",
        config.embed.remote_origin()?,
        config.embed.app_name,
        config.embed.connect_mode
    );
    let embed_settings = serde_json::to_string(&config.embed)?;
    Ok(AppState {
        title: config.host.title.clone(),
        embed_settings: inline_json(&embed_settings),
    })
}

pub async fn build_server(
    socket_addr: SocketAddr,
    app_state: AppState,
    pkg_dir: &str,
) -> Result<Serve<TcpListener, IntoMakeService<Router>, Router>, anyhow::Error> {
    let listener = TcpListener::bind(socket_addr).await?;

    info!("Setting up service");
    let app = app(app_state, pkg_dir);
    let server = axum::serve(listener, app.into_make_service());
    info!(
        "Service running @: http://{}:{}",
        socket_addr.ip(),
        socket_addr.port()
    );
    Ok(server)
}

pub fn app(app_state: AppState, pkg_dir: &str) -> Router {
    Router::new()
        .route("/", get(host_page_handler))
        .route("/health", get(health))
        .nest_service("/pkg", ServeDir::new(pkg_dir))
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(app_state))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY),
        ))
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_default();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    select! {
        _ = sigint.recv() => info!("Received SIGINT signal"),
        _ = sigterm.recv() => info!("Received SIGTERM signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::to_bytes,
        http::{Request, StatusCode},
    };
    use std::{env, fs, path::PathBuf};
    use tower::ServiceExt;
    use websig_core::EmbedSettings;

    fn test_app(pkg_dir: &str) -> Router {
        let state = build_app_state(&Settings::default()).unwrap();
        app(state, pkg_dir)
    }

    fn pkg_dir() -> PathBuf {
        let dir = env::temp_dir().join(format!("websig-host-pkg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("websig_embed.js"), "export default function init() {}").unwrap();
        dir
    }

    async fn get_path(app: Router, path: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_host_page_renders_settings() {
        let response = get_path(test_app("./missing"), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("permissions-policy").unwrap(),
            PERMISSIONS_POLICY
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains(r#"id="websig-settings""#));
        assert!(page.contains(r#""websigUrl":"https://websig.xyz""#));
        assert!(page.contains(r#""appName":"LiquidRoute""#));
    }

    #[tokio::test]
    async fn test_health_carries_permissions_policy() {
        let response = get_path(test_app("./missing"), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("permissions-policy"));
    }

    #[tokio::test]
    async fn test_pkg_serves_wasm_bundle() {
        let dir = pkg_dir();
        let app = test_app(&dir.to_string_lossy());

        let response = get_path(app.clone(), "/pkg/websig_embed.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("permissions-policy"));

        let missing = get_path(app, "/pkg/nope.wasm").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.headers().contains_key("permissions-policy"));
    }

    #[test]
    fn test_invalid_embed_settings_fail_startup() {
        let settings = Settings {
            embed: EmbedSettings {
                websig_url: String::from("ftp://websig.xyz"),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(build_app_state(&settings).is_err());
    }
}
