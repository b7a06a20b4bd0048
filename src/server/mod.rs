//! HTTP surface: a health check and the authenticated question-answering endpoint.

mod handlers;
mod router;

pub use handlers::{AnswerRequest, AnswerResponse, ErrorResponse};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::pipeline::Pipeline;
use crate::{RagError, Result};

pub const RUN_PATH: &str = "/api/v1/hackrx/run";

#[derive(Clone)]
pub(crate) struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub started_at: Instant,
}

pub struct DocServer {
    addr: SocketAddr,
    team_token: String,
    max_body_size: usize,
    pipeline: Arc<Pipeline>,
}

impl DocServer {
    /// Prepare a server for `pipeline`. Fails when no team token is configured
    /// or the bind address is invalid.
    #[inline]
    pub fn new(config: &ServerConfig, pipeline: Arc<Pipeline>) -> Result<Self> {
        let team_token = config
            .team_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                RagError::Config(format!(
                    "no team token configured; set server.team_token or {}",
                    crate::config::TEAM_TOKEN_ENV
                ))
            })?;

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                RagError::Config(format!(
                    "invalid bind address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        if config.host == "0.0.0.0" {
            warn!("Server binding to 0.0.0.0; the endpoint is reachable from other hosts");
        }

        Ok(Self {
            addr,
            team_token,
            max_body_size: config.max_body_bytes,
            pipeline,
        })
    }

    #[inline]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[inline]
    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: Arc::clone(&self.pipeline),
            started_at: Instant::now(),
        };
        router::build_router(state, self.team_token.clone(), self.max_body_size)
    }

    /// Serve until Ctrl-C
    #[inline]
    pub async fn serve(self) -> Result<()> {
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RagError::Server(format!("failed to bind {}: {e}", self.addr)))?;
        info!("Server listening on http://{}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
                info!("Server shutting down");
            })
            .await
            .map_err(|e| RagError::Server(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::DocumentFetcher;
    use crate::mock::{MockEmbedder, MockGenerator};
    use crate::pipeline::PipelineConfig;

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(
            Pipeline::new(
                PipelineConfig::default(),
                Arc::new(MockEmbedder::new(&["grace"])),
                Arc::new(MockGenerator::replying("ok")),
                DocumentFetcher::default(),
            )
            .expect("pipeline should build"),
        )
    }

    #[test]
    fn refuses_to_start_without_token() {
        for token in [None, Some(String::new()), Some("   ".to_string())] {
            let config = ServerConfig {
                team_token: token,
                ..ServerConfig::default()
            };
            assert!(matches!(
                DocServer::new(&config, pipeline()),
                Err(RagError::Config(_))
            ));
        }
    }

    #[test]
    fn server_configuration() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9090,
            team_token: Some("secret".to_string()),
            max_body_bytes: 512,
        };
        let server = DocServer::new(&config, pipeline()).expect("server should build");

        assert_eq!(server.addr().port(), 9090);
        assert_eq!(server.max_body_size, 512);
        assert_eq!(server.team_token, "secret");
    }

    #[test]
    fn invalid_bind_address() {
        let config = ServerConfig {
            host: "not_an_ip".to_string(),
            team_token: Some("secret".to_string()),
            ..ServerConfig::default()
        };
        assert!(matches!(
            DocServer::new(&config, pipeline()),
            Err(RagError::Config(_))
        ));
    }
}
