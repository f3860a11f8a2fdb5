//! HTTP server bootstrap.
//!
//! Migrates the database once at startup, then serves the note router with
//! the configured CORS policy.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::{AddrParseError, SocketAddr};

use axum::http::HeaderValue;
use axum::Router;
use log::info;
use notevault_core::db::{open_db, DbError};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ServerConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server for the note API.
pub struct NoteServer {
    config: ServerConfig,
    router: Router,
}

impl NoteServer {
    /// Prepares the database and builds the router.
    ///
    /// # Errors
    /// - A configured CORS origin is not a valid header value.
    /// - Database cannot be opened or its schema is newer than supported.
    pub fn with_config(config: ServerConfig) -> Result<Self, ServerError> {
        let cors = cors_layer(&config.cors_origins)?;

        // Migrate up front so per-request opens only ever see a current schema.
        drop(open_db(&config.db_path)?);
        info!(
            "event=db_ready module=server status=ok db_path={}",
            config.db_path.display()
        );

        let state = AppState::new(config.db_path.clone());
        let router = create_router(state).layer(cors);
        Ok(Self { config, router })
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds the listener and serves until the process stops.
    pub async fn start(self) -> Result<(), ServerError> {
        let raw_addr = self.config.socket_addr();
        let addr: SocketAddr = raw_addr
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                addr: raw_addr.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr).await?;
        info!("event=server_start module=server status=ok addr={addr}");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Any origin when the list is empty or contains `*`; otherwise exactly the list.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let allow_origin = if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim()).map_err(|_| ServerError::InvalidCorsOrigin {
                    origin: origin.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "event=cors_config module=server status=ok allowed_origins={}",
            parsed.len()
        );
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[derive(Debug)]
pub enum ServerError {
    Database(DbError),
    InvalidAddress {
        addr: String,
        source: AddrParseError,
    },
    InvalidCorsOrigin {
        origin: String,
    },
    Io(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(err) => write!(f, "database bootstrap failed: {err}"),
            Self::InvalidAddress { addr, source } => {
                write!(f, "invalid listen address `{addr}`: {source}")
            }
            Self::InvalidCorsOrigin { origin } => {
                write!(f, "invalid CORS origin `{origin}`")
            }
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            Self::InvalidAddress { source, .. } => Some(source),
            Self::InvalidCorsOrigin { .. } => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        Self::Database(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig {
            db_path: dir.path().join("server.db"),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn server_creation_migrates_database() {
        let dir = tempfile::tempdir().unwrap();
        let server = NoteServer::with_config(temp_config(&dir)).unwrap();
        assert_eq!(server.socket_addr(), "127.0.0.1:8000");
        assert!(dir.path().join("server.db").exists());
    }

    #[test]
    fn unopenable_database_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            db_path: dir.path().join("missing").join("nested").join("server.db"),
            ..ServerConfig::default()
        };
        assert!(matches!(
            NoteServer::with_config(config),
            Err(ServerError::Database(_))
        ));
    }

    #[test]
    fn invalid_cors_origin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://bad\norigin".to_string(),
            ],
            ..temp_config(&dir)
        };
        let err = NoteServer::with_config(config).err().unwrap();
        assert!(matches!(
            err,
            ServerError::InvalidCorsOrigin { ref origin } if origin == "http://bad\norigin"
        ));
        assert!(!dir.path().join("server.db").exists());
    }

    #[tokio::test]
    async fn invalid_host_is_rejected_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..temp_config(&dir)
        };
        let server = NoteServer::with_config(config).unwrap();
        assert!(matches!(
            server.start().await,
            Err(ServerError::InvalidAddress { .. })
        ));
    }
}
