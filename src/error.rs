use std::io;

/// Failures that stop the service before (or while) it serves requests.
/// Request-time failures never end up here; see `service::NoteServiceError`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(String),

    #[error("failed to open database")]
    Database(#[source] sqlx::Error),

    #[error("failed to create notes table")]
    Schema(#[source] sqlx::Error),

    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server terminated")]
    Serve(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error;

    #[test]
    fn cause_is_reported_once_through_source() {
        let err = StartupError::Bind {
            addr: "0.0.0.0:8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };

        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:8080");
        assert_eq!(err.source().unwrap().to_string(), "address in use");
    }

    #[test]
    fn database_errors_keep_sqlx_cause() {
        let err = StartupError::Schema(sqlx::Error::PoolClosed);

        assert_eq!(err.to_string(), "failed to create notes table");
        assert!(err.source().is_some());
    }
}
