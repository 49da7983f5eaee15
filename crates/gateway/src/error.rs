use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response: dispatch failure, timeout, or a request the
    /// client refused to build.
    #[error("{operation} did not reach the snapshot provider: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("snapshot provider returned {status} {error_type}: {message}")]
    Api {
        status: u16,
        error_type: String,
        message: String,
    },
    /// A response arrived but could not be understood.
    #[error("{operation} returned an unreadable response (status {status}): {message}")]
    Response {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("listing snapshots failed on page {page}: {source}")]
    Pagination {
        page: usize,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    pub fn api(status: u16, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}
