#[derive(Debug)]
pub enum FeedError {
    Connection {
        source: std::io::Error,
        address: String,
    },
    NotConnected,
    Cancelled,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Connection { source, address } => {
                write!(f, "Feed connection to {address} failed: {source}")
            }
            FeedError::NotConnected => write!(f, "Feed reader is not connected"),
            FeedError::Cancelled => write!(f, "Feed connection cancelled by shutdown"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Connection { source, .. } => Some(source),
            FeedError::NotConnected | FeedError::Cancelled => None,
        }
    }
}
