use genoflow_core::{ErrorMetadata, LogLevel};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("bus is closed")]
    Closed,

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("queue {0} already has a consumer")]
    AlreadyConsumed(String),

    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type BusResult<T> = Result<T, BusError>;

impl ErrorMetadata for BusError {
    fn http_status_code(&self) -> u16 {
        503
    }

    fn error_code(&self) -> &'static str {
        match self {
            BusError::Amqp(_) => "BUS_ERROR",
            BusError::Closed => "BUS_CLOSED",
            BusError::UnknownExchange(_) | BusError::UnknownQueue(_) => "BUS_TOPOLOGY_ERROR",
            BusError::AlreadyConsumed(_) => "BUS_CONSUMER_CONFLICT",
            BusError::Encode(_) => "BUS_ENCODE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, BusError::Amqp(_))
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            BusError::Closed => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
