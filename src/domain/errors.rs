use thiserror::Error;

/// Binance error codes the bot reacts to
pub const CODE_RECV_WINDOW_EXPIRED: i64 = -1021;
pub const CODE_CANCEL_REJECTED: i64 = -2011;
pub const CODE_NO_SUCH_ORDER: i64 = -2013;

/// Errors surfaced by the controller's operations
#[derive(Debug, Error)]
pub enum BotError {
    /// A required collaborator or setting is missing; the bot cannot start
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid input to an operation; that operation is aborted
    #[error("validation error: {0}")]
    Validation(String),

    /// The exchange or the network failed; the cycle moves on
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Failures reported by a gateway or a feed
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("exchange rejected request (http {status}, code {code}): {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("failed to decode exchange response: {0}")]
    Decode(String),

    #[error("network client already released")]
    ClientReleased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeErrorKind {
    /// The order is gone already (filled or cancelled elsewhere)
    UnknownOrder,
    RecvWindowExpired,
    RateLimited,
    Rejected,
    Transport,
    ClientReleased,
}

impl ExchangeError {
    pub fn kind(&self) -> ExchangeErrorKind {
        match self {
            ExchangeError::Api { status, .. } if *status == 429 || *status == 418 => {
                ExchangeErrorKind::RateLimited
            }
            ExchangeError::Api { code, .. } => match *code {
                CODE_CANCEL_REJECTED | CODE_NO_SUCH_ORDER => ExchangeErrorKind::UnknownOrder,
                CODE_RECV_WINDOW_EXPIRED => ExchangeErrorKind::RecvWindowExpired,
                _ => ExchangeErrorKind::Rejected,
            },
            ExchangeError::Transport(_) | ExchangeError::Decode(_) => ExchangeErrorKind::Transport,
            ExchangeError::ClientReleased => ExchangeErrorKind::ClientReleased,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExchangeError::Decode(e.to_string())
        } else {
            ExchangeError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        ExchangeError::Decode(e.to_string())
    }
}

impl From<tungstenite::Error> for ExchangeError {
    fn from(e: tungstenite::Error) -> Self {
        ExchangeError::Transport(e.to_string())
    }
}
