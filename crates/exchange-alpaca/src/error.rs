//! Alpaca client error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlpacaError {
    #[error("missing Alpaca credentials: set APCA_API_KEY_ID and APCA_API_SECRET_KEY")]
    MissingCredentials,

    #[error("Alpaca API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("market is closed, order for {symbol} not submitted")]
    MarketClosed { symbol: String },

    #[error("past the same-day-expiry order cutoff, order for {symbol} not submitted")]
    PastCutoff { symbol: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
