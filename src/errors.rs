use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("store unavailable: {endpoint} returned status {status}")]
    StoreUnavailable {
        status: u16,
        endpoint: String,
    },

    #[error("transport error: {message}")]
    Transport {
        message: String,
    },

    #[error("could not decode store response: {message}")]
    Decode {
        message: String,
    },

    #[error("invalid term: {value}")]
    InvalidTerm {
        value: String,
    },

    #[error("invalid year: {value}")]
    InvalidYear {
        value: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("missing required field: {field}")]
    MissingField {
        field: String,
    },

    #[error("payment for student {found} submitted against student {expected}")]
    StudentMismatch {
        expected: String,
        found: String,
    },

    #[error("payment rejected by store: status {status}, {message}")]
    PaymentRejected {
        status: u16,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl FeeError {
    /// store-side failures degrade to empty results on read paths
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            FeeError::StoreUnavailable { .. } | FeeError::Transport { .. } | FeeError::Decode { .. }
        )
    }
}

impl From<reqwest::Error> for FeeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeeError::Decode { message: err.to_string() }
        } else {
            FeeError::Transport { message: err.to_string() }
        }
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;
