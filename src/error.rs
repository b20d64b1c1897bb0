use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Period cannot be empty")]
    Empty,

    #[error("Invalid period format: '{0}'. Expected format like '3m', '1y', '10d', '5y'")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateFilterError {
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("--within cannot be combined with --after or --before")]
    Conflicting,

    #[error("--after {after} is later than --before {before}")]
    EmptyRange { after: String, before: String },

    #[error(transparent)]
    Period(#[from] PeriodError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid base URL '{0}'")]
    BaseUrl(String),
}
