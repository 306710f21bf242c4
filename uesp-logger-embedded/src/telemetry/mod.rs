mod sender;

pub use sender::*;

use core::fmt;

/// Classification of the database's answer to a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    BadRequest,
    Unauthorized,
    NotFound,
    ServerError,
    Unrecognized(u16),
}

impl DeliveryOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            204 => DeliveryOutcome::Accepted,
            400 => DeliveryOutcome::BadRequest,
            401 => DeliveryOutcome::Unauthorized,
            404 => DeliveryOutcome::NotFound,
            500 => DeliveryOutcome::ServerError,
            other => DeliveryOutcome::Unrecognized(other),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryOutcome::Accepted)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Accepted => write!(f, "Data written"),
            DeliveryOutcome::BadRequest => write!(f, "Bad request, malformed metric line"),
            DeliveryOutcome::Unauthorized => write!(f, "Unauthorized, check credentials"),
            DeliveryOutcome::NotFound => write!(f, "Database not found"),
            DeliveryOutcome::ServerError => write!(f, "Database server error"),
            DeliveryOutcome::Unrecognized(status) => write!(f, "Unrecognized status {status}"),
        }
    }
}

pub trait HttpResponse {
    fn status(&self) -> u16;
}

/// Blocking HTTP client.
///
/// The response owns whatever the connection holds for it; dropping it must
/// release those resources.
pub trait HttpClient {
    type Error: fmt::Debug;
    type Response<'a>: HttpResponse
    where
        Self: 'a;

    fn post<'a>(
        &'a mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Self::Response<'a>, Self::Error>;
}
