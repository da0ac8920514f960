use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Validation-kind failures: malformed input, bad signature, hash
/// mismatch, insufficient allowance, price out of band. State is left
/// untouched whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed order: {0}")]
    Malformed(String),
    #[error("signature does not recover to maker")]
    BadSignature,
    #[error("preimage does not hash to secretHash")]
    HashMismatch,
    #[error("maker allowance {have} is below required {need}")]
    InsufficientAllowance { have: u128, need: u128 },
    #[error("quoted price {quoted} is outside [{floor}, {ceiling}]")]
    PriceOutOfBand { quoted: u128, floor: u128, ceiling: u128 },
    #[error("duplicate order submission with a different preimage or intent")]
    DuplicateMismatch,
}

/// Wrong-status or wrong-caller failures. State is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("order {0} not found")]
    NotFound(String),
    #[error("order {order} is in status {actual:?}, expected one of {expected:?}")]
    WrongStatus {
        order: String,
        actual: crate::domain::order::OrderStatus,
        expected: Vec<crate::domain::order::OrderStatus>,
    },
    #[error("resolver {given} does not match committed resolver {committed}")]
    NotOwningResolver { given: String, committed: String },
    #[error("order {0} is not currently rescuable")]
    NotRescuable(String),
}

/// Transient I/O: chain or store unreachable, or timed out. The caller
/// of a ChainGateway/OrderStore method gets this after the retry
/// budget inside the gateway/store implementation is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain {0} unreachable")]
    Unreachable(u64),
    #[error("transaction {0} not found")]
    TxNotFound(String),
    #[error("transaction {0} reverted")]
    TxReverted(String),
    #[error("timed out waiting for confirmations")]
    Timeout,
    #[error("caller not authorized to move these funds")]
    NotAuthorized,
    #[error("insufficient allowance for transfer")]
    InsufficientAllowance,
    #[error("transfer rejected on-chain")]
    Rejected,
    #[error("escrow already claimed")]
    AlreadyClaimed,
    #[error("reveal deadline has passed")]
    DeadlinePassed,
    #[error("preimage hash does not match escrow hashlock")]
    HashMismatch,
    #[error("secret not found in transaction {0}")]
    SecretNotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable")]
    Unreachable,
    #[error("order {0} not found")]
    NotFound(String),
    #[error("secret for order {0} not found")]
    SecretNotFound(String),
}

/// Top-level error returned by the Lifecycle Controller. Composes the
/// four component-level taxonomies plus the fund-verification kind
/// that is specific to escrow-funding checks.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("escrow underfunded: {0}")]
    FundVerification(String),
}

/// HTTP-facing wrapper. Maps `CoordinatorError` onto the status codes
/// enumerated in the control-plane table.
#[derive(Debug)]
pub struct ApiError(pub CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        ApiError(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(CoordinatorError::Validation(e))
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        ApiError(CoordinatorError::State(e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            CoordinatorError::Validation(ValidationError::BadSignature) => {
                (StatusCode::UNAUTHORIZED, "bad_signature")
            }
            CoordinatorError::Validation(ValidationError::InsufficientAllowance { .. }) => {
                (StatusCode::CONFLICT, "allowance")
            }
            CoordinatorError::Validation(ValidationError::PriceOutOfBand { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "price")
            }
            CoordinatorError::Validation(_) => (StatusCode::BAD_REQUEST, "malformed"),
            CoordinatorError::State(StateError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            CoordinatorError::State(StateError::NotOwningResolver { .. }) => {
                (StatusCode::FORBIDDEN, "not_owner")
            }
            CoordinatorError::State(StateError::NotRescuable(_)) => (StatusCode::CONFLICT, "state"),
            CoordinatorError::State(_) => (StatusCode::CONFLICT, "state"),
            CoordinatorError::Chain(_) => (StatusCode::CONFLICT, "deposit"),
            CoordinatorError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            CoordinatorError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store"),
            CoordinatorError::FundVerification(_) => (StatusCode::UNPROCESSABLE_ENTITY, "funds"),
        };
        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Bounded exponential back-off for transient I/O, matching the
/// "retried with bounded exponential back-off" rule for chain/store
/// calls made off the request path.
pub async fn retry_with_backoff<T, E, F, Fut>(mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    const BASE_DELAY_MS: u64 = 200;
    let mut last_err = None;
    for i in 0..MAX_ATTEMPTS {
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = Some(e);
                if i + 1 < MAX_ATTEMPTS {
                    let delay = BASE_DELAY_MS * (1 << i);
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
