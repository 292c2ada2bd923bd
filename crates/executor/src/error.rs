use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Quote route '{route}' failed: {reason}")]
    RouteFailed { route: String, reason: String },

    #[error("All {attempts} execution routes failed; last error: {last_error}")]
    AllRoutesFailed { attempts: u32, last_error: String },

    #[error("No execution routes are available for this trade")]
    NoRoutesAvailable,

    #[error("Invalid order parameters: {0}")]
    InvalidOrder(String),
}
