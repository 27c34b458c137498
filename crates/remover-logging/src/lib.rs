pub mod logging;

pub use logging::*;

pub use remover_contracts::{AppError, AppResult, ResultExt};
