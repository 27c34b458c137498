pub mod runtime;

pub use remover_contracts::models;
pub use remover_contracts::{AppError, AppResult, ResultExt};
pub use runtime::blocking::run_blocking;
pub use runtime::cancel::CancelFlag;
