mod store;

pub use store::*;

pub use remover_contracts::{AppError, AppResult};
