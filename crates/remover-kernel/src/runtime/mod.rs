pub mod blocking;
pub mod cancel;
