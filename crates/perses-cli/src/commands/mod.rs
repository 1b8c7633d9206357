pub mod mutate;
pub mod setup;
pub mod validate;
