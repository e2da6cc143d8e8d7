pub mod naming;
pub mod types;
