pub mod fixture;
pub mod reddit;
