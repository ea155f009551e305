pub mod app;
pub mod build;
pub mod inspect;
