pub mod cli;
pub mod examples;
pub mod logging;
pub mod models;
pub mod mongo;
pub mod pipeline;
pub mod settings;
