pub mod cli_detect;
pub mod error;
pub mod github;
pub mod history;
pub mod store;
