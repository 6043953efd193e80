pub mod github;
pub mod review;
