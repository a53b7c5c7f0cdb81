pub mod admin;
pub mod changelog;
pub mod migration;
pub mod runner;
