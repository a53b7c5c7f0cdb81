pub mod changelog;
pub mod settings;
