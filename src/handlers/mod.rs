pub mod commands;
pub mod draw;
