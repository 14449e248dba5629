// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod exams;
pub mod flow;
pub mod results;
