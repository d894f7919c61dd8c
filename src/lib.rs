// src/lib.rs

//! Property listing scraper library

pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
