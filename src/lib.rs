// src/lib.rs

//! Slot Monitor Library
//!
//! Polls appointment providers (HTML pages, vendor JSON feeds, a scripted
//! browser search), classifies each into a coarse availability signal and
//! reports changes.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod services;
pub mod storage;
pub mod utils;
