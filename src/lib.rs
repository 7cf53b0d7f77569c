//! Fitbot - Workout and Nutrition Chat Bot
//!
//! This crate implements a chat bot that answers workout and nutrition
//! requests. Per-user command throughput is governed by a token-bucket rate
//! limiter with lazy refill and idle-bucket eviction.

pub mod bot;
pub mod config;
pub mod error;
pub mod ratelimit;
