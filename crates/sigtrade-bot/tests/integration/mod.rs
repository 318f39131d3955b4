//! Integration tests for sigtrade-bot.
//!
//! These tests drive a whole session against a scripted broker:
//! - push channel connection and account readiness
//! - order submission and confirmation correlation
//! - report aggregation

pub mod common;
