//! Fundtrack - a REST backend for tracking personal mutual-fund investments
//!
//! This library provides the core functionality for the Fundtrack service:
//! user accounts with JWT sessions, investment positions keyed by scheme
//! code, and a periodic NAV refresh job backed by an external market-data
//! provider.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
