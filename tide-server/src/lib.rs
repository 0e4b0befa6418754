//! Tide calendar server.
//!
//! Resolves a place or station identifier to a tide station, fetches the
//! month's high and low tide predictions from NOAA or CHS, and renders a
//! printable calendar, caching the result.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod render;
pub mod resolve;
pub mod retry;
pub mod service;
pub mod stations;
pub mod web;

#[cfg(test)]
pub mod testing;
