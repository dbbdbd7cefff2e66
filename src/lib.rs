//! Trittico: a small gallery site pairing curated photographs and videos
//! with reader-submitted captions, built around a lazily rendered,
//! filesystem-memoized composite-image cache.

pub mod application;
pub mod compose;
pub mod config;
pub mod domain;
pub mod infra;
pub mod inventory;
pub mod presentation;
