//! freshfeed: a terminal browser for curated posts.
//!
//! Feeds are browsed through a fixed-size window that slides over the full
//! newest-first sequence, with debounced search on the home feed and scroll
//! positions restored when returning to a feed.

pub mod app;
pub mod config;
pub mod feed;
pub mod router;
pub mod storage;
pub mod ui;
pub mod util;
