//! Bundled provider adapters.
//!
//! Adapters for individual identity services live outside this crate; these two
//! cover development (`faux`) and any standard authorization-code service (`oauth2`).

pub mod faux;
pub mod oauth2;
