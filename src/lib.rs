//! chronotrack
//!
//! Indexes timestamped notes from a vault of markdown documents and packs
//! them into non-overlapping tracks on a zoomable time axis.
//!
//! The library follows a Pure Core / Impure Shell split:
//! - pure core: [`model`], [`index`], [`cache`], [`layout`], [`viewport`],
//!   [`timeline`]
//! - impure shell: [`parser`], [`source`], [`config`], [`logging`]

pub mod cache;
pub mod config;
pub mod index;
pub mod layout;
pub mod logging;
pub mod model;
pub mod parser;
pub mod source;
pub mod timeline;
pub mod viewport;
