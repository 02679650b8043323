//! UniChat core library — backend API client, configuration, and the
//! settings-modal state shared by the CLI and desktop applications.

pub mod api;
pub mod catalog;
pub mod config;
pub mod modal;
pub mod snapshot;
