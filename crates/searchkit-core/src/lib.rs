//! Client state synchronization for the searchkit filter formset.
//!
//! A searchkit formset is a boolean filter builder: logic-group rows
//! (AND/OR/NOT) and filter-rule rows (field, operator, values), rendered by
//! the server and re-rendered whenever a row is added, removed or a dependent
//! field changes. This crate keeps the client side consistent across those
//! partial reloads.
//!
//! # Features
//!
//! - **Row headings** synthesized from live field values, so collapsed rows
//!   still read as a query
//! - **Open-state preservation** across full subtree replacement, opening rows
//!   appended by the reload
//! - **Ordered reloads**: responses to superseded requests are discarded
//! - **Persisted open-state** in an optional hidden form field
//!
//! # Example
//!
//! ```ignore
//! use searchkit_core::{HttpRenderClient, ReloadController, SyncConfig, UiEvent};
//!
//! let config = SyncConfig::default();
//! let mut controller = ReloadController::from_html(&page_html, config.clone())?;
//! let client = HttpRenderClient::from_config("http://localhost:8000/", &config)?;
//!
//! controller.on_reloaded(|event| println!("{} rows", event.row_count));
//! controller.handle("click:add_rule".parse::<UiEvent>()?, &client)?;
//! ```
//!
//! # Architecture
//!
//! - `dom/` - owned element tree, HTML fragment parsing and form controls
//! - `row.rs` - row model read from rendered fieldsets
//! - `heading.rs` - [`HeadingSynthesizer`]
//! - `registry.rs` - [`RowRegistry`] open-state table
//! - `snapshot.rs` - [`FormSnapshot`] form serialization
//! - `controller/` - [`ReloadController`] and its events
//! - `client.rs` - [`RenderClient`] and the HTTP implementation
//! - `config.rs` - TOML configuration
//! - `error.rs` - error types with user-friendly messages

mod client;
mod config;
mod controller;
pub mod dom;
mod error;
mod heading;
mod registry;
mod row;
mod snapshot;

// Re-export main types
pub use client::{HttpRenderClient, RenderClient};
pub use config::SyncConfig;
pub use controller::{
    ReloadController, ReloadOutcome, ReloadReason, ReloadRequest, ReloadState, ReloadedEvent,
    UiEvent,
};
pub use error::{Result, SyncError};
pub use heading::HeadingSynthesizer;
pub use registry::{RowRegistry, RowState};
pub use row::{
    FilterRule, LogicGroup, Operand, Row, RowFields, RowIdentity, RowKind, RowSlot, is_row,
    read_rows,
};
pub use snapshot::FormSnapshot;
