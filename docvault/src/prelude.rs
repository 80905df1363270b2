//! Convenient re-exports of commonly used types from docvault.
//!
//! ```ignore
//! use docvault::prelude::*;
//! ```

pub use docvault_core::{
    backend::{Connector, ConnectorBuilder, SessionBackend},
    collection::{CollectionHandle, resolve_collection},
    config::{ConnectionConfig, CryptoConfig},
    crypto::{decrypt_fields, encrypt_fields},
    error::{RecordStoreError, RecordStoreResult},
    page::Pagination,
    record::{Record, RecordExt, RecordFields, fetch_identifier, generate_identifier},
    registry::{ConnectionRegistry, Session},
    store::RecordStore,
};
pub use docvault_macros::RecordFields;
