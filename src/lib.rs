//! A library for syncing newly submitted proposals from a civic petition site.
//!
//! A [`Syncer`] asks a [`ProposalSource`] for the newest proposals, fetches the
//! ones missing from the [`ProposalStore`], and appends a line for each to the
//! [`Ledger`].

pub mod config;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod source;
pub mod store;
pub mod syncer;

pub use config::Config;
pub use error::SyncError;
pub use extract::{Extractor, Proposal};
pub use ledger::Ledger;
pub use source::{DetailPage, HttpSource, ProposalSource, SearchHit};
pub use store::ProposalStore;
pub use syncer::{Statistics, SyncOptions, Syncer};
