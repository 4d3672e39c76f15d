// SPDX-License-Identifier: MPL-2.0
//! # wikipersist
//!
//! Measure how long edits to a Wikipedia page persisted before they were superseded.
//!
//! ## Overview
//!
//! `wikipersist` fetches the public revision history of a page through the
//! [MediaWiki Action API](https://www.mediawiki.org/wiki/API:Revisions), restricts it to a time
//! window and (optionally) to a fixed group of editors, and computes for every remaining revision
//! the wall-clock time until the next revision replaced it. The most recent revision is measured
//! against the current time.
//!
//! The results can be summarised per editor and exported as CSV, as a two-sheet XLSX workbook or
//! as a paginated plain-text report.
//!
//! ## Getting Started
//!
//! ```no_run
//! use wikipersist::api::HttpApi;
//! use wikipersist::config::Config;
//! use wikipersist::fetcher::fetch_revisions;
//! use wikipersist::filter::Selection;
//! use wikipersist::page::PageRef;
//! use wikipersist::persistency::compute_persistency;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut api = HttpApi::new(&config.api);
//!
//!     let page = PageRef::from_url("https://en.wikipedia.org/wiki/Anne_Conway_(philosopher)")
//!         .ok_or("not a Wikipedia URL")?;
//!     let start = config.start_time();
//!     let fetched = fetch_revisions(&mut api, &page, Some(start))?;
//!
//!     match config.revision_filter(start, false).select(&fetched) {
//!         Selection::NoRevisions => println!("no revisions found"),
//!         Selection::FilteredOut { fetched } => println!("none of {fetched} revisions matched"),
//!         Selection::Revisions(revisions) => {
//!             for record in compute_persistency(&revisions) {
//!                 println!(
//!                     "{} by '{}': {:.1} h",
//!                     record.revision.id,
//!                     record.revision.author.name,
//!                     record.persistency_hours()
//!                 );
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules and API
//!
//! ### `fetcher` Module
//!
//! **Purpose**: Retrieves the revision history of a page, oldest revision first.
//!
//! - [`fetcher::fetch_revisions`] follows continuation tokens until the history is exhausted.
//!   Each revision carries the size difference to the revision fetched before it.
//! - A failed request aborts the fetch; the error ([`fetcher::IncompleteFetch`]) still holds the
//!   revisions received up to that point. There is no retry.
//! - [`fetcher::spawn_fetch`] runs the same fetch on its own thread.
//!
//! The HTTP side lives behind the [`api::RevisionApi`] trait; [`api::HttpApi`] is the blocking
//! implementation with a fixed per-request timeout.
//!
//! ### `filter` Module
//!
//! **Purpose**: Keeps revisions at or after a start time, optionally only by allow-listed
//! editors. [`filter::RevisionFilter::select`] reports an empty history and a fully filtered
//! history as different [`filter::Selection`]s.
//!
//! Size deltas are not recomputed after filtering.
//!
//! ### `persistency` Module
//!
//! **Purpose**: Sorts revisions by time and computes how long each one persisted.
//! "Now" is sampled once per call, so all records share one reference instant.
//!
//! ### `report` and `export` Modules
//!
//! **Purpose**: Per-editor statistics, daily edit counts, the text summary, and CSV/XLSX output.
//!
//! ### `config` Module
//!
//! **Purpose**: The tracked pages, the editor allow-list and the API settings, loaded from JSON.
//! The default configuration is the Project Vox page and editor list.
//!
//! ## Logging and Error Handling
//!
//! - Uses the `tracing` crate for structured events; the library never installs a subscriber.
//! - Each module has its own error type. Malformed page URLs are not errors:
//!   [`page::PageRef::from_url`] returns `None`.

pub mod api;
pub mod config;
pub mod export;
pub mod fetcher;
pub mod filter;
pub mod page;
pub mod persistency;
pub mod report;
#[cfg(test)]
mod test_support;
