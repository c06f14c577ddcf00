//! # mandi-cli — operational surface for the trade core
//!
//! Provides the `mandi` command-line interface.
//!
//! ## Subcommands
//!
//! - `mandi demo` — run a scripted match-to-contract scenario against
//!   the in-memory store and print every step.
//! - `mandi sweep` — expire overdue negotiations in the database.
//! - `mandi show` — inspect negotiations and trades in the database.
//! - `mandi gst` — compute a GST breakdown for an amount and state pair.
//!
//! `sweep` and `show` need `DATABASE_URL`; `demo` and `gst` run without
//! one.

pub mod demo;
pub mod gst;
pub mod show;
pub mod sweep;
