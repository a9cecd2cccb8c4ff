//! Shared test harness modules for the sensitivity CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod helpers;
mod listing_steps;
mod sync_rando_steps;
