//! Smoke-test runner for the Crypto Report Generator UI
//!
//! This crate drives a headless browser against an already-running local
//! instance of the Crypto Report Generator front-end and checks that its
//! core UI elements render and respond:
//! - Spawns a long-lived Playwright page driver as a `node` subprocess
//! - Speaks a line-delimited JSON command protocol to it over stdin/stdout
//! - Runs four fixed checks in order, each in its own failure boundary
//! - Captures screenshots and writes a JSON run report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Smoke Test Runner (Rust)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SmokeRunner                                                │
//! │    ├── probe::wait_for_server()        (tolerant)           │
//! │    ├── PageDriver::spawn() -> node + Playwright page        │
//! │    ├── warm_up()                       (tolerant)           │
//! │    ├── checks, in fixed order:                              │
//! │    │     homepage_elements │ prices_load                    │
//! │    │     theme_toggle      │ coin_selector (may SKIP)       │
//! │    ├── PageDriver::shutdown()          (unconditional)      │
//! │    └── write_results() -> smoke-results.json                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver protocol (one JSON object per line)             │
//! │    request:  { "execute": "count", "arguments": {...} }     │
//! │    response: { "return": 12 } | { "error": {...} }          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod checks;
pub mod driver;
pub mod error;
pub mod probe;
pub mod runner;

pub use checks::Outcome;
pub use error::{SmokeError, SmokeResult};
pub use runner::{RunReport, RunnerConfig, SmokeRunner};
