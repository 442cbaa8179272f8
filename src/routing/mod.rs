//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, headers)
//!     → router.rs (priority-ordered scan)
//!     → matcher.rs (evaluate path patterns + header constraints)
//!     → Return: ForwardDecision, NoRoute, or Ambiguous
//!
//! Route Compilation (at startup):
//!     ServiceConfig[] / RouteConfig[]
//!     → Compile patterns (literal prefixes, anchored regexes)
//!     → Sort by descending regex_priority
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Highest priority wins; a surviving tie is an error, never a guess

pub mod matcher;
pub mod router;

pub use router::{ForwardDecision, Route, RouteError, RouteTable, Upstream};
