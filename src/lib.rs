#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Selection and prioritization of not-executed road test cases, biased towards
//! roads whose shape resembles executed roads that failed.

pub mod clustering;
pub mod config;
pub mod error;
pub mod features;
pub mod geometry;
pub mod input;
pub mod retrieval;
pub mod road;
pub mod selection;
pub mod tree;

#[cfg(test)]
mod test_selection;

pub use clustering::{DistanceTable, HierarchyBuilder, RoadClusterer, WardClusterer};
pub use config::DetourConfig;
pub use error::{DetourError, Result, RoadRef};
pub use features::{CurvatureFeatureExtractor, RoadFeatureExtractor};
pub use road::{Outcome, RoadTestCase};
pub use selection::{Detour, SelectionSession};
