//! Load-balancer resource subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleManager / IdentityResolver
//!     → client.rs (create / describe / delete at v1/blb)
//!     → transport (Execute)
//!     → types.rs (LoadBalancerRecord decoded from the provider)
//! ```
//!
//! # Design Decisions
//! - Lookups return `Option`; absence is a normal answer, not an error
//! - Mutating calls always carry a fresh client token
//! - Deleting an absent load balancer succeeds

pub mod client;
pub mod types;

pub use client::BlbClient;
pub use types::{
    CreateLoadBalancerArgs, CreateLoadBalancerResponse, DescribeLoadBalancersArgs,
    LoadBalancerRecord, LoadBalancerStatus,
};
