#![forbid(unsafe_code)]

//! otpbox runtime
//!
//! # Key Components
//!
//! - [`Program`] - owns a model and its collaborators, runs the update loop
//! - [`Model`] - trait for widget state and behavior
//! - [`Cmd`] - commands for side effects (deferred messages, focus moves,
//!   focus queries, clipboard reads)
//! - [`Subscription`] - trait for periodic event sources
//! - [`Every`] - built-in fixed-interval subscription
//! - [`CancellationSource`] - liveness signal for in-flight effects
//!
//! # How it fits in the system
//! Widgets in `otpbox-widgets` implement [`Model`]; hosts mount them in a
//! [`Program`] together with a clipboard reader and a focus host from
//! `otpbox-core`.

pub mod cancellation;
pub mod effect_system;
pub mod program;
pub mod subscription;

pub use cancellation::{CancellationSource, CancellationToken};
pub use program::{Cmd, InspectFn, Model, Program, ProgramConfig, ReadFn, ReadMode};
pub use subscription::{Every, SubId, Subscription};
