// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core data types for the skein analytics client.
//!
//! This crate holds the pure data model shared between the SDK and any
//! consumer of its payloads: event records and their payload variants,
//! visitor and session identity, and custom dimensions/variables. No I/O
//! lives here.

pub mod dimensions;
pub mod error;
pub mod event;
pub mod params;
pub mod session;
pub mod visitor;

pub use dimensions::{CustomDimension, CustomVariable, DimensionSet, VariableSet};
pub use error::CoreError;
pub use event::{Event, EventId, EventKind, OrderItem};
pub use params::EventParams;
pub use session::Session;
pub use visitor::{Visitor, VisitorId};
