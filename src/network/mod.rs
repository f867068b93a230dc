//! Network layer for obtaining and representing interface information.
//!
//! This module provides types and traits for:
//! - Representing interfaces ([`InterfaceDescriptor`]) and point-in-time
//!   views of all of them ([`InterfaceSnapshot`])
//! - Supplying interfaces ([`InterfaceSupplier`])
//! - Narrowing what a supplier reports ([`filter`])
//! - The real OS query ([`platform`])

pub mod filter;
mod interface;
pub mod platform;
mod supplier;

pub use interface::{InterfaceDescriptor, InterfaceSnapshot, QueryError};
pub use supplier::{InterfaceSupplier, SupplyError};
