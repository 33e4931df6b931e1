// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # parcel-rpc - Typed message parcels and in-process request dispatch
//!
//! A binary message container with typed, length-prefixed encoding, plus a
//! request/reply layer that delivers parcels to stub handlers on worker
//! threads. Parcels can carry remote object handles, file descriptors,
//! shared-memory regions and bulk raw data alongside their structured bytes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parcel_rpc::parcel::MessageParcel;
//! use parcel_rpc::remote::{IRemoteObject, RemoteObject};
//! use parcel_rpc::rpc::MessageOption;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stub = RemoteObject::builder("rpcTestAbility")
//!         .on_remote_message_request(|_code, data, reply, _option| {
//!             data.enforce_interface("rpcTestAbility")?;
//!             let values = data.read_short_array();
//!             reply.write_no_exception()?;
//!             reply.write_short_array(&values)?;
//!             Ok(true)
//!         })
//!         .build()?;
//!
//!     let mut data = MessageParcel::new();
//!     data.write_interface_token("rpcTestAbility")?;
//!     data.write_short_array(&[-1, 0, 1])?;
//!
//!     let mut reply = MessageParcel::new();
//!     stub.send_request(1, &data, &mut reply, &MessageOption::sync())?;
//!     reply.read_exception()?;
//!     assert_eq!(reply.read_short_array(), vec![-1, 0, 1]);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  remote: RemoteObject (stub) / RemoteProxy / IpcSkeleton     |
//! +--------------------------------------------------------------+
//! |  rpc: MessageOption | worker pools | status codes | registry |
//! +--------------------------------------------------------------+
//! |  parcel: MessageParcel | Value | Sequenceable | object table |
//! +--------------------------------------------------------------+
//! |  ParcelBuffer (bytes + cursors)  |  ashmem: shared memory    |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MessageParcel`] | Typed parcel with read/write cursors and an object table |
//! | [`RemoteObject`] | Local stub serving requests on worker threads |
//! | [`RemoteProxy`] | Weak handle to a stub, as read back from a parcel |
//! | [`MessageOption`] | Sync/one-way flags and the wait time |
//! | [`Ashmem`] | Named shared-memory region |

/// Shared-memory regions (memfd + mmap).
pub mod ashmem;
/// Limits, markers, timing defaults and runtime configuration.
pub mod config;
/// `log` facade sinks (console, file).
pub mod logging;
/// Typed parcels and their codecs.
pub mod parcel;
/// Stubs, proxies, death notifications and calling identity.
pub mod remote;
/// Request dispatch: options, status codes, handlers, service registry.
pub mod rpc;

pub use ashmem::{Ashmem, AshmemError, AshmemResult};
pub use config::RuntimeConfig;
pub use parcel::{Kind, MessageParcel, ParcelError, ParcelResult, Sequenceable, Value};
pub use remote::{DeathRecipient, IRemoteObject, IpcSkeleton, RemoteObject, RemoteProxy};
pub use rpc::{MessageOption, RequestResult, RpcError, RpcResult, TransactionStatus};
