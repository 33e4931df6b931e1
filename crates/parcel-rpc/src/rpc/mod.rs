// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request dispatch.
//!
//! A request is a code plus a [`MessageParcel`](crate::parcel::MessageParcel)
//! delivered to a stub's handler together with a [`MessageOption`]. The
//! handler fills a reply parcel; the caller gets the reply and a status code.
//!
//! # Reply convention
//!
//! Handlers write `write_no_exception()` (or `write_exception(..)`) before any
//! result, and callers consume it with `read_exception()` before reading
//! results. Skipping that read shifts every following field by one slot.
//!
//! # Example
//!
//! ```ignore
//! use parcel_rpc::parcel::MessageParcel;
//! use parcel_rpc::remote::{IRemoteObject, RemoteObject};
//! use parcel_rpc::rpc::MessageOption;
//!
//! let stub = RemoteObject::builder("rpcTestAbility")
//!     .on_remote_message_request(|_code, data, reply, _option| {
//!         data.enforce_interface("rpcTestAbility")?;
//!         reply.write_no_exception()?;
//!         reply.write_int(data.read_int())?;
//!         Ok(true)
//!     })
//!     .build()?;
//!
//! let mut data = MessageParcel::new();
//! data.write_interface_token("rpcTestAbility")?;
//! data.write_int(6)?;
//! let mut reply = MessageParcel::new();
//! let status = stub.send_request(1, &data, &mut reply, &MessageOption::sync())?;
//! assert_eq!(status, 0);
//! reply.read_exception()?;
//! assert_eq!(reply.read_int(), 6);
//! ```

pub(crate) mod dispatcher;
mod error;
mod handler;
mod option;
mod registry;
mod types;

pub use error::{RpcError, RpcResult};
pub use handler::{HandlerKind, HandlerResult, RequestHandler};
pub use option::{MessageOption, TF_ACCEPT_FDS, TF_ASYNC, TF_SYNC};
pub use registry::{get_service, list_services, ServiceInfo};
pub use types::{
    ExceptionCode, RequestResult, TransactionStatus, ERR_DEAD_OBJECT, ERR_INVALID_DATA,
    ERR_NONE, ERR_REMOTE_EXCEPTION, ERR_TIMED_OUT, ERR_TRANSACTION_FAILED,
    ERR_UNKNOWN_TRANSACTION,
};

pub(crate) use handler::HandlerSlot;
pub(crate) use registry::{register_service, unregister_service};
