// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote objects: stubs, proxies and the request API they share.
//!
//! A [`RemoteObject`] is a stub: a descriptor plus request handlers, served
//! by its own worker threads. A [`RemoteProxy`] is what a peer holds; it is
//! what `read_remote_object` returns, even when the stub lives in this
//! process. Both implement [`IRemoteObject`], so requests look the same from
//! either side.
//!
//! Three completion styles deliver the same [`RequestResult`]:
//!
//! - [`IRemoteObject::send_request`] blocks and fills the caller's reply
//! - [`IRemoteObject::send_message_request`] returns a future (feature `async`)
//! - [`IRemoteObject::send_message_request_with_callback`] invokes a callback
//!   once from a helper thread

mod death;
mod proxy;
pub(crate) mod skeleton;
mod stub;

pub use death::DeathRecipient;
pub use proxy::RemoteProxy;
pub use skeleton::IpcSkeleton;
pub use stub::{RemoteObject, RemoteObjectBuilder};

#[doc(hidden)]
pub use stub::StubCore;

use crate::parcel::MessageParcel;
use crate::rpc::dispatcher;
use crate::rpc::{MessageOption, RequestResult, RpcError, RpcResult, ERR_NONE};
use std::sync::Arc;

#[cfg(feature = "async")]
use std::future::Future;
#[cfg(feature = "async")]
use std::pin::Pin;

/// Callback invoked with the outcome of a request.
pub type RequestCallback = Box<dyn FnOnce(RequestResult) + Send + 'static>;

/// Boxed future resolving to the outcome of a request.
#[cfg(feature = "async")]
pub type RequestFuture = Pin<Box<dyn Future<Output = RequestResult> + Send + 'static>>;

/// Common interface of stubs and proxies.
pub trait IRemoteObject: Send + Sync {
    /// Interface descriptor of the target stub.
    fn descriptor(&self) -> String;

    /// Backing stub, if it is still alive.
    #[doc(hidden)]
    fn stub_core(&self) -> Option<Arc<StubCore>>;

    fn is_object_dead(&self) -> bool;

    /// Register a recipient notified when the stub goes away.
    /// Returns false for stubs and for proxies whose stub is already gone.
    fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool;

    fn remove_death_recipient(&self, recipient: &Arc<dyn DeathRecipient>) -> bool;

    /// Send a request and block until it completes.
    ///
    /// Returns the transaction status (`ERR_NONE` on success). For
    /// synchronous calls `reply` is replaced by the handler's reply; one-way
    /// calls return immediately and leave it untouched.
    ///
    /// # Errors
    ///
    /// `RemoteUnavailable` when the target stub is gone, `Timeout` when the
    /// reply does not arrive within the option's wait time.
    fn send_request(
        &self,
        code: u32,
        data: &MessageParcel,
        reply: &mut MessageParcel,
        option: &MessageOption,
    ) -> RpcResult<i32> {
        let core = self
            .stub_core()
            .ok_or_else(|| RpcError::RemoteUnavailable(self.descriptor()))?;
        core.transact(code, data, reply, option)
    }

    /// Blocking request that reports failures through `err_code`.
    fn send_message_request_blocking(
        &self,
        code: u32,
        data: MessageParcel,
        mut reply: MessageParcel,
        option: &MessageOption,
    ) -> RequestResult {
        let err_code = match self.send_request(code, &data, &mut reply, option) {
            Ok(status) => status,
            Err(e) => e.status_code(),
        };
        RequestResult {
            err_code,
            code,
            data,
            reply,
        }
    }

    /// Send a request and invoke `callback` once with the result.
    ///
    /// The request is queued before this returns; the wait happens on a
    /// helper thread, so the stub is not kept alive by the pending call.
    fn send_message_request_with_callback(
        &self,
        code: u32,
        data: MessageParcel,
        reply: MessageParcel,
        option: MessageOption,
        callback: RequestCallback,
    ) {
        let pending = match self.stub_core() {
            Some(core) => core.begin(code, &data, &option),
            None => Err(RpcError::RemoteUnavailable(self.descriptor())),
        };

        let finish = move || {
            let (err_code, reply) = match pending {
                Err(e) => (e.status_code(), reply),
                Ok(None) => (ERR_NONE, reply),
                Ok(Some(rx)) => match dispatcher::wait_for(&rx, code, option.wait_time()) {
                    Ok(completion) => (completion.status, completion.reply),
                    Err(e) => (e.status_code(), reply),
                },
            };
            callback(RequestResult {
                err_code,
                code,
                data,
                reply,
            });
        };

        let spawned = std::thread::Builder::new()
            .name("rpc-callback".to_string())
            .spawn(finish);
        if let Err(e) = spawned {
            log::warn!("[remote] failed to spawn callback thread: {}", e);
        }
    }

    /// Send a request; the returned future resolves once it completes.
    ///
    /// The wait is bounded by the option's wait time and requires a tokio
    /// runtime with the time driver enabled.
    #[cfg(feature = "async")]
    fn send_message_request(
        &self,
        code: u32,
        data: MessageParcel,
        reply: MessageParcel,
        option: MessageOption,
    ) -> RequestFuture {
        use crate::rpc::dispatcher::ReplySink;
        use tokio::sync::oneshot;

        let pending = match self.stub_core() {
            Some(core) if option.is_async() => core.submit(code, &data, &option, None).map(|()| None),
            Some(core) => {
                let (tx, rx) = oneshot::channel();
                core.submit(code, &data, &option, Some(ReplySink::Oneshot(tx)))
                    .map(|()| Some(rx))
            }
            None => Err(RpcError::RemoteUnavailable(self.descriptor())),
        };

        Box::pin(async move {
            let (err_code, reply) = match pending {
                Err(e) => (e.status_code(), reply),
                Ok(None) => (ERR_NONE, reply),
                Ok(Some(rx)) => match tokio::time::timeout(option.wait_time(), rx).await {
                    Ok(Ok(completion)) => (completion.status, completion.reply),
                    Ok(Err(_)) => (RpcError::Shutdown.status_code(), reply),
                    Err(_) => {
                        let e = RpcError::Timeout {
                            code,
                            waited: option.wait_time(),
                        };
                        log::warn!("[remote] request {}: {}", code, e);
                        (e.status_code(), reply)
                    }
                },
            };
            RequestResult {
                err_code,
                code,
                data,
                reply,
            }
        })
    }
}
