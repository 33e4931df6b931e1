// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local stubs.

use super::death::DeathList;
use super::skeleton::{CallingIdentity, IpcSkeleton};
use super::{DeathRecipient, IRemoteObject, RemoteProxy};
use crate::config::RuntimeConfig;
use crate::parcel::MessageParcel;
use crate::rpc::dispatcher::{self, Completion, Job, ReplySink, WorkerPool};
use crate::rpc::{
    register_service, unregister_service, HandlerResult, HandlerSlot, MessageOption,
    RequestHandler, RpcError, RpcResult, ServiceInfo, ERR_NONE,
};
use crossbeam::channel::{self, Receiver};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_STUB_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state of one stub. Proxies and parcels refer to it; the stub is
/// alive while at least one strong reference exists.
#[doc(hidden)]
pub struct StubCore {
    id: u64,
    descriptor: String,
    pool: WorkerPool,
    death: DeathList,
}

impl StubCore {
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub(crate) fn death(&self) -> &DeathList {
        &self.death
    }

    /// Queue a request. Returns the completion channel for synchronous
    /// requests, `None` for one-way ones.
    pub(crate) fn begin(
        &self,
        code: u32,
        data: &MessageParcel,
        option: &MessageOption,
    ) -> RpcResult<Option<Receiver<Completion>>> {
        if option.is_async() {
            self.submit(code, data, option, None)?;
            return Ok(None);
        }
        let (tx, rx) = channel::bounded(1);
        self.submit(code, data, option, Some(ReplySink::Channel(tx)))?;
        Ok(Some(rx))
    }

    pub(crate) fn submit(
        &self,
        code: u32,
        data: &MessageParcel,
        option: &MessageOption,
        sink: Option<ReplySink>,
    ) -> RpcResult<()> {
        // The handler gets its own copy, read from the start.
        let mut request = data.clone();
        request.rewind_read(0);

        self.pool.submit(Job {
            code,
            data: request,
            option: option.clone(),
            caller: CallingIdentity::local(&IpcSkeleton::local_device_id()),
            sink,
        })
    }

    /// Send a request and, for synchronous calls, wait for the reply.
    pub(crate) fn transact(
        &self,
        code: u32,
        data: &MessageParcel,
        reply: &mut MessageParcel,
        option: &MessageOption,
    ) -> RpcResult<i32> {
        let Some(rx) = self.begin(code, data, option)? else {
            return Ok(ERR_NONE);
        };
        match dispatcher::wait_for(&rx, code, option.wait_time()) {
            Ok(completion) => {
                *reply = completion.reply;
                Ok(completion.status)
            }
            Err(e) => {
                log::warn!("[remote] '{}' request {}: {}", self.descriptor, code, e);
                Err(e)
            }
        }
    }
}

impl Drop for StubCore {
    fn drop(&mut self) {
        unregister_service(self.id);
        self.death.notify();
        log::debug!("[remote] stub '{}' (id {}) released", self.descriptor, self.id);
    }
}

impl fmt::Debug for StubCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubCore")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("workers", &self.pool.worker_count())
            .finish()
    }
}

/// A local object that serves requests.
///
/// Cloning shares the same stub. The stub stops serving and notifies death
/// recipients once every clone (and every parcel holding it) is dropped.
#[derive(Clone)]
pub struct RemoteObject {
    core: Arc<StubCore>,
}

impl RemoteObject {
    pub fn builder(descriptor: impl Into<String>) -> RemoteObjectBuilder {
        RemoteObjectBuilder {
            descriptor: descriptor.into(),
            handlers: HandlerSlot::default(),
            worker_threads: None,
            config: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn worker_threads(&self) -> usize {
        self.core.pool.worker_count()
    }

    /// A proxy to this stub, as a peer would see it.
    pub fn proxy(&self) -> RemoteProxy {
        RemoteProxy::from_core(&self.core)
    }
}

impl IRemoteObject for RemoteObject {
    fn descriptor(&self) -> String {
        self.core.descriptor.clone()
    }

    fn stub_core(&self) -> Option<Arc<StubCore>> {
        Some(Arc::clone(&self.core))
    }

    fn is_object_dead(&self) -> bool {
        false
    }

    /// Stubs are local; only proxies observe death.
    fn add_death_recipient(&self, _recipient: Arc<dyn DeathRecipient>) -> bool {
        false
    }

    fn remove_death_recipient(&self, _recipient: &Arc<dyn DeathRecipient>) -> bool {
        false
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("id", &self.core.id)
            .field("descriptor", &self.core.descriptor)
            .finish()
    }
}

/// Builder for [`RemoteObject`].
pub struct RemoteObjectBuilder {
    descriptor: String,
    handlers: HandlerSlot,
    worker_threads: Option<usize>,
    config: Option<RuntimeConfig>,
}

impl RemoteObjectBuilder {
    /// Legacy byte-protocol handler. Used only when no message handler is set.
    pub fn on_remote_request<F>(self, handler: F) -> Self
    where
        F: Fn(u32, &mut MessageParcel, &mut MessageParcel, &MessageOption) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.legacy_handler(handler)
    }

    /// Message-protocol handler. Takes priority over `on_remote_request`.
    pub fn on_remote_message_request<F>(self, handler: F) -> Self
    where
        F: Fn(u32, &mut MessageParcel, &mut MessageParcel, &MessageOption) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.message_handler(handler)
    }

    pub fn legacy_handler(mut self, handler: impl RequestHandler) -> Self {
        self.handlers.legacy = Some(Box::new(handler));
        self
    }

    pub fn message_handler(mut self, handler: impl RequestHandler) -> Self {
        self.handlers.message = Some(Box::new(handler));
        self
    }

    /// Worker threads serving this stub (defaults to the configured value).
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    /// Read dispatch defaults from `config` instead of the global one.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> RpcResult<RemoteObject> {
        if self.descriptor.is_empty() {
            return Err(RpcError::Internal(
                "stub descriptor must not be empty".to_string(),
            ));
        }

        let threads = self.worker_threads.unwrap_or_else(|| {
            self.config
                .as_ref()
                .unwrap_or_else(|| RuntimeConfig::global())
                .dispatch()
                .worker_threads
        });

        let id = NEXT_STUB_ID.fetch_add(1, Ordering::Relaxed);
        let pool = WorkerPool::start(id, &self.descriptor, Arc::new(self.handlers), threads)?;
        let core = Arc::new(StubCore {
            id,
            descriptor: self.descriptor,
            pool,
            death: DeathList::default(),
        });

        register_service(
            ServiceInfo {
                id,
                descriptor: core.descriptor.clone(),
                worker_threads: core.pool.worker_count(),
            },
            Arc::downgrade(&core),
        );

        Ok(RemoteObject { core })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{ERR_UNKNOWN_TRANSACTION, TF_ASYNC};

    #[test]
    fn empty_descriptor_is_rejected() {
        assert!(RemoteObject::builder("").build().is_err());
    }

    #[test]
    fn stub_without_handler() {
        let stub = RemoteObject::builder("test.stub.empty")
            .worker_threads(1)
            .build()
            .expect("stub should start");
        assert_eq!(stub.worker_threads(), 1);

        let data = MessageParcel::new();
        let mut reply = MessageParcel::new();
        let status = stub
            .send_request(1, &data, &mut reply, &MessageOption::sync())
            .expect("request should complete");
        assert_eq!(status, ERR_UNKNOWN_TRANSACTION);
    }

    #[test]
    fn one_way_leaves_reply_untouched() {
        let stub = RemoteObject::builder("test.stub.oneway")
            .on_remote_message_request(|_, _, reply, _| {
                reply.write_int(99)?;
                Ok(true)
            })
            .build()
            .expect("stub should start");

        let mut data = MessageParcel::new();
        data.write_int(1).expect("write should succeed");
        let mut reply = MessageParcel::new();
        let status = stub
            .send_request(1, &data, &mut reply, &MessageOption::new(TF_ASYNC))
            .expect("request should be queued");
        assert_eq!(status, ERR_NONE);
        assert_eq!(reply.size(), 0);
        assert_eq!(reply.read_int(), 0);
    }

    #[test]
    fn stub_reports_alive_and_refuses_recipients() {
        let stub = RemoteObject::builder("test.stub.alive")
            .build()
            .expect("stub should start");
        assert!(!stub.is_object_dead());
        let recipient: Arc<dyn DeathRecipient> = Arc::new(|| {});
        assert!(!stub.add_death_recipient(Arc::clone(&recipient)));
        assert!(!stub.remove_death_recipient(&recipient));
    }
}
