// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-stub worker pool and handler execution.
//!
//! Each stub owns a crossbeam queue drained FIFO by `worker_threads` named
//! threads. A request is a [`Job`]; synchronous callers attach a
//! [`ReplySink`] and block on the other end with the call's wait time.
//!
//! Handler outcomes are folded into a status code here, so every completion
//! style sees the same `(status, reply)` pair:
//!
//! | Handler result | Status                     | Reply                 |
//! |----------------|----------------------------|-----------------------|
//! | `Ok(true)`     | `ERR_NONE`                 | handler's reply       |
//! | `Ok(false)`    | `ERR_TRANSACTION_FAILED`   | handler's reply       |
//! | `Err(e)`       | `ERR_REMOTE_EXCEPTION`     | exception descriptor  |
//! | panic          | `ERR_REMOTE_EXCEPTION`     | `IllegalState`        |
//! | no handler     | `ERR_UNKNOWN_TRANSACTION`  | empty                 |

use crate::parcel::MessageParcel;
use crate::remote::skeleton::{self, CallingIdentity};
use crate::rpc::handler::HandlerSlot;
use crate::rpc::types::{
    ExceptionCode, ERR_NONE, ERR_REMOTE_EXCEPTION, ERR_TRANSACTION_FAILED,
    ERR_UNKNOWN_TRANSACTION,
};
use crate::rpc::{MessageOption, RpcError, RpcResult};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Status and reply produced by one handler invocation.
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) status: i32,
    pub(crate) reply: MessageParcel,
}

/// Where a worker delivers the completion of a synchronous request.
pub(crate) enum ReplySink {
    Channel(Sender<Completion>),
    #[cfg(feature = "async")]
    Oneshot(tokio::sync::oneshot::Sender<Completion>),
}

impl ReplySink {
    fn deliver(self, completion: Completion) {
        // The receiver is gone when the caller already timed out.
        let delivered = match self {
            Self::Channel(tx) => tx.send(completion).is_ok(),
            #[cfg(feature = "async")]
            Self::Oneshot(tx) => tx.send(completion).is_ok(),
        };
        if !delivered {
            log::debug!("[rpc] completion dropped: caller stopped waiting");
        }
    }
}

/// One queued request.
pub(crate) struct Job {
    pub(crate) code: u32,
    pub(crate) data: MessageParcel,
    pub(crate) option: MessageOption,
    pub(crate) caller: CallingIdentity,
    pub(crate) sink: Option<ReplySink>,
}

/// Worker threads serving one stub.
pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers for the stub `descriptor`.
    pub(crate) fn start(
        id: u64,
        descriptor: &str,
        handlers: Arc<HandlerSlot>,
        threads: usize,
    ) -> RpcResult<Self> {
        let (tx, rx) = channel::unbounded::<Job>();
        let descriptor: Arc<str> = Arc::from(descriptor);
        let mut workers = Vec::with_capacity(threads.max(1));

        for index in 0..threads.max(1) {
            let rx = rx.clone();
            let handlers = Arc::clone(&handlers);
            let descriptor = Arc::clone(&descriptor);
            let handle = thread::Builder::new()
                .name(format!("rpc-stub-{}-{}", id, index))
                .spawn(move || worker_loop(&descriptor, &handlers, &rx))
                .map_err(|e| RpcError::Internal(format!("failed to spawn worker: {}", e)))?;
            workers.push(handle);
        }

        log::debug!(
            "[rpc] started {} worker(s) for '{}' (id {})",
            workers.len(),
            descriptor,
            id
        );

        Ok(Self {
            sender: Some(tx),
            workers: Mutex::new(workers),
        })
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Queue a job. Fails with `Shutdown` once the pool is stopping.
    pub(crate) fn submit(&self, job: Job) -> RpcResult<()> {
        let sender = self.sender.as_ref().ok_or(RpcError::Shutdown)?;
        sender.send(job).map_err(|_| RpcError::Shutdown)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets workers drain what is left and exit.
        self.sender.take();

        // Workers are detached, not joined: the last reference may be released
        // by a caller giving up on a slow handler, or by a worker itself.
        let busy = self
            .workers
            .get_mut()
            .drain(..)
            .filter(|handle| !handle.is_finished())
            .count();
        if busy > 0 {
            log::debug!("[rpc] detached {} worker(s) still draining", busy);
        }
    }
}

fn worker_loop(descriptor: &str, handlers: &HandlerSlot, rx: &Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        let Job {
            code,
            mut data,
            option,
            caller,
            sink,
        } = job;

        let _identity = skeleton::enter(caller);
        let (status, reply) = execute(descriptor, handlers, code, &mut data, &option);

        if let Some(sink) = sink {
            sink.deliver(Completion { status, reply });
        }
    }
    log::debug!("[rpc] worker for '{}' stopped", descriptor);
}

/// Run the resolved handler and fold its outcome into a status code.
pub(crate) fn execute(
    descriptor: &str,
    handlers: &HandlerSlot,
    code: u32,
    data: &mut MessageParcel,
    option: &MessageOption,
) -> (i32, MessageParcel) {
    let Some((kind, handler)) = handlers.resolve() else {
        log::debug!(
            "[rpc] '{}' has no handler for code {}",
            descriptor,
            code
        );
        return (ERR_UNKNOWN_TRANSACTION, MessageParcel::new());
    };

    let mut reply = MessageParcel::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        handler.handle(code, data, &mut reply, option)
    }));

    match outcome {
        Ok(Ok(true)) => (ERR_NONE, reply),
        Ok(Ok(false)) => {
            log::debug!(
                "[rpc] {:?} handler of '{}' rejected code {}",
                kind,
                descriptor,
                code
            );
            (ERR_TRANSACTION_FAILED, reply)
        }
        Ok(Err(e)) => {
            log::debug!(
                "[rpc] {:?} handler of '{}' failed code {}: {}",
                kind,
                descriptor,
                code,
                e
            );
            let reply = exception_reply(ExceptionCode::for_error(&e), &e.to_string());
            (ERR_REMOTE_EXCEPTION, reply)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            log::warn!(
                "[rpc] {:?} handler of '{}' panicked on code {}: {}",
                kind,
                descriptor,
                code,
                message
            );
            let reply = exception_reply(ExceptionCode::IllegalState.as_i32(), &message);
            (ERR_REMOTE_EXCEPTION, reply)
        }
    }
}

/// Block for a synchronous completion.
pub(crate) fn wait_for(
    rx: &Receiver<Completion>,
    code: u32,
    wait_time: Duration,
) -> RpcResult<Completion> {
    match rx.recv_timeout(wait_time) {
        Ok(completion) => Ok(completion),
        Err(RecvTimeoutError::Timeout) => Err(RpcError::Timeout {
            code,
            waited: wait_time,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(RpcError::Shutdown),
    }
}

fn exception_reply(code: i32, message: &str) -> MessageParcel {
    let mut reply = MessageParcel::new();
    if let Err(e) = reply.write_exception(code, message) {
        log::warn!("[rpc] could not encode exception reply: {}", e);
    }
    reply
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::ParcelError;
    use crate::rpc::types::ERR_TIMED_OUT;

    fn slot<F>(handler: F) -> HandlerSlot
    where
        F: Fn(u32, &mut MessageParcel, &mut MessageParcel, &MessageOption) -> crate::rpc::HandlerResult
            + Send
            + Sync
            + 'static,
    {
        HandlerSlot {
            message: Some(Box::new(handler)),
            legacy: None,
        }
    }

    #[test]
    fn test_execute_outcomes() {
        let option = MessageOption::sync();
        let mut data = MessageParcel::new();

        let ok = slot(|_, _, reply, _| {
            reply.write_no_exception()?;
            reply.write_int(7)?;
            Ok(true)
        });
        let (status, mut reply) = execute("t", &ok, 1, &mut data, &option);
        assert_eq!(status, ERR_NONE);
        reply.read_exception().expect("no exception should be recorded");
        assert_eq!(reply.read_int(), 7);

        let refuse = slot(|_, _, _, _| Ok(false));
        assert_eq!(execute("t", &refuse, 1, &mut data, &option).0, ERR_TRANSACTION_FAILED);

        let none = HandlerSlot::default();
        assert_eq!(execute("t", &none, 1, &mut data, &option).0, ERR_UNKNOWN_TRANSACTION);
    }

    #[test]
    fn test_handler_error_becomes_exception() {
        let option = MessageOption::sync();
        let mut data = MessageParcel::new();
        let failing = slot(|_, _, _, _| {
            Err(ParcelError::DescriptorMismatch {
                expected: "a".into(),
                found: "b".into(),
            })
        });
        let (status, mut reply) = execute("t", &failing, 1, &mut data, &option);
        assert_eq!(status, ERR_REMOTE_EXCEPTION);
        match reply.read_exception() {
            Err(ParcelError::RemoteException { code, .. }) => {
                assert_eq!(code, ExceptionCode::Security.as_i32());
            }
            other => panic!("expected remote exception, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_exception_code_still_reports_exception() {
        let option = MessageOption::sync();
        let mut data = MessageParcel::new();
        let failing = slot(|_, _, _, _| {
            Err(ParcelError::RemoteException {
                code: 0,
                message: "relayed".into(),
            })
        });
        let (status, mut reply) = execute("t", &failing, 1, &mut data, &option);
        assert_eq!(status, ERR_REMOTE_EXCEPTION);
        match reply.read_exception() {
            Err(ParcelError::RemoteException { code, .. }) => {
                assert_eq!(code, ExceptionCode::IllegalState.as_i32());
            }
            other => panic!("expected remote exception, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_is_caught() {
        let option = MessageOption::sync();
        let mut data = MessageParcel::new();
        let boom = slot(|_, _, _, _| panic!("boom"));
        let (status, mut reply) = execute("t", &boom, 1, &mut data, &option);
        assert_eq!(status, ERR_REMOTE_EXCEPTION);
        match reply.read_exception() {
            Err(ParcelError::RemoteException { code, message }) => {
                assert_eq!(code, ExceptionCode::IllegalState.as_i32());
                assert_eq!(message, "boom");
            }
            other => panic!("expected remote exception, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_for_timeout() {
        let (_tx, rx) = channel::bounded::<Completion>(1);
        let err = wait_for(&rx, 3, Duration::from_millis(10)).expect_err("should time out");
        assert_eq!(err.status_code(), ERR_TIMED_OUT);
    }
}
