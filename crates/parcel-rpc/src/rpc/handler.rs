// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request handler conventions.
//!
//! A handler receives the request code, the request parcel (read cursor at
//! 0), an empty reply parcel and the call options. It reports:
//!
//! - `Ok(true)`: handled; the reply is returned with status `ERR_NONE`
//! - `Ok(false)`: refused; status `ERR_TRANSACTION_FAILED`
//! - `Err(e)`: the reply is replaced by an exception and the status is
//!   `ERR_REMOTE_EXCEPTION`
//!
//! By convention a handler writes `write_no_exception()` into the reply
//! before any result, and callers consume it with `read_exception()`.

use crate::parcel::{MessageParcel, ParcelResult};
use crate::rpc::MessageOption;

/// What a handler returns.
pub type HandlerResult = ParcelResult<bool>;

/// Handler trait for processing incoming requests.
///
/// Implement this for stateful services, or pass a closure to
/// [`RemoteObjectBuilder`](crate::remote::RemoteObjectBuilder).
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(
        &self,
        code: u32,
        data: &mut MessageParcel,
        reply: &mut MessageParcel,
        option: &MessageOption,
    ) -> HandlerResult;
}

/// A function-based request handler.
impl<F> RequestHandler for F
where
    F: Fn(u32, &mut MessageParcel, &mut MessageParcel, &MessageOption) -> HandlerResult
        + Send
        + Sync
        + 'static,
{
    fn handle(
        &self,
        code: u32,
        data: &mut MessageParcel,
        reply: &mut MessageParcel,
        option: &MessageOption,
    ) -> HandlerResult {
        self(code, data, reply, option)
    }
}

/// Which registration served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Registered with `on_remote_message_request`
    Message,
    /// Registered with `on_remote_request`
    Legacy,
}

/// The two handler registrations of one stub.
#[derive(Default)]
pub(crate) struct HandlerSlot {
    pub(crate) message: Option<Box<dyn RequestHandler>>,
    pub(crate) legacy: Option<Box<dyn RequestHandler>>,
}

impl HandlerSlot {
    /// The message-protocol handler wins whenever it is registered.
    pub(crate) fn resolve(&self) -> Option<(HandlerKind, &dyn RequestHandler)> {
        if let Some(handler) = self.message.as_deref() {
            return Some((HandlerKind::Message, handler));
        }
        self.legacy
            .as_deref()
            .map(|handler| (HandlerKind::Legacy, handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(_: u32, _: &mut MessageParcel, _: &mut MessageParcel, _: &MessageOption) -> HandlerResult {
        Ok(true)
    }

    #[test]
    fn message_handler_takes_priority() {
        let mut slot = HandlerSlot::default();
        assert!(slot.resolve().is_none());
        slot.legacy = Some(Box::new(accept));
        assert_eq!(slot.resolve().map(|(k, _)| k), Some(HandlerKind::Legacy));
        slot.message = Some(Box::new(accept));
        assert_eq!(slot.resolve().map(|(k, _)| k), Some(HandlerKind::Message));
    }
}
