//! Handler outcomes and the result visitor surface.
//!
//! A case handler produces a [`HandlerOutcome`]; the dispatch engine never
//! interprets it beyond the `Skip` fall-through, it hands the terminal
//! outcome to a caller-supplied [`ResultVisitor`]. [`IntoOutcome`] lets
//! handlers return plain values, a full message, an error, or nothing.

use message::{make_message, Message};
use thiserror::Error;

/// A structured failure produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handler failed (code {code}): {reason}")]
pub struct HandlerError {
    pub code: u32,
    pub reason: String,
}

impl HandlerError {
    pub fn new(code: u32, reason: impl Into<String>) -> HandlerError {
        HandlerError {
            code,
            reason: reason.into(),
        }
    }
}

/// The closed set of "handled, but nothing to observe" markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoidKind {
    /// The handler returned no value.
    Unit,
    /// The result will be delivered later through a promise.
    Promise,
    /// The result is a stream handled out of band.
    Stream,
}

/// What a case handler produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// An ordinary response message.
    Response(Message),
    /// A structured failure.
    Error(HandlerError),
    /// Treat this case as if it had not matched; matching continues with
    /// the next candidate case.
    Skip,
    /// Handled with no observable result.
    Void(VoidKind),
}

/// Conversion of handler return values into outcomes.
///
/// Implemented for outcomes themselves, whole messages, `()` (void), errors,
/// and the builtin scalar types (wrapped in a one-element response).
pub trait IntoOutcome {
    fn into_outcome(self) -> HandlerOutcome;
}

impl IntoOutcome for HandlerOutcome {
    fn into_outcome(self) -> HandlerOutcome {
        self
    }
}

impl IntoOutcome for Message {
    fn into_outcome(self) -> HandlerOutcome {
        HandlerOutcome::Response(self)
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerOutcome {
        HandlerOutcome::Void(VoidKind::Unit)
    }
}

impl IntoOutcome for HandlerError {
    fn into_outcome(self) -> HandlerOutcome {
        HandlerOutcome::Error(self)
    }
}

macro_rules! scalar_into_outcome {
    ($($ty:ty),+ $(,)?) => {
        $(impl IntoOutcome for $ty {
            fn into_outcome(self) -> HandlerOutcome {
                HandlerOutcome::Response(make_message!(self))
            }
        })+
    };
}

scalar_into_outcome!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String);

/// Receives the terminal result of one behavior invocation.
pub trait ResultVisitor {
    fn on_message(&mut self, msg: Message);
    fn on_error(&mut self, err: HandlerError);
    fn on_void(&mut self, kind: VoidKind);
    /// No case matched and no timeout fired. Not an error.
    fn on_no_match(&mut self);
}

/// Convenience visitor keeping only a response message, if any.
#[derive(Debug, Default)]
pub struct CollectResponse {
    response: Option<Message>,
}

impl CollectResponse {
    pub fn new() -> CollectResponse {
        CollectResponse::default()
    }

    pub fn into_response(self) -> Option<Message> {
        self.response
    }
}

impl ResultVisitor for CollectResponse {
    fn on_message(&mut self, msg: Message) {
        self.response = Some(msg);
    }

    fn on_error(&mut self, _err: HandlerError) {}

    fn on_void(&mut self, _kind: VoidKind) {}

    fn on_no_match(&mut self) {}
}
