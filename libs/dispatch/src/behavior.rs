//! Cases, behaviors, and the dispatch loop.
//!
//! ## Purpose
//!
//! A [`Case`] pairs a compiled pattern with a type-erased handler; a
//! [`Behavior`] holds an ordered case list and dispatches each incoming
//! message to the first case whose pattern matches it exactly. Matching is
//! accelerated by a small per-behavior cache of shape-compatibility
//! bitmasks keyed by type token; the cache is a pure optimization and never
//! changes which case is selected.
//!
//! A behavior is single-owner state: it is meant to live inside one
//! message-processing context and is not internally synchronized.

use crate::cache::{CaseMask, TokenCache};
use crate::pattern::{Pattern, PatternAtom};
use crate::visitor::{CollectResponse, HandlerOutcome, IntoOutcome, ResultVisitor};
use message::Message;
use std::time::Duration;
use tracing::{trace, warn};
use types::Element;

/// Typed argument extraction from a matched message.
///
/// Implemented for tuples of registered element types up to arity eight;
/// `Refs` is the corresponding tuple of borrowed elements. The mapping
/// indices come from a successful pattern match, in non-wildcard slot
/// order.
pub trait ArgList: 'static {
    type Refs<'m>;

    fn extract<'m>(msg: &'m Message, mapping: &[usize]) -> Option<Self::Refs<'m>>;
}

impl ArgList for () {
    type Refs<'m> = ();

    fn extract<'m>(_msg: &'m Message, _mapping: &[usize]) -> Option<()> {
        Some(())
    }
}

macro_rules! impl_arg_list {
    ($($idx:tt $ty:ident),+) => {
        impl<$($ty: Element),+> ArgList for ($($ty,)+) {
            type Refs<'m> = ($(&'m $ty,)+);

            fn extract<'m>(msg: &'m Message, mapping: &[usize]) -> Option<Self::Refs<'m>> {
                Some(($(msg.get_as::<$ty>(*mapping.get($idx)?)?,)+))
            }
        }
    };
}

impl_arg_list!(0 A);
impl_arg_list!(0 A, 1 B);
impl_arg_list!(0 A, 1 B, 2 C);
impl_arg_list!(0 A, 1 B, 2 C, 3 D);
impl_arg_list!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_arg_list!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F2);
impl_arg_list!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F2, 6 G);
impl_arg_list!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F2, 6 G, 7 H);

/// A handler callable with the borrowed elements an `ArgList` extracts.
///
/// Blanket-implemented for closures taking the matching reference tuple
/// and returning anything convertible [`IntoOutcome`].
pub trait CaseHandler<Args: ArgList>: Send + 'static {
    fn call(&mut self, args: Args::Refs<'_>) -> HandlerOutcome;
}

impl<F, R> CaseHandler<()> for F
where
    F: FnMut() -> R + Send + 'static,
    R: IntoOutcome,
{
    fn call(&mut self, _args: ()) -> HandlerOutcome {
        (self)().into_outcome()
    }
}

macro_rules! impl_case_handler {
    ($($name:ident $ty:ident),+) => {
        impl<Fun, R, $($ty),+> CaseHandler<($($ty,)+)> for Fun
        where
            Fun: FnMut($(&$ty),+) -> R + Send + 'static,
            R: IntoOutcome,
            $($ty: Element,)+
        {
            fn call(&mut self, ($($name,)+): ($(&$ty,)+)) -> HandlerOutcome {
                (self)($($name),+).into_outcome()
            }
        }
    };
}

impl_case_handler!(a A);
impl_case_handler!(a A, b B);
impl_case_handler!(a A, b B, c C);
impl_case_handler!(a A, b B, c C, d D);
impl_case_handler!(a A, b B, c C, d D, e E);
impl_case_handler!(a A, b B, c C, d D, e E, f F2);
impl_case_handler!(a A, b B, c C, d D, e E, f F2, g G);
impl_case_handler!(a A, b B, c C, d D, e E, f F2, g G, h H);

type ErasedHandler = Box<dyn FnMut(&mut Message, &[usize]) -> HandlerOutcome + Send>;

/// One compiled pattern plus its handler.
pub struct Case {
    pattern: Pattern,
    handler: ErasedHandler,
    mutates: bool,
}

impl Case {
    /// Builds a case whose handler receives typed borrows of the matched
    /// elements. This is what the [`case!`](crate::case) macro expands to.
    pub fn typed<Args, F>(atoms: Vec<PatternAtom>, mut handler: F) -> Case
    where
        Args: ArgList,
        F: CaseHandler<Args>,
    {
        Case {
            pattern: Pattern::compile(atoms),
            handler: Box::new(move |msg, mapping| match Args::extract(msg, mapping) {
                Some(args) => handler.call(args),
                // The exact matcher already validated the shape, so a
                // failed extraction means the handler arity disagrees with
                // the pattern.
                None => {
                    debug_assert!(
                        false,
                        "handler arity disagrees with its pattern ({} mapped elements)",
                        mapping.len()
                    );
                    warn!(
                        mapped = mapping.len(),
                        "handler arity disagrees with its pattern; treating case as non-matching"
                    );
                    HandlerOutcome::Skip
                }
            }),
            mutates: false,
        }
    }

    /// Builds a case from a raw handler working on the message and the
    /// matched element indices directly.
    pub fn raw<F>(atoms: Vec<PatternAtom>, handler: F) -> Case
    where
        F: FnMut(&mut Message, &[usize]) -> HandlerOutcome + Send + 'static,
    {
        Case {
            pattern: Pattern::compile(atoms),
            handler: Box::new(handler),
            mutates: false,
        }
    }

    /// Like [`Case::raw`], but flags the case as mutating its matched
    /// elements in place. A behavior containing a mutating case detaches
    /// shared message storage before matching, so in-place writes through
    /// [`Message::get_mut_as`] never race other handles.
    pub fn mutating<F>(atoms: Vec<PatternAtom>, handler: F) -> Case
    where
        F: FnMut(&mut Message, &[usize]) -> HandlerOutcome + Send + 'static,
    {
        Case {
            mutates: true,
            ..Case::raw(atoms, handler)
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn mutates(&self) -> bool {
        self.mutates
    }

    fn invoke(&mut self, msg: &mut Message, mapping: &[usize]) -> HandlerOutcome {
        (self.handler)(msg, mapping)
    }
}

impl std::fmt::Debug for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Case")
            .field("pattern", &self.pattern)
            .field("mutates", &self.mutates)
            .finish_non_exhaustive()
    }
}

type TimeoutHandler = Box<dyn FnMut() -> HandlerOutcome + Send>;

/// An ordered list of cases with first-match-wins dispatch.
pub struct Behavior {
    cases: Vec<Case>,
    timeout: Option<Duration>,
    on_timeout: Option<TimeoutHandler>,
    cache: TokenCache,
}

impl Behavior {
    pub fn new(cases: Vec<Case>) -> Behavior {
        Behavior {
            cases,
            timeout: None,
            on_timeout: None,
            cache: TokenCache::new(),
        }
    }

    /// Attaches a timeout duration and handler. The engine never measures
    /// time itself; the owning scheduler calls
    /// [`handle_timeout`](Behavior::handle_timeout) when the duration
    /// elapses without a message.
    pub fn with_timeout<F, R>(mut self, timeout: Duration, mut handler: F) -> Behavior
    where
        F: FnMut() -> R + Send + 'static,
        R: IntoOutcome,
    {
        self.timeout = Some(timeout);
        self.on_timeout = Some(Box::new(move || handler().into_outcome()));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Chains two behaviors: all of `self`'s cases keep priority over all
    /// of `other`'s. The combined behavior starts with a cold cache; the
    /// operands' caches are not merged. The left operand's timeout wins
    /// when both carry one.
    pub fn or_else(self, other: Behavior) -> Behavior {
        let mut cases = self.cases;
        cases.extend(other.cases);
        let (timeout, on_timeout) = if self.on_timeout.is_some() {
            (self.timeout, self.on_timeout)
        } else {
            (other.timeout, other.on_timeout)
        };
        Behavior {
            cases,
            timeout,
            on_timeout,
            cache: TokenCache::new(),
        }
    }

    /// Dispatches `msg` to the first matching case and reports the terminal
    /// outcome to `visitor`.
    ///
    /// A `Skip` outcome resumes matching with the next candidate case.
    /// Handler panics are not caught. Zero matching cases report
    /// `on_no_match`, which is not an error.
    pub fn invoke(&mut self, msg: &mut Message, visitor: &mut dyn ResultVisitor) {
        // Write-before-read safety: detach shared storage up front when any
        // case may mutate matched elements in place.
        if msg.is_shared() && self.cases.iter().any(Case::mutates) {
            msg.force_unshare();
        }
        let mask = self.candidate_mask(msg);
        for (idx, case) in self.cases.iter_mut().enumerate() {
            if idx < CaseMask::BITS as usize && mask & (1 << idx) == 0 {
                continue;
            }
            let Some(mapping) = case.pattern().match_mapping(msg) else {
                continue;
            };
            match case.invoke(msg, &mapping) {
                HandlerOutcome::Skip => continue,
                HandlerOutcome::Response(response) => return visitor.on_message(response),
                HandlerOutcome::Error(err) => return visitor.on_error(err),
                HandlerOutcome::Void(kind) => return visitor.on_void(kind),
            }
        }
        visitor.on_no_match();
    }

    /// [`invoke`](Behavior::invoke) through a [`CollectResponse`] visitor:
    /// the response message, if the matched handler produced one.
    pub fn apply(&mut self, msg: &mut Message) -> Option<Message> {
        let mut collect = CollectResponse::new();
        self.invoke(msg, &mut collect);
        collect.into_response()
    }

    /// Reports the timeout outcome to `visitor`. Driven by the external
    /// scheduler; without a timeout handler this reports `on_no_match`.
    pub fn handle_timeout(&mut self, visitor: &mut dyn ResultVisitor) {
        match &mut self.on_timeout {
            Some(handler) => match handler() {
                HandlerOutcome::Response(response) => visitor.on_message(response),
                HandlerOutcome::Error(err) => visitor.on_error(err),
                HandlerOutcome::Void(kind) => visitor.on_void(kind),
                // Nothing to fall through to on a timeout.
                HandlerOutcome::Skip => visitor.on_no_match(),
            },
            None => visitor.on_no_match(),
        }
    }

    /// The bitmask of cases type-compatible with `msg`'s shape, via the
    /// token cache where possible. Dynamically-typed messages and behaviors
    /// wider than the mask take the all-candidates path and are never
    /// cached; every candidate still runs the exact matcher before its
    /// handler, so an over-wide mask costs time, not correctness.
    fn candidate_mask(&mut self, msg: &Message) -> CaseMask {
        if msg.is_dynamically_typed() || self.cases.len() > CaseMask::BITS as usize {
            return CaseMask::MAX;
        }
        let token = msg.token();
        if let Some(mask) = self.cache.get(token) {
            trace!(token = token.raw(), mask, "match cache hit");
            return mask;
        }
        let mut mask: CaseMask = 0;
        for (idx, case) in self.cases.iter().enumerate() {
            if case.pattern().matches_shape(msg) {
                mask |= 1 << idx;
            }
        }
        trace!(token = token.raw(), mask, "match cache miss");
        self.cache.insert(token, mask);
        mask
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior")
            .field("cases", &self.cases)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Case`] from a parenthesized pattern and a handler closure.
///
/// Pattern slots are element types or `_` for the wildcard; the handler
/// receives one borrow per non-wildcard slot, left to right, and returns
/// anything convertible [`IntoOutcome`]:
///
/// ```
/// use dispatch::{case, Behavior};
/// use message::make_message;
///
/// let mut behavior = Behavior::new(vec![
///     case!((i64, String) => |n: &i64, _s: &String| *n * 2),
///     case!((i64, _) => |n: &i64| *n),
/// ]);
/// let mut msg = make_message!(21i64, "doubled".to_string());
/// let reply = behavior.apply(&mut msg).unwrap();
/// assert_eq!(reply.get_as::<i64>(0), Some(&42));
/// ```
#[macro_export]
macro_rules! case {
    ( ( $($pat:tt)* ) => $handler:expr ) => {{
        let mut atoms: ::std::vec::Vec<$crate::PatternAtom> = ::std::vec::Vec::new();
        $crate::__case_atoms!(atoms; $($pat)*);
        $crate::Case::typed::<$crate::__case_args!($($pat)*), _>(atoms, $handler)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __case_atoms {
    ($v:ident; ) => {};
    ($v:ident; _ $(, $($rest:tt)*)?) => {
        $v.push($crate::PatternAtom::Any);
        $( $crate::__case_atoms!($v; $($rest)*); )?
    };
    ($v:ident; $t:ty) => {
        $v.push($crate::PatternAtom::Ty($crate::__private::expect_type_id::<$t>()));
    };
    ($v:ident; $t:ty, $($rest:tt)*) => {
        $v.push($crate::PatternAtom::Ty($crate::__private::expect_type_id::<$t>()));
        $crate::__case_atoms!($v; $($rest)*);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __case_args {
    (@acc [$($acc:ty),*]) => { ( $($acc,)* ) };
    (@acc [$($acc:ty),*] _ $(, $($rest:tt)*)?) => {
        $crate::__case_args!(@acc [$($acc),*] $($($rest)*)?)
    };
    (@acc [$($acc:ty),*] $t:ty) => {
        $crate::__case_args!(@acc [$($acc,)* $t])
    };
    (@acc [$($acc:ty),*] $t:ty, $($rest:tt)*) => {
        $crate::__case_args!(@acc [$($acc,)* $t] $($rest)*)
    };
    ( $($pat:tt)* ) => {
        $crate::__case_args!(@acc [] $($pat)*)
    };
}
