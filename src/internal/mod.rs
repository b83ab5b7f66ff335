//! Internal implementation details.

pub(crate) mod dispose_bag;
pub(crate) mod stack;

pub(crate) use dispose_bag::{BoxFuture, BoxFutureUnit, DisposeBag};
pub(crate) use stack::ResolutionStack;
