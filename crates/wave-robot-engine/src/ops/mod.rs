//! Operation records produced by batch edits and the queue that collects them.

pub mod action;
pub mod queue;

pub use action::{BatchOperation, DocumentModifyAction, ModifyHow, SelectionDescriptor};
pub use queue::{OperationParams, OperationQueue, OperationRequest, OperationSink};
