use serde::{Deserialize, Serialize};

use crate::ops::{BatchOperation, DocumentModifyAction, SelectionDescriptor};

/// Receives one finished operation record per batch call
pub trait OperationSink {
    fn submit(&mut self, operation: BatchOperation);
}

/// Method name of every queued document edit
pub const DOCUMENT_MODIFY: &str = "document.modify";

/// A queued operation in the shape the robot protocol sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub method: String,
    pub id: String,
    pub params: OperationParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParams {
    pub wave_id: String,
    pub wavelet_id: String,
    pub blip_id: String,
    pub modify_action: DocumentModifyAction,
    pub modify_query: SelectionDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxying_for: Option<String>,
}

/// Ordered queue of pending operations for one robot invocation
#[derive(Debug, Clone, Default)]
pub struct OperationQueue {
    pending: Vec<OperationRequest>,
    proxy_for: Option<String>,
    next_op_id: u64,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose operations are all sent on behalf of `proxy_for`
    pub fn proxying_for(proxy_for: impl Into<String>) -> Self {
        Self {
            proxy_for: Some(proxy_for.into()),
            ..Self::default()
        }
    }

    pub fn pending(&self) -> &[OperationRequest] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending operation; ids keep counting up
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.pending)
    }
}

impl OperationSink for OperationQueue {
    fn submit(&mut self, operation: BatchOperation) {
        self.next_op_id += 1;
        let request = OperationRequest {
            method: DOCUMENT_MODIFY.to_string(),
            id: format!("op{}", self.next_op_id),
            params: OperationParams {
                wave_id: operation.wave_id,
                wavelet_id: operation.wavelet_id,
                blip_id: operation.blip_id,
                modify_action: operation.modify_action,
                modify_query: operation.selection,
                proxying_for: self.proxy_for.clone(),
            },
        };
        log::debug!("queued {} {} on blip {}", request.id, request.method, request.params.blip_id);
        self.pending.push(request);
    }
}

impl OperationSink for Vec<BatchOperation> {
    fn submit(&mut self, operation: BatchOperation) {
        self.push(operation);
    }
}
