//! Result context: how many results were returned, requested and matched.

use serde::Serialize;
use serde_json::Value;

use crate::cmr::CmrSearchResponse;
use crate::convert::Params;

pub const CONTEXT_KEY: &str = "context";

/// Counts captured from the upstream result before any formatting runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextInput {
    pub returned: usize,
    /// `None` when the request carried no limit; emitted as `null`.
    pub limit: Option<u64>,
    pub matched: u64,
}

impl ContextInput {
    /// Capture counts from an upstream search. `limit` is read from the
    /// request parameters (`limit` or `page_size`, integer or numeric string).
    pub fn from_search(response: &CmrSearchResponse, params: &Params) -> Self {
        let limit = ["limit", "page_size"]
            .iter()
            .find_map(|key| params.get(*key))
            .and_then(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            });
        Self {
            returned: response.entries.len(),
            limit,
            matched: response.hits,
        }
    }
}

/// Add the top-level `context` object. Additive only: nothing else in the
/// result changes.
pub fn format(mut result: Value, context: Option<&ContextInput>) -> Value {
    let Some(context) = context else {
        return result;
    };
    if let (Value::Object(object), Ok(context)) = (&mut result, serde_json::to_value(context)) {
        object.insert(CONTEXT_KEY.to_string(), context);
    }
    result
}
