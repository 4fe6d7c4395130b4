//! Normalization of heterogeneous list responses.
//!
//! Backends return lists under `data`, `records`, `list` or `data.content`.
//! Extractors run in that fixed order and the first array found wins, so a
//! body matching several shapes always resolves the same way.

use serde::Serialize;
use serde_json::{Map, Value};

/// HTTP method for paginated calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageMethod {
    /// Parameters travel as the query string.
    Get,
    /// Parameters travel according to [`ParamType`].
    #[default]
    Post,
}

/// Where POST parameters are placed. GET always uses the query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamType {
    /// Encode parameters as the query string and send an empty `{}` body.
    ///
    /// Backends written against the mini-program page helper read POST
    /// parameters from the body whichever type is chosen; pick
    /// [`ParamType::Body`] for those.
    Params,
    /// Send parameters as the JSON body.
    #[default]
    Body,
}

/// Options for [`crate::RequestFacade::request_with_loading_and_pagination`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageOptions {
    /// HTTP method.
    pub method: PageMethod,
    /// Parameter placement for POST.
    pub param_type: ParamType,
    /// Field holding the records.
    pub data_field: String,
    /// Field holding the total count.
    pub total_field: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            method: PageMethod::Post,
            param_type: ParamType::Body,
            data_field: "data".to_string(),
            total_field: "total".to_string(),
        }
    }
}

/// Normalized list envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Page {
    /// Records in backend order.
    pub data: Vec<Value>,
    /// Total count reported by the backend, or 0.
    pub total: u64,
    /// Remaining top-level fields of the response body.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

type Extractor = fn(&Map<String, Value>) -> Option<&Vec<Value>>;

const EXTRACTORS: [(&str, Extractor); 4] = [
    ("data", from_data),
    ("records", from_records),
    ("list", from_list),
    ("data.content", from_data_content),
];

fn from_data(body: &Map<String, Value>) -> Option<&Vec<Value>> {
    body.get("data")?.as_array()
}

fn from_records(body: &Map<String, Value>) -> Option<&Vec<Value>> {
    body.get("records")?.as_array()
}

fn from_list(body: &Map<String, Value>) -> Option<&Vec<Value>> {
    body.get("list")?.as_array()
}

fn from_data_content(body: &Map<String, Value>) -> Option<&Vec<Value>> {
    body.get("data")?.get("content")?.as_array()
}

/// Locate the record list in `body`.
///
/// A non-default `data_field` is tried first, then the built-in shapes.
#[must_use]
pub fn extract_records<'a>(body: &'a Map<String, Value>, data_field: &str) -> Option<&'a Vec<Value>> {
    if let Some(records) = body.get(data_field).and_then(Value::as_array) {
        return Some(records);
    }
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let records = extract(body)?;
        tracing::trace!(shape = *name, "list extracted");
        Some(records)
    })
}

/// Read the total count from `total_field`, top level first, then nested
/// under `data`.
#[must_use]
pub fn extract_total(body: &Map<String, Value>, total_field: &str) -> u64 {
    body.get(total_field)
        .or_else(|| body.get("data")?.get(total_field))
        .and_then(as_count)
        .unwrap_or(0)
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Build the normalized [`Page`] from a response body.
#[must_use]
pub fn normalize(body: Value, options: &PageOptions) -> Page {
    let mut object = match body {
        Value::Object(object) => object,
        Value::Array(items) => {
            return Page {
                data: items,
                ..Page::default()
            };
        }
        _ => return Page::default(),
    };
    let data = extract_records(&object, &options.data_field)
        .cloned()
        .unwrap_or_default();
    let total = extract_total(&object, &options.total_field);
    for key in ["data", "total", options.data_field.as_str(), options.total_field.as_str()] {
        object.remove(key);
    }
    Page {
        data,
        total,
        rest: object,
    }
}
