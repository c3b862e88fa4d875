//! Compact, URL-safe string form of a [`CollectionQuery`].
//!
//! A query travels as a flat `key=value` list joined by `&`:
//!
//! | key  | field                | value                                         |
//! |------|----------------------|-----------------------------------------------|
//! | `s`  | `select`             | comma-joined columns                          |
//! | `w`  | `where_`             | groups joined by `_\|`, items by `_,`, fields by `_:` |
//! | `t`  | `take`               | decimal                                       |
//! | `sk` | `skip`               | decimal                                       |
//! | `o`  | `order_by`           | comma-joined `column[:direction[:nulls]]`     |
//! | `i`  | `includes`           | comma-joined relation paths                   |
//! | `is` | `include_and_select` | comma-joined `name:col\|col`                  |
//! | `g`  | `group_by`           | comma-joined columns                          |
//! | `h`  | `having`             | same as `w`                                   |
//! | `c`  | `count`              | `true`/`false`                                |
//!
//! Inside every atom (column, operator, value, list entry) the characters
//! `%`, `,`, `:` and `|` are percent-escaped before joining, so separators
//! can never appear inside an atom. The assembled value is then escaped
//! once more for the query string.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::operator::FilterOperator;
use crate::query::{CollectionQuery, IncludeSelect, NullsOrder, Order, SortDirection, Where};

/// Separates the column, operator and value of a where item.
pub const WHERE_FIELD_SEPARATOR: &str = "_:";
/// Separates OR-ed items inside a group.
pub const WHERE_OR_SEPARATOR: &str = "_,";
/// Separates AND-ed groups.
pub const WHERE_AND_SEPARATOR: &str = "_|";
/// Separates list entries.
pub const LIST_SEPARATOR: char = ',';
/// Separates the parts of an order or include-select entry.
pub const ITEM_SEPARATOR: char = ':';
/// Separates the columns of an include-select entry.
pub const COLUMN_SEPARATOR: char = '|';

/// Characters escaped in a query-string value. The list and item
/// separators stay readable.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b',')
    .remove(b':');

/// Errors raised while decoding an encoded query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Invalid percent-escape or non UTF-8 content.
    #[error("key '{key}' is not valid percent-encoded UTF-8")]
    InvalidEncoding { key: String },

    /// A where/having item without exactly three fields.
    #[error("key '{key}' has malformed item '{item}': expected column_:operator_:value")]
    MalformedWhereItem { key: String, item: String },

    /// A pagination bound that is not a non-negative integer.
    #[error("key '{key}' expects a non-negative integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    /// A count flag that is not a boolean.
    #[error("key '{key}' expects a boolean, got '{value}'")]
    InvalidBool { key: String, value: String },

    /// An order entry with too many parts or unknown tokens.
    #[error("malformed order item '{item}'")]
    MalformedOrder { item: String },

    /// An include-select entry without a relation name.
    #[error("malformed include-select item '{item}'")]
    MalformedInclude { item: String },
}

/// Encode a query into its query-string form.
///
/// Unset and empty fields are omitted; an empty query encodes to `""`.
pub fn encode(query: &CollectionQuery) -> String {
    let mut encoder = QueryEncoder::new(query);
    encoder.encode_select();
    encoder.encode_where();
    encoder.encode_take();
    encoder.encode_skip();
    encoder.encode_order_by();
    encoder.encode_includes();
    encoder.encode_include_and_select();
    encoder.encode_group_by();
    encoder.encode_having();
    encoder.encode_count();
    encoder.params.join("&")
}

/// Decode a query string produced by [`encode`].
///
/// Absent or empty keys leave the field unset and unknown keys are ignored.
/// Malformed content is an error.
pub fn decode(input: &str) -> Result<CollectionQuery, CodecError> {
    let decoder = QueryDecoder::parse(input)?;
    let mut query = CollectionQuery::new();

    if let Some(value) = decoder.get("s") {
        query.select = decode_list("s", value)?;
    }
    if let Some(value) = decoder.get("w") {
        query.where_ = decode_where("w", value)?;
    }
    if let Some(value) = decoder.get("t") {
        query.take = Some(decode_number("t", value)?);
    }
    if let Some(value) = decoder.get("sk") {
        query.skip = Some(decode_number("sk", value)?);
    }
    if let Some(value) = decoder.get("o") {
        query.order_by = decode_order_by(value)?;
    }
    if let Some(value) = decoder.get("i") {
        query.includes = decode_list("i", value)?;
    }
    if let Some(value) = decoder.get("is") {
        query.include_and_select = decode_include_select(value)?;
    }
    if let Some(value) = decoder.get("g") {
        query.group_by = decode_list("g", value)?;
    }
    if let Some(value) = decoder.get("h") {
        query.having = decode_where("h", value)?;
    }
    if let Some(value) = decoder.get("c") {
        query.count = Some(decode_bool("c", value)?);
    }

    Ok(query)
}

struct QueryEncoder<'a> {
    query: &'a CollectionQuery,
    params: Vec<String>,
}

impl<'a> QueryEncoder<'a> {
    fn new(query: &'a CollectionQuery) -> Self {
        Self {
            query,
            params: Vec::with_capacity(10),
        }
    }

    fn push(&mut self, key: &str, value: &str) {
        self.params
            .push(format!("{key}={}", utf8_percent_encode(value, QUERY_VALUE)));
    }

    fn encode_select(&mut self) {
        if !self.query.select.is_empty() {
            let value = encode_list(&self.query.select);
            self.push("s", &value);
        }
    }

    fn encode_where(&mut self) {
        if !self.query.where_.is_empty() {
            let value = encode_where(&self.query.where_);
            self.push("w", &value);
        }
    }

    fn encode_take(&mut self) {
        if let Some(take) = self.query.take {
            self.push("t", &take.to_string());
        }
    }

    fn encode_skip(&mut self) {
        if let Some(skip) = self.query.skip {
            self.push("sk", &skip.to_string());
        }
    }

    fn encode_order_by(&mut self) {
        if !self.query.order_by.is_empty() {
            let value = self
                .query
                .order_by
                .iter()
                .map(encode_order)
                .collect::<Vec<_>>()
                .join(",");
            self.push("o", &value);
        }
    }

    fn encode_includes(&mut self) {
        if !self.query.includes.is_empty() {
            let value = encode_list(&self.query.includes);
            self.push("i", &value);
        }
    }

    fn encode_include_and_select(&mut self) {
        if !self.query.include_and_select.is_empty() {
            let value = self
                .query
                .include_and_select
                .iter()
                .map(|include| {
                    let columns = include
                        .select
                        .iter()
                        .map(|c| escape(c))
                        .collect::<Vec<_>>()
                        .join("|");
                    format!("{}:{}", escape(&include.name), columns)
                })
                .collect::<Vec<_>>()
                .join(",");
            self.push("is", &value);
        }
    }

    fn encode_group_by(&mut self) {
        if !self.query.group_by.is_empty() {
            let value = encode_list(&self.query.group_by);
            self.push("g", &value);
        }
    }

    fn encode_having(&mut self) {
        if !self.query.having.is_empty() {
            let value = encode_where(&self.query.having);
            self.push("h", &value);
        }
    }

    fn encode_count(&mut self) {
        if let Some(count) = self.query.count {
            self.push("c", if count { "true" } else { "false" });
        }
    }
}

struct QueryDecoder {
    pairs: Vec<(String, String)>,
}

impl QueryDecoder {
    fn parse(input: &str) -> Result<Self, CodecError> {
        let input = input.strip_prefix('?').unwrap_or(input);
        let mut pairs = Vec::new();
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let plus_decoded = raw.replace('+', " ");
            let value = percent_decode_str(&plus_decoded)
                .decode_utf8()
                .map_err(|_| CodecError::InvalidEncoding {
                    key: key.to_string(),
                })?;
            if !is_known_key(key) {
                tracing::debug!(key, "ignoring unknown collection query key");
            }
            pairs.push((key.to_string(), value.into_owned()));
        }
        Ok(Self { pairs })
    }

    /// First non-empty value for a key.
    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        "s" | "w" | "t" | "sk" | "o" | "i" | "is" | "g" | "h" | "c"
    )
}

fn escape(atom: &str) -> String {
    let mut escaped = String::with_capacity(atom.len());
    for ch in atom.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ',' => escaped.push_str("%2C"),
            ':' => escaped.push_str("%3A"),
            '|' => escaped.push_str("%7C"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(atom: &str, key: &str) -> Result<String, CodecError> {
    percent_decode_str(atom)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| CodecError::InvalidEncoding {
            key: key.to_string(),
        })
}

fn encode_list(items: &[String]) -> String {
    items.iter().map(|s| escape(s)).collect::<Vec<_>>().join(",")
}

fn decode_list(key: &str, value: &str) -> Result<Vec<String>, CodecError> {
    value
        .split(LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|s| unescape(s, key))
        .collect()
}

fn encode_where(groups: &[Vec<Where>]) -> String {
    groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(encode_where_item)
                .collect::<Vec<_>>()
                .join(WHERE_OR_SEPARATOR)
        })
        .collect::<Vec<_>>()
        .join(WHERE_AND_SEPARATOR)
}

fn encode_where_item(item: &Where) -> String {
    [
        escape(&item.column),
        escape(item.operator.as_str()),
        escape(&item.value),
    ]
    .join(WHERE_FIELD_SEPARATOR)
}

fn decode_where(key: &str, value: &str) -> Result<Vec<Vec<Where>>, CodecError> {
    let mut groups = Vec::new();
    for encoded_group in value.split(WHERE_AND_SEPARATOR) {
        if encoded_group.is_empty() {
            continue;
        }
        let encoded_items: Vec<&str> = encoded_group
            .split(WHERE_OR_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        let mut group = Vec::with_capacity(encoded_items.len());
        for item in encoded_items {
            group.push(decode_where_item(key, item)?);
        }
        groups.push(group);
    }
    Ok(groups)
}

fn decode_where_item(key: &str, item: &str) -> Result<Where, CodecError> {
    let parts: Vec<&str> = item.split(WHERE_FIELD_SEPARATOR).collect();
    let [column, operator, value] = parts.as_slice() else {
        return Err(CodecError::MalformedWhereItem {
            key: key.to_string(),
            item: item.to_string(),
        });
    };
    Ok(Where {
        column: unescape(column, key)?,
        operator: FilterOperator::parse(&unescape(operator, key)?),
        value: unescape(value, key)?,
    })
}

fn encode_order(order: &Order) -> String {
    let mut encoded = escape(&order.column);
    match (order.direction, order.nulls) {
        (None, None) => {}
        (Some(direction), None) => {
            encoded.push(ITEM_SEPARATOR);
            encoded.push_str(direction.as_str());
        }
        (direction, Some(nulls)) => {
            encoded.push(ITEM_SEPARATOR);
            encoded.push_str(direction.map(|d| d.as_str()).unwrap_or(""));
            encoded.push(ITEM_SEPARATOR);
            encoded.push_str(nulls.as_str());
        }
    }
    encoded
}

fn decode_order_by(value: &str) -> Result<Vec<Order>, CodecError> {
    value
        .split(LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(decode_order)
        .collect()
}

fn decode_order(item: &str) -> Result<Order, CodecError> {
    let malformed = || CodecError::MalformedOrder {
        item: item.to_string(),
    };
    let parts: Vec<&str> = item.split(ITEM_SEPARATOR).collect();
    if parts.len() > 3 || parts[0].is_empty() {
        return Err(malformed());
    }

    let direction = match parts.get(1) {
        None | Some(&"") => None,
        Some(token) => Some(SortDirection::parse(token).ok_or_else(malformed)?),
    };
    let nulls = match parts.get(2) {
        None | Some(&"") => None,
        Some(token) => Some(NullsOrder::parse(token).ok_or_else(malformed)?),
    };

    Ok(Order {
        column: unescape(parts[0], "o")?,
        direction,
        nulls,
    })
}

fn decode_include_select(value: &str) -> Result<Vec<IncludeSelect>, CodecError> {
    let mut includes = Vec::new();
    for item in value.split(LIST_SEPARATOR).filter(|s| !s.is_empty()) {
        let (name, columns) = item
            .split_once(ITEM_SEPARATOR)
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CodecError::MalformedInclude {
                item: item.to_string(),
            })?;
        let select = columns
            .split(COLUMN_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(|c| unescape(c, "is"))
            .collect::<Result<Vec<_>, _>>()?;
        includes.push(IncludeSelect {
            name: unescape(name, "is")?,
            select,
        });
    }
    Ok(includes)
}

fn decode_number(key: &str, value: &str) -> Result<u64, CodecError> {
    value.parse().map_err(|_| CodecError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn decode_bool(key: &str, value: &str) -> Result<bool, CodecError> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(CodecError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
