//! Export option merging.

use serde_json::{Map, Value};

/// Options forwarded to the export command, keyed by option name.
pub type ExportOptions = Map<String, Value>;

/// Option key carrying the public URL of the exported site.
pub const URL_OPTION: &str = "url";

/// Merge configured options with the caller's URL.
///
/// `base` is copied and left untouched. The caller's `url` is inserted only
/// when `base` has no `url` key, so configuration always wins; an absent
/// caller URL is inserted as `null`.
///
/// # Examples
/// ```
/// use serde_json::{Map, Value, json};
/// use sensitivity_tasks::merge_options;
///
/// let mut base = Map::new();
/// base.insert("url".into(), json!("http://configured"));
/// let merged = merge_options(&base, Some("http://caller"));
/// assert_eq!(merged.get("url"), Some(&json!("http://configured")));
///
/// let merged = merge_options(&Map::new(), None);
/// assert_eq!(merged.get("url"), Some(&Value::Null));
/// ```
pub fn merge_options(base: &ExportOptions, url: Option<&str>) -> ExportOptions {
    let mut merged = base.clone();
    if !merged.contains_key(URL_OPTION) {
        let value = url.map_or(Value::Null, |url| Value::String(url.to_owned()));
        merged.insert(URL_OPTION.to_owned(), value);
    }
    merged
}
