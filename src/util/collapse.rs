//! Collapsing of list-valued configuration tables

use toml::{Table, Value};

use crate::error::{Error, Result};

/// Picks the single value that replaces a non-empty list
pub type ItemSelector<'a> = &'a dyn Fn(&[Value]) -> Value;

fn last_item(items: &[Value]) -> Value {
    // Callers only hand over non-empty lists.
    items[items.len() - 1].clone()
}

/// Collapse every array value of a table to one item.
///
/// - keys listed in `exclude` keep their array untouched
/// - empty arrays drop the key entirely
/// - non-array values pass through
///
/// The last item is selected unless `selector` says otherwise.
pub fn collapse(
    config: &Value,
    exclude: &[&str],
    selector: Option<ItemSelector<'_>>,
) -> Result<Table> {
    let table = config.as_table().ok_or_else(|| {
        Error::config_validation(format!(
            "Unexpected config type '{}', table expected",
            config.type_str()
        ))
    })?;

    let default_selector: ItemSelector<'_> = &last_item;
    let select = selector.unwrap_or(default_selector);
    let mut collapsed = Table::new();
    for (key, value) in table {
        match value {
            Value::Array(items) if exclude.contains(&key.as_str()) => {
                collapsed.insert(key.clone(), Value::Array(items.clone()));
            }
            Value::Array(items) => {
                if !items.is_empty() {
                    collapsed.insert(key.clone(), select(items));
                }
            }
            other => {
                collapsed.insert(key.clone(), other.clone());
            }
        }
    }
    Ok(collapsed)
}
