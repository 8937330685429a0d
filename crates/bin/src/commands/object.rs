//! Commands that read and write the object's root map.

use substrata::{NodeValue, ObjectRoot, Placement};

use crate::output::{OutputFormat, print_json, print_table};

/// Parses a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> NodeValue {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => NodeValue::from(json),
        Err(_) => NodeValue::from(raw),
    }
}

/// Run the `put` command
pub fn put(
    object: &ObjectRoot,
    key: &str,
    raw: &str,
    new_container: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let placement = if new_container {
        Placement::NewContainer
    } else {
        Placement::SameContainer
    };
    let stored = object.put_with(key, parse_value(raw), placement)?;

    match stored.address() {
        Some(address) => match format {
            OutputFormat::Human => println!("Stored {key} at {address}"),
            OutputFormat::Json => {
                let value = serde_json::json!({ "key": key, "address": address.serialize() });
                println!("{}", serde_json::to_string(&value)?);
            }
        },
        None => match format {
            OutputFormat::Human => println!("Stored {key}"),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&serde_json::json!({ "key": key }))?)
            }
        },
    }
    Ok(())
}

/// Run the `get` command
pub fn get(
    object: &ObjectRoot,
    key: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match object.get(key)? {
        Some(value) => print_json(&value.to_json()?, format)?,
        None => {
            if format == OutputFormat::Json {
                println!("null");
            } else {
                println!("No value stored under '{key}'.");
            }
        }
    }
    Ok(())
}

/// Run the `remove` command
pub fn remove(
    object: &ObjectRoot,
    key: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let removed = object.remove(key)?;
    match format {
        OutputFormat::Human if removed => println!("Removed {key}"),
        OutputFormat::Human => println!("No value stored under '{key}'."),
        OutputFormat::Json => {
            let value = serde_json::json!({ "key": key, "removed": removed });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Run the `keys` command
pub fn keys(object: &ObjectRoot, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let keys = object.keys()?;
    match format {
        OutputFormat::Human => {
            if keys.is_empty() {
                println!("The object is empty.");
                return Ok(());
            }
            let mut rows = Vec::with_capacity(keys.len());
            for key in &keys {
                let kind = object
                    .get(key)?
                    .map(|value| value.type_name())
                    .unwrap_or("missing");
                rows.push(vec![key.clone(), kind.to_string()]);
            }
            print_table(&["KEY", "TYPE"], &rows);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&keys)?),
    }
    Ok(())
}

/// Run the `show` command
pub fn show(object: &ObjectRoot, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&object.to_json()?, format)?;
    Ok(())
}
