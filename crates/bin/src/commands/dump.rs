//! Dump of the persisted representation of every document.

use serde_json::{Map as JsonMap, Value as JsonValue};
use substrata::{ContainerStore, InMemoryEngine, ObjectConfig};

use crate::output::{OutputFormat, print_json};

/// Run the `dump` command
///
/// Output shape: `{"<container>": {"<document>": <snapshot>}}`.
pub fn run(
    engine: &InMemoryEngine,
    config: &ObjectConfig,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut containers = JsonMap::new();
    for container_id in engine.container_ids()? {
        let Some(container) = engine.open_container(&container_id)? else {
            continue;
        };
        let mut documents = JsonMap::new();
        for (document_id, root_tag) in container.document_ids() {
            let Some(document) = container.open_document(&document_id) else {
                continue;
            };
            let snapshot = if root_tag == config.list_layout.root {
                document.get_or_create_synced_list(&config.list_layout).snapshot()
            } else {
                document.get_or_create_synced_map(&config.map_layout).snapshot()
            };
            documents.insert(document_id, snapshot);
        }
        containers.insert(container_id, JsonValue::Object(documents));
    }
    print_json(&JsonValue::Object(containers), format)?;
    Ok(())
}
