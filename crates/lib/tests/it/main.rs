/*! Integration tests for Substrata.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - address: Token shapes and id allocation
 * - codec: Token encoding and decoding through a resolver
 * - map: The attached map contract (get/put/remove, ownership, cache)
 * - list: The attached list contract
 * - attach: Attaching local subtrees, placement and idempotence
 * - root: Object roots, configuration and participants
 * - replication: Sessions and replicas editing the same data
 * - engine: The synchronized substrate and persistence
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("substrata=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod map;
mod replication;
mod root;
