// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests of a controller restarting on top of an existing registry

use dropshot::test_util::LogContext;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingIfExists;
use dropshot::ConfigLoggingLevel;
use netid_allocator::assignments::ReplaySummary;
use netid_allocator::config::Config;
use netid_allocator::registry::InMemoryRegistry;
use netid_allocator::NetIdAllocator;
use netid_allocator::NetIdAssignments;
use netid_allocator::NetNamespaceRegistry;
use netid_allocator::GLOBAL_NETID;
use std::sync::Arc;

fn test_setup_log(test_name: &str) -> LogContext {
    let log_config = ConfigLogging::File {
        level: ConfigLoggingLevel::Trace,
        path: "UNUSED".into(),
        if_exists: ConfigLoggingIfExists::Fail,
    };
    LogContext::new(test_name, &log_config)
}

fn dev_config() -> Config {
    let manifest = std::env::var("CARGO_MANIFEST_DIR")
        .expect("Cannot access manifest directory");
    Config::from_file(format!("{manifest}/configs/config-dev.toml")).unwrap()
}

fn start_controller(
    log: &slog::Logger,
    config: &Config,
    registry: Arc<InMemoryRegistry>,
) -> (NetIdAssignments<Arc<InMemoryRegistry>>, ReplaySummary) {
    let allocator = NetIdAllocator::new(config.netid_range).unwrap();
    let assignments = NetIdAssignments::new(
        log,
        allocator,
        registry,
        config.admin_namespaces.iter().cloned(),
    )
    .unwrap();
    let summary = assignments.replay().unwrap();
    (assignments, summary)
}

#[test]
fn test_restart_restores_assignments() {
    let logctx = test_setup_log("test_restart_restores_assignments");
    let config = dev_config();
    let registry = Arc::new(InMemoryRegistry::new());

    let (first, summary) =
        start_controller(&logctx.log, &config, registry.clone());
    assert_eq!(summary, ReplaySummary::default());

    assert_eq!(first.assign("default").unwrap(), GLOBAL_NETID);
    let names: Vec<String> = (0..10).map(|i| format!("tenant-{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        assert_eq!(first.assign(name).unwrap(), 201 + i as u32);
    }
    assert_eq!(first.revoke("tenant-3").unwrap(), Some(204));
    drop(first);

    // A new process starts from the registry alone.
    let (second, summary) =
        start_controller(&logctx.log, &config, registry.clone());
    assert_eq!(summary.restored, 9);
    assert_eq!(summary.global, 1);
    assert_eq!(summary.rejected(), 0);
    assert_eq!(second.allocator().free(), 100 - 9);
    assert_eq!(second.netid("tenant-0"), Some(201));
    assert_eq!(second.netid("tenant-3"), None);

    // The NetID freed before the restart is the next one handed out.
    assert_eq!(second.assign("tenant-new").unwrap(), 204);
    assert_eq!(second.assign("tenant-0").unwrap(), 201);
    assert_eq!(registry.list().unwrap().len(), 11);
    logctx.cleanup_successful();
}

#[test]
fn test_exhaustion_surfaces_to_caller() {
    let logctx = test_setup_log("test_exhaustion_surfaces_to_caller");
    let config = dev_config();
    let registry = Arc::new(InMemoryRegistry::new());
    let (assignments, _) =
        start_controller(&logctx.log, &config, registry.clone());

    for i in 0..100 {
        assignments.assign(&format!("tenant-{i}")).unwrap();
    }
    let err = assignments.assign("one-too-many").unwrap_err();
    assert_eq!(
        err.to_string(),
        "no NetIDs available in the range 201-300",
    );
    assert_eq!(registry.get("one-too-many"), None);

    assignments.revoke("tenant-42").unwrap();
    assert_eq!(assignments.assign("one-too-many").unwrap(), 243);
    assert_eq!(assignments.allocator().free(), 0);
    logctx.cleanup_successful();
}
