use std::collections::HashMap;
use tether::application::Snapshot;
use tether::engine::{ContainerEngine, ContainerSpec, ContainerState, EngineCall, MemoryEngine};
use tether::service::labels::{LABEL_APP_NAME, LABEL_LINKS, LABEL_SERVICE_NAME};
use tether::{Application, LabelCodec, NetMode, Service, TetherError};

fn three_tier() -> Application {
    Application::with_services(
        "shop",
        vec![
            Service::new("web", "shop").link("api", "backend"),
            Service::new("api", "shop").link("db", "database"),
            Service::new("db", "shop"),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_linked_database_and_web() {
    let engine = MemoryEngine::new();
    let app = Application::with_services(
        "shop",
        vec![
            Service::new("db", "shop"),
            Service::new("web", "shop").link("db", "database"),
        ],
    )
    .unwrap();

    assert_eq!(app.topology(false).unwrap(), vec!["db", "web"]);
    assert_eq!(app.topology(true).unwrap(), vec!["web", "db"]);

    app.start(&engine).await.unwrap();
    assert_eq!(engine.started(), vec!["db", "web"]);

    app.stop(&engine).await.unwrap();
    assert_eq!(engine.stopped(), vec!["web", "db"]);
    assert_eq!(engine.state("db"), Some(ContainerState::Exited));
}

#[tokio::test]
async fn test_shared_network_stack() {
    let engine = MemoryEngine::new();
    let app = Application::with_services(
        "shop",
        vec![
            Service::new("web", "shop"),
            Service::new("proxy", "shop").net(NetMode::Container("web".to_string())),
        ],
    )
    .unwrap();

    assert_eq!(app.topology(false).unwrap(), vec!["web", "proxy"]);

    app.start(&engine).await.unwrap();
    assert_eq!(engine.spec("proxy").unwrap().network_mode, "container:web");
}

#[tokio::test]
async fn test_unmanaged_volume_source() {
    let engine = MemoryEngine::new();
    engine
        .create_container(&ContainerSpec {
            name: "data".to_string(),
            network_mode: "none".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let app =
        Application::with_services("shop", vec![Service::new("app", "shop").volumes_from("data")])
            .unwrap();

    let graph = app.graph().unwrap();
    let full = tether::graph::start_order(&graph).unwrap();
    assert_eq!(full, vec!["data", "app"]);
    assert_eq!(app.external_dependencies().unwrap(), vec!["data"]);

    let progress = app.start(&engine).await.unwrap();
    assert_eq!(progress.completed, vec!["app"]);
    assert_eq!(engine.started(), vec!["app"]);

    let progress = app.stop(&engine).await.unwrap();
    assert_eq!(progress.completed, vec!["app"]);
    assert_eq!(engine.stopped(), vec!["app"]);
}

#[tokio::test]
async fn test_start_halts_on_second_failure() {
    let engine = MemoryEngine::new();
    engine.fail_on_start("api");

    let err = three_tier().start(&engine).await.unwrap_err();
    match &err {
        TetherError::EngineOperation {
            service, completed, ..
        } => {
            assert_eq!(service, "api");
            assert_eq!(completed, &vec!["db".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.completed(), ["db".to_string()]);

    let calls = engine.calls();
    assert!(!calls.contains(&EngineCall::Create("web".to_string())));
    assert!(!calls.contains(&EngineCall::Start("web".to_string())));
}

#[tokio::test]
async fn test_stop_halts_on_failure() {
    let engine = MemoryEngine::new();
    let app = three_tier();
    app.start(&engine).await.unwrap();
    engine.fail_on_stop("api");

    let err = app.stop(&engine).await.unwrap_err();
    assert_eq!(err.completed(), ["web".to_string()]);
    assert_eq!(engine.state("db"), Some(ContainerState::Running));
}

#[tokio::test]
async fn test_discovery_rebuilds_application() {
    let engine = MemoryEngine::new();
    let original = Application::with_services(
        "shop",
        vec![
            Service::new("web", "shop").link("api", "backend"),
            Service::new("api", "shop")
                .link("db", "database")
                .volumes_from("cache"),
            Service::new("db", "shop"),
            Service::new("cache", "shop"),
            Service::new("proxy", "shop").net(NetMode::Container("web".to_string())),
        ],
    )
    .unwrap();
    original.start(&engine).await.unwrap();

    let discovered = Application::from_engine("shop", &engine).await.unwrap();
    assert_eq!(discovered.len(), original.len());
    for service in original.services() {
        assert_eq!(discovered.service(&service.name), Some(service));
    }
    assert_eq!(
        discovered.topology(false).unwrap(),
        original.topology(false).unwrap()
    );

    let progress = discovered.stop(&engine).await.unwrap();
    assert_eq!(progress.completed, original.topology(true).unwrap());
}

#[tokio::test]
async fn test_shared_snapshot_lists_once() {
    let engine = MemoryEngine::new();
    three_tier().start(&engine).await.unwrap();
    engine.fail_on_stop("web");
    let listings = |engine: &MemoryEngine| {
        engine
            .calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::List))
            .count()
    };
    let before = listings(&engine);

    let snapshot = Snapshot::fetch("shop", &engine).await.unwrap();
    let app = Application::from_snapshot(&snapshot).unwrap();
    let statuses = app.status_in(&snapshot).unwrap();
    assert!(statuses.iter().all(|s| s.container.is_some()));

    let progress = app.start_in(&engine, &snapshot).await.unwrap();
    assert_eq!(progress.completed, vec!["db", "api", "web"]);

    let err = app.stop_in(&engine, &snapshot).await.unwrap_err();
    assert!(err.completed().is_empty());
    assert_eq!(listings(&engine), before + 1);
}

#[tokio::test]
async fn test_discovery_scoped_to_application() {
    let engine = MemoryEngine::new();
    three_tier().start(&engine).await.unwrap();
    Application::with_services("blog", vec![Service::new("blog-web", "blog")])
        .unwrap()
        .start(&engine)
        .await
        .unwrap();

    let blog = Application::from_engine("blog", &engine).await.unwrap();
    assert_eq!(blog.topology(false).unwrap(), vec!["blog-web"]);
}

#[tokio::test]
async fn test_discovery_of_unknown_application() {
    let engine = MemoryEngine::new();
    let err = Application::from_engine("ghost", &engine).await.unwrap_err();
    assert!(matches!(err, TetherError::Lookup(_)));
}

#[tokio::test]
async fn test_discovery_with_malformed_labels() {
    let engine = MemoryEngine::new();
    let labels: HashMap<String, String> = [
        (LABEL_APP_NAME, "shop"),
        (LABEL_SERVICE_NAME, "web"),
        (LABEL_LINKS, "db:database"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    engine
        .create_container(&ContainerSpec {
            name: "web".to_string(),
            labels,
            network_mode: "bridge".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = Application::from_engine("shop", &engine).await.unwrap_err();
    assert!(matches!(err, TetherError::MalformedMetadata(_)));
}

#[tokio::test]
async fn test_discovery_through_trait_object() {
    let engine = MemoryEngine::new();
    three_tier().start(&engine).await.unwrap();

    let dyn_engine: &dyn ContainerEngine = &engine;
    let app = Application::from_engine("shop", dyn_engine).await.unwrap();
    assert_eq!(app.topology(false).unwrap(), vec!["db", "api", "web"]);
}

#[test]
fn test_cycle_between_volume_and_link() {
    let app = Application::with_services(
        "shop",
        vec![
            Service::new("A", "shop").volumes_from("B"),
            Service::new("B", "shop").link("A", "alias"),
        ],
    )
    .unwrap();

    match app.topology(false) {
        Err(TetherError::DependencyCycle { nodes }) => assert_eq!(nodes, vec!["A", "B"]),
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn test_order_independent_of_insertion() {
    let services = vec![
        Service::new("worker", "shop").link("queue", "queue"),
        Service::new("queue", "shop"),
        Service::new("web", "shop").link("db", "db"),
        Service::new("db", "shop").volumes_from("backup"),
        Service::new("metrics", "shop"),
    ];
    let forward = Application::with_services("shop", services.clone()).unwrap();
    let backward = Application::with_services("shop", services.into_iter().rev()).unwrap();

    let start = forward.topology(false).unwrap();
    assert_eq!(start, backward.topology(false).unwrap());

    let mut reversed = start.clone();
    reversed.reverse();
    assert_eq!(forward.topology(true).unwrap(), reversed);
}

#[test]
fn test_labels_survive_round_trip() {
    let service = Service::new("api", "shop")
        .link("db", "database")
        .volumes_from("cache")
        .net(NetMode::Container("vpn".to_string()));

    let labels = LabelCodec::encode(&service).unwrap();
    assert_eq!(LabelCodec::decode(&labels).unwrap(), service);
}

#[test]
fn test_self_dependency_rejected() {
    let result = Application::with_services(
        "shop",
        vec![Service::new("web", "shop").net(NetMode::Container("web".to_string()))],
    );
    assert!(matches!(result, Err(TetherError::Configuration(_))));
}
