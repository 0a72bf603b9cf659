mod common;

use common::*;
use lineage_api::ApiError;
use lineage_app::{ControllerError, QueryController, ViewStateStore};
use lineage_core::{Direction, Entity, FilterPatch, GraphFilters, NodeId, NodeKind, ViewLevel};
use lineage_events::{Event, EventBus, Notifier};
use std::sync::Arc;
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(300);

struct Harness {
    api: Arc<ScriptedApi>,
    store: ViewStateStore,
    controller: QueryController,
    bus: EventBus,
}

fn harness(api: ScriptedApi) -> Harness {
    let api = Arc::new(api);
    let bus = EventBus::new();
    let store = ViewStateStore::default();
    store.mount(ViewLevel::Table);
    store.mount(ViewLevel::Column);
    let controller = QueryController::new(
        api.clone(),
        store.clone(),
        Notifier::new(bus.clone(), Duration::from_secs(2)),
        DEBOUNCE,
    );
    Harness {
        api,
        store,
        controller,
        bus,
    }
}

fn orders() -> Entity {
    Entity::new("t1", "orders", NodeKind::Table)
}

#[tokio::test(start_paused = true)]
async fn test_load_graph_installs_normalized_graph() {
    let h = harness(ScriptedApi::new().with_graph("t1", orders_payload()));

    let graph = h
        .controller
        .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default())
        .await
        .unwrap();

    assert_eq!(node_ids(&graph), vec!["t1", "t2", "t3"]);
    assert_eq!(graph.focal().unwrap().id, NodeId::from("t1"));

    let view = h.store.get_view(ViewLevel::Table);
    assert!(!view.is_loading);
    assert_eq!(view.render.unwrap().nodes.len(), 3);

    let events = h.bus.drain();
    assert!(matches!(events[0], Event::GraphLoading { level: ViewLevel::Table, .. }));
    assert!(events.contains(&Event::GraphLoaded {
        level: ViewLevel::Table,
        node_count: 3,
        edge_count: 2,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_load_sends_filters_as_query() {
    let h = harness(ScriptedApi::new().with_graph("c9", payload(vec![column("c9", "amount")], vec![])));
    let filters = GraphFilters {
        depth: 9,
        direction: Direction::Downstream,
        include_upstream_dependencies: true,
        include_container_nodes: false,
    };

    h.controller
        .load_graph(ViewLevel::Column, NodeId::from("c9"), filters)
        .await
        .unwrap();

    let calls = h.api.graph_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, NodeKind::Column);
    assert_eq!(calls[0].query.depth, GraphFilters::MAX_DEPTH);
    assert_eq!(calls[0].query.direction, Direction::Downstream);
    assert!(calls[0].query.include_upstream_dependencies);
    assert!(!calls[0].query.include_container_nodes);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_load_is_idempotent() {
    let h = harness(ScriptedApi::new().with_graph("t1", orders_payload()));
    let id = NodeId::from("t1");

    let first = h
        .controller
        .load_graph(ViewLevel::Table, id.clone(), GraphFilters::default())
        .await
        .unwrap();
    let second = h
        .controller
        .load_graph(ViewLevel::Table, id, GraphFilters::default())
        .await
        .unwrap();

    assert_eq!(node_ids(&first), node_ids(&second));
    assert_eq!(first.edge_count(), second.edge_count());
}

#[tokio::test(start_paused = true)]
async fn test_stale_graph_response_is_discarded() {
    let slow = payload(vec![table("slow", "slow_table")], vec![]);
    let fast = payload(vec![table("fast", "fast_table")], vec![]);
    let h = harness(
        ScriptedApi::new()
            .with_graph("slow", slow)
            .with_graph_delay("slow", Duration::from_millis(500))
            .with_graph("fast", fast)
            .with_graph_delay("fast", Duration::from_millis(10)),
    );
    let filters = GraphFilters::default();

    let (older, newer) = tokio::join!(
        h.controller
            .load_graph(ViewLevel::Table, NodeId::from("slow"), filters),
        h.controller
            .load_graph(ViewLevel::Table, NodeId::from("fast"), filters),
    );

    assert_eq!(older.unwrap_err(), ControllerError::Superseded);
    assert_eq!(node_ids(&newer.unwrap()), vec!["fast"]);

    let view = h.store.get_view(ViewLevel::Table);
    assert_eq!(node_ids(view.graph.as_ref().unwrap()), vec!["fast"]);
    assert!(!view.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_load_stops_loading() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_graph_delay("t1", Duration::from_secs(5)),
    );

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        h.controller
            .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default()),
    )
    .await;

    assert!(abandoned.is_err());
    let view = h.store.get_view(ViewLevel::Table);
    assert!(!view.is_loading);
    assert!(view.graph.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_load_leaves_newer_load_running() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_graph_delay("t1", Duration::from_secs(5)),
    );
    let c = &h.controller;

    let newer = tokio::spawn({
        let c = c.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            c.load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default())
                .await
        }
    });
    let older = tokio::time::timeout(
        Duration::from_millis(100),
        c.load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default()),
    )
    .await;

    assert!(older.is_err());
    assert!(h.store.get_view(ViewLevel::Table).is_loading);
    assert_eq!(node_ids(&newer.await.unwrap().unwrap()), vec!["t1", "t2", "t3"]);
    assert!(!h.store.get_view(ViewLevel::Table).is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_previous_graph() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_graph_error(
                "t2",
                ApiError::Status {
                    status: 500,
                    message: "boom".into(),
                },
            ),
    );
    h.controller
        .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default())
        .await
        .unwrap();
    h.bus.drain();

    let err = h
        .controller
        .load_graph(ViewLevel::Table, NodeId::from("t2"), GraphFilters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Fetch(ApiError::Status { status: 500, .. })));
    let view = h.store.get_view(ViewLevel::Table);
    assert!(!view.is_loading);
    assert_eq!(node_ids(view.graph.as_ref().unwrap()), vec!["t1", "t2", "t3"]);
    assert!(
        h.bus
            .drain()
            .iter()
            .any(|e| matches!(e, Event::ShowError { message } if message.contains("boom")))
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_graph_is_stored_and_announced() {
    let h = harness(ScriptedApi::new().with_graph("t1", payload(vec![], vec![])));

    let graph = h
        .controller
        .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default())
        .await
        .unwrap();

    assert!(graph.is_empty());
    assert!(h.store.get_view(ViewLevel::Table).has_graph());
    let events = h.bus.drain();
    assert!(events.contains(&Event::GraphEmpty {
        level: ViewLevel::Table
    }));
    assert!(!events.iter().any(|e| matches!(e, Event::GraphLoaded { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_data_quality_issues_raise_one_warning() {
    let h = harness(ScriptedApi::new().with_graph(
        "t1",
        payload(
            vec![table("t1", "orders")],
            vec![edge("t1", "t2", "copy"), edge("t9", "t1", "copy")],
        ),
    ));

    let graph = h
        .controller
        .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default())
        .await
        .unwrap();

    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    let warnings: Vec<_> = h
        .bus
        .drain()
        .into_iter()
        .filter(|e| matches!(e, Event::ShowWarning { .. }))
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_levels_load_independently() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_graph("c1", payload(vec![column("c1", "orders.amount")], vec![])),
    );

    let (table, column) = tokio::join!(
        h.controller
            .load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default()),
        h.controller
            .load_graph(ViewLevel::Column, NodeId::from("c1"), GraphFilters::default()),
    );

    assert_eq!(table.unwrap().node_count(), 3);
    assert_eq!(column.unwrap().node_count(), 1);
    assert_eq!(h.store.get_view(ViewLevel::Table).graph.unwrap().node_count(), 3);
    assert_eq!(h.store.get_view(ViewLevel::Column).graph.unwrap().node_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_direction_change_reloads_once() {
    let h = harness(ScriptedApi::new().with_graph("t1", orders_payload()));
    h.controller
        .select_entity(ViewLevel::Table, &orders())
        .await
        .unwrap();

    let changed = h
        .controller
        .set_filters(ViewLevel::Table, FilterPatch::direction(Direction::Upstream))
        .await
        .unwrap();

    assert!(changed);
    let calls = h.api.graph_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].query.direction, Direction::Both);
    assert_eq!(calls[1].query.direction, Direction::Upstream);
    assert_eq!(calls[1].query.depth, 2);
    assert_eq!(calls[1].entity_id, NodeId::from("t1"));
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_filters_do_not_reload() {
    let h = harness(ScriptedApi::new().with_graph("t1", orders_payload()));
    h.controller
        .select_entity(ViewLevel::Table, &orders())
        .await
        .unwrap();

    let changed = h
        .controller
        .set_filters(ViewLevel::Table, FilterPatch::depth(2))
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(h.api.graph_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_filters_without_selection_only_update_state() {
    let h = harness(ScriptedApi::new());

    let changed = h
        .controller
        .set_filters(ViewLevel::Column, FilterPatch::depth(4))
        .await
        .unwrap();

    assert!(changed);
    assert!(h.api.graph_calls().is_empty());
    assert_eq!(h.store.get_view(ViewLevel::Column).filters.depth, 4);
    assert_eq!(h.store.get_view(ViewLevel::Table).filters.depth, 2);
}

#[tokio::test(start_paused = true)]
async fn test_select_entity_updates_search_box() {
    let h = harness(ScriptedApi::new().with_graph("t1", orders_payload()));
    h.store
        .set_search(ViewLevel::Table, "ord", vec![orders()]);

    h.controller
        .select_entity(ViewLevel::Table, &orders())
        .await
        .unwrap();

    let view = h.store.get_view(ViewLevel::Table);
    assert_eq!(view.search_text, "orders");
    assert!(view.search_results.is_empty());
    assert_eq!(view.selected_entity.unwrap().id, NodeId::from("t1"));
}

#[tokio::test(start_paused = true)]
async fn test_selection_discards_pending_search() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_search("ord", vec![orders(), Entity::new("t4", "orders_archive", NodeKind::Table)]),
    );
    let c = &h.controller;

    let (pending, selected) = tokio::join!(c.search(ViewLevel::Table, "ord"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        c.select_entity(ViewLevel::Table, &orders()).await
    });

    assert_eq!(pending.unwrap_err(), ControllerError::Superseded);
    assert_eq!(selected.unwrap().node_count(), 3);
    assert!(h.api.search_calls().is_empty());
    let view = h.store.get_view(ViewLevel::Table);
    assert_eq!(view.search_text, "orders");
    assert!(view.search_results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_selection_discards_in_flight_search() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_search("ord", vec![orders()])
            .with_search_delay("ord", Duration::from_millis(500)),
    );
    let c = &h.controller;

    let (pending, _) = tokio::join!(c.search(ViewLevel::Table, "ord"), async {
        // Past the debounce, while the search request is outstanding.
        tokio::time::sleep(Duration::from_millis(400)).await;
        c.select_entity(ViewLevel::Table, &orders()).await
    });

    assert_eq!(pending.unwrap_err(), ControllerError::Superseded);
    assert_eq!(h.api.search_calls(), vec!["ord"]);
    assert!(h.store.get_view(ViewLevel::Table).search_results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_issues_one_search() {
    let h = harness(ScriptedApi::new().with_search("ord", vec![orders()]));
    let c = &h.controller;

    let (first, second, third) = tokio::join!(
        c.search(ViewLevel::Table, "o"),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            c.search(ViewLevel::Table, "or").await
        },
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            c.search(ViewLevel::Table, "ord").await
        },
    );

    assert_eq!(first.unwrap_err(), ControllerError::Superseded);
    assert_eq!(second.unwrap_err(), ControllerError::Superseded);
    assert_eq!(third.unwrap(), vec![orders()]);
    assert_eq!(h.api.search_calls(), vec!["ord"]);

    let view = h.store.get_view(ViewLevel::Table);
    assert_eq!(view.search_text, "ord");
    assert_eq!(view.search_results, vec![orders()]);
}

#[tokio::test(start_paused = true)]
async fn test_searches_outside_window_both_run() {
    let h = harness(ScriptedApi::new());

    h.controller.search(ViewLevel::Table, "ord").await.unwrap();
    h.controller.search(ViewLevel::Table, "orders").await.unwrap();

    assert_eq!(h.api.search_calls(), vec!["ord", "orders"]);
}

#[tokio::test(start_paused = true)]
async fn test_clearing_search_is_immediate() {
    let h = harness(ScriptedApi::new().with_search("ord", vec![orders()]));
    let c = &h.controller;

    let (pending, cleared) = tokio::join!(c.search(ViewLevel::Table, "ord"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let start = tokio::time::Instant::now();
        let result = c.search(ViewLevel::Table, "  ").await;
        (result, start.elapsed())
    });

    assert_eq!(pending.unwrap_err(), ControllerError::Superseded);
    let (result, elapsed) = cleared;
    assert!(result.unwrap().is_empty());
    assert_eq!(elapsed, Duration::ZERO);
    assert!(h.api.search_calls().is_empty());
    assert!(h.store.get_view(ViewLevel::Table).search_results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_search_results_are_discarded() {
    let h = harness(
        ScriptedApi::new()
            .with_search("ord", vec![orders()])
            .with_search_delay("ord", Duration::from_millis(1000))
            .with_search("cust", vec![Entity::new("t7", "customers", NodeKind::Table)]),
    );
    let c = &h.controller;

    let (older, newer) = tokio::join!(c.search(ViewLevel::Table, "ord"), async {
        // Past the first debounce, while its request is still in flight.
        tokio::time::sleep(Duration::from_millis(400)).await;
        c.search(ViewLevel::Table, "cust").await
    });

    assert_eq!(older.unwrap_err(), ControllerError::Superseded);
    assert_eq!(newer.unwrap().len(), 1);
    let view = h.store.get_view(ViewLevel::Table);
    assert_eq!(view.search_results[0].name, "customers");
}

#[tokio::test(start_paused = true)]
async fn test_search_failure_notifies() {
    let h = harness(ScriptedApi::new().with_search_error("ord", ApiError::Http("refused".into())));

    let err = h.controller.search(ViewLevel::Column, "ord").await.unwrap_err();

    assert_eq!(err, ControllerError::Fetch(ApiError::Http("refused".into())));
    assert!(
        h.bus
            .drain()
            .iter()
            .any(|e| matches!(e, Event::ShowError { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_drops_in_flight_load() {
    let h = harness(
        ScriptedApi::new()
            .with_graph("t1", orders_payload())
            .with_graph_delay("t1", Duration::from_millis(200)),
    );
    let c = &h.controller;

    let (load, ()) = tokio::join!(
        c.load_graph(ViewLevel::Table, NodeId::from("t1"), GraphFilters::default()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            c.reset(ViewLevel::Table);
        },
    );

    assert_eq!(load.unwrap_err(), ControllerError::Superseded);
    let view = h.store.get_view(ViewLevel::Table);
    assert!(view.graph.is_none());
    assert!(!view.is_loading);
    assert!(h.bus.drain().contains(&Event::GraphReset {
        level: ViewLevel::Table
    }));
}
