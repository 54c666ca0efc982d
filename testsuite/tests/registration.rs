#![cfg(test)]
#![allow(
    clippy::panic_in_result_fn,
    reason = "tests assert inside functions returning a Result"
)]

use futures::future::join_all;
use ssp::backend::{Accessor, NoObservation, Registry, RegistryConfig, RegistrationState};
use ssp::bus::MessageBus;
use ssp::model::{graph_proxy_uri, AccessCode, DataOrigin, Literal, RegistrationError, Term};
use ssp::CacheKind;
use ssp_testsuite::{
    iri, origin, slow_cache_bus, value_predicate, MockAccessor, RecordingObserver, TestGateway,
};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[tokio::test]
async fn registered_origin_is_cached_and_routed() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let accessor = Arc::new(MockAccessor::new());
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));

    registry.register_data_origin(origin("lamp", false)).await?;

    assert!(gateway.is_cached(&iri("lamp")).await?);
    assert_eq!(
        gateway.data_origin_uris().await?,
        vec![graph_proxy_uri(iri("lamp").as_ref())]
    );
    assert_eq!(
        registry.state(&"lamp".to_owned()),
        Some(RegistrationState::RouteRegistered)
    );
    assert_eq!(accessor.reads(), 1);
    Ok(())
}

#[tokio::test]
async fn registering_twice_is_a_no_op() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let accessor = Arc::new(MockAccessor::new());
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));

    registry.register_data_origin(origin("lamp", false)).await?;
    registry.register_data_origin(origin("lamp", false)).await?;

    assert_eq!(accessor.reads(), 1);
    assert_eq!(gateway.data_origin_uris().await?.len(), 1);
    assert_eq!(registry.data_origins().len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_origins_with_one_graph_have_one_winner() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let first_accessor = Arc::new(MockAccessor::new());
    first_accessor.set_value(1);
    let second_accessor = Arc::new(MockAccessor::new());
    second_accessor.set_value(2);
    let first = gateway.registry("first", first_accessor, Arc::new(NoObservation));
    let second = gateway.registry("second", second_accessor, Arc::new(NoObservation));
    let shared = iri("shared");

    let (first_result, second_result) = tokio::join!(
        first.register_data_origin(DataOrigin::new("a".to_owned(), shared.clone(), false)),
        second.register_data_origin(DataOrigin::new("b".to_owned(), shared.clone(), false)),
    );

    let (winner_value, loser_result, loser, loser_id) =
        match (first_result.is_ok(), second_result.is_ok()) {
            (true, false) => (1_i64, second_result, &second, "b"),
            (false, true) => (2_i64, first_result, &first, "a"),
            _ => {
                return Err(format!(
                    "Expected exactly one successful registration: {first_result:?}, {second_result:?}"
                )
                .into())
            }
        };
    assert!(matches!(
        loser_result,
        Err(RegistrationError::GraphNameConflict { .. })
    ));
    assert!(loser.data_origin(&loser_id.to_owned()).is_none());
    assert_eq!(gateway.data_origin_uris().await?.len(), 1);
    let cached = gateway
        .bus()
        .get_named_graph(shared.clone())
        .await?
        .ok_or("shared graph is not cached")?;
    assert_eq!(cached.graph().len(), 1);
    let value = cached
        .graph()
        .object_for_subject_predicate(&shared, &value_predicate())
        .ok_or("status has no value")?;
    assert_eq!(value.into_owned(), Term::from(Literal::from(winner_value)));
    Ok(())
}

#[tokio::test]
async fn many_concurrent_registrations_leave_one_entry_per_graph() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let registries: Vec<Registry<String>> = (0..8)
        .map(|i| {
            gateway.registry(
                &format!("backend-{i}"),
                Arc::new(MockAccessor::new()),
                Arc::new(NoObservation),
            )
        })
        .collect();

    let registrations = registries.iter().enumerate().flat_map(|(i, registry)| {
        ["x", "y"].into_iter().map(move |graph| {
            registry.register_data_origin(DataOrigin::new(format!("{graph}-{i}"), iri(graph), false))
        })
    });
    let results = join_all(registrations).await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 2);
    let mut uris = gateway.data_origin_uris().await?;
    uris.sort();
    assert_eq!(
        uris,
        vec![
            graph_proxy_uri(iri("x").as_ref()),
            graph_proxy_uri(iri("y").as_ref())
        ]
    );
    let mut cached = gateway.bus().cached_graph_names().await?;
    cached.sort();
    assert_eq!(cached, vec![iri("x"), iri("y")]);
    Ok(())
}

#[tokio::test]
async fn failing_origin_is_not_registered() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let accessor = Arc::new(MockAccessor::new());
    accessor.set_failure(Some(AccessCode::BadGateway));
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));

    let result = registry.register_data_origin(origin("lamp", false)).await;

    assert!(matches!(result, Err(RegistrationError::Access(_))));
    assert!(!gateway.is_cached(&iri("lamp")).await?);
    assert!(gateway.data_origin_uris().await?.is_empty());

    accessor.set_failure(None);
    registry.register_data_origin(origin("lamp", false)).await?;
    assert!(gateway.is_cached(&iri("lamp")).await?);
    Ok(())
}

#[tokio::test]
async fn observation_starts_after_registration() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let observer = Arc::new(RecordingObserver::new());
    let registry = gateway.registry(
        "mock",
        Arc::new(MockAccessor::new()),
        Arc::clone(&observer),
    );

    registry.register_data_origin(origin("lamp", true)).await?;
    registry.register_data_origin(origin("door", false)).await?;

    assert_eq!(observer.observed(), 1);
    let sink = observer.sink("lamp").ok_or("lamp is not observed")?;
    assert!(sink.is_active());
    assert_eq!(
        registry.state(&"lamp".to_owned()),
        Some(RegistrationState::Observing)
    );

    registry.unregister_data_origin(&"lamp".to_owned()).await?;
    assert!(!sink.is_active());
    Ok(())
}

fn slow_registry(bus: &MessageBus, accessor: &Arc<MockAccessor>) -> Registry<String> {
    let accessor: Arc<dyn Accessor<String>> = Arc::<MockAccessor>::clone(accessor);
    Registry::new(
        "mock",
        bus.clone(),
        accessor,
        Arc::new(NoObservation),
        RegistryConfig::default(),
    )
}

fn spawn_registration(
    registry: &Registry<String>,
    accessor: &MockAccessor,
    origin: DataOrigin<String>,
) -> JoinHandle<Result<(), RegistrationError>> {
    let registry = registry.clone();
    let status = accessor.status(&origin);
    tokio::spawn(async move { registry.register_data_origin_with_status(origin, status).await })
}

#[tokio::test(start_paused = true)]
async fn canceled_registration_leaves_nothing_behind() -> Result<(), Box<dyn Error>> {
    let bus = slow_cache_bus(Duration::from_secs(1))?;
    let accessor = Arc::new(MockAccessor::new());
    let registry = slow_registry(&bus, &accessor);
    let lamp = origin("lamp", false);

    let registration = spawn_registration(&registry, &accessor, lamp.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    bus.deregister_data_origin(iri("lamp")).await?;
    let result = registration.await?;

    assert!(matches!(result, Err(RegistrationError::Aborted(_))));
    assert!(!bus.contains_named_graph(iri("lamp")).await?);
    assert!(bus.routes().await?.is_empty());
    assert!(registry.data_origin(&"lamp".to_owned()).is_none());

    // The identifier is free again.
    registry.register_data_origin(lamp).await?;
    assert!(bus.contains_named_graph(iri("lamp")).await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn graph_reclaimed_during_rollback_stays_cached() -> Result<(), Box<dyn Error>> {
    let bus = slow_cache_bus(Duration::from_secs(1))?;
    let first_accessor = Arc::new(MockAccessor::new());
    let first = slow_registry(&bus, &first_accessor);
    let second_accessor = Arc::new(MockAccessor::new());
    second_accessor.set_value(7);
    let second = slow_registry(&bus, &second_accessor);
    let lamp = origin("lamp", false);

    let canceled = spawn_registration(&first, &first_accessor, lamp.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    bus.deregister_data_origin(iri("lamp")).await?;
    let reclaimed = spawn_registration(&second, &second_accessor, lamp);

    assert!(matches!(canceled.await?, Err(RegistrationError::Aborted(_))));
    reclaimed.await??;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let cached = bus
        .get_named_graph(iri("lamp"))
        .await?
        .ok_or("the reclaimed graph was removed")?;
    let value = cached
        .graph()
        .object_for_subject_predicate(&iri("lamp"), &value_predicate())
        .ok_or("status has no value")?;
    assert_eq!(value.into_owned(), Term::from(Literal::from(7_i64)));
    assert_eq!(bus.routes().await?.len(), 1);
    assert!(first.data_origin(&"lamp".to_owned()).is_none());
    assert!(second.data_origin(&"lamp".to_owned()).is_some());
    Ok(())
}

#[tokio::test]
async fn dummy_cache_keeps_routes_without_graphs() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::with_config(ssp::GatewayConfig {
        cache_kind: CacheKind::Dummy,
        ..Default::default()
    })
    .await?;
    let registry = gateway.registry("mock", Arc::new(MockAccessor::new()), Arc::new(NoObservation));

    registry.register_data_origin(origin("lamp", false)).await?;

    assert!(!gateway.is_cached(&iri("lamp")).await?);
    assert_eq!(gateway.data_origin_uris().await?.len(), 1);
    Ok(())
}
