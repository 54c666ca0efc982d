#![cfg(test)]
#![allow(
    clippy::panic_in_result_fn,
    reason = "tests assert inside functions returning a Result"
)]

use http::{header, StatusCode};
use ssp::backend::{NoObservation, RegistryConfig};
use ssp::cache::CacheConfig;
use ssp::model::{graph_proxy_uri, Subject};
use ssp::web::QUERY_DURATION_HEADER;
use ssp::GatewayConfig;
use ssp_testsuite::{iri, origin, MockAccessor, TestGateway, EX};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const VALUES_QUERY: &str =
    "SELECT ?thing ?value WHERE { ?thing <http://example.com/value> ?value } ORDER BY ?value";

#[tokio::test(start_paused = true)]
async fn unresponsive_origin_times_out_and_disappears() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::with_config(GatewayConfig {
        cache: CacheConfig {
            grace_period: Duration::from_secs(1),
        },
        registry: RegistryConfig {
            accessor_timeout: Duration::from_secs(5),
        },
        ..GatewayConfig::default()
    })
    .await?;
    let accessor = Arc::new(MockAccessor::expiring(Duration::from_secs(1)));
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));
    let uri = graph_proxy_uri(iri("lamp").as_ref());
    registry.register_data_origin(origin("lamp", false)).await?;
    // Let the status expire, so the next read goes to the data origin.
    sleep(Duration::from_secs(3)).await;
    accessor.set_delay(Some(Duration::from_secs(60)));

    let timed_out = gateway.server().get(&uri).await;
    let afterwards = gateway.server().get(&uri).await;

    timed_out.assert_status(StatusCode::GATEWAY_TIMEOUT);
    afterwards.assert_status_not_found();
    assert!(registry.data_origin(&"lamp".to_owned()).is_none());
    assert!(gateway.data_origin_uris().await?.is_empty());
    assert_eq!(accessor.reads(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn read_in_flight_during_deregistration_is_not_cached() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::with_config(GatewayConfig {
        cache: CacheConfig {
            grace_period: Duration::from_secs(1),
        },
        ..GatewayConfig::default()
    })
    .await?;
    let accessor = Arc::new(MockAccessor::expiring(Duration::from_secs(1)));
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));
    let uri = graph_proxy_uri(iri("lamp").as_ref());
    registry.register_data_origin(origin("lamp", false)).await?;
    sleep(Duration::from_secs(3)).await;
    assert!(!gateway.is_cached(&iri("lamp")).await?);
    accessor.set_delay(Some(Duration::from_secs(2)));

    let (read, unregistered) = tokio::join!(
        async { gateway.server().get(&uri).await },
        async {
            sleep(Duration::from_secs(1)).await;
            registry.unregister_data_origin(&"lamp".to_owned()).await
        },
    );

    unregistered?;
    read.assert_status_ok();
    assert!(!gateway.is_cached(&iri("lamp")).await?);
    assert!(gateway.data_origin_uris().await?.is_empty());
    gateway.server().get(&uri).await.assert_status_not_found();
    assert_eq!(accessor.reads(), 2);
    Ok(())
}

#[tokio::test]
async fn sparql_query_spans_all_cached_graphs() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let lamp = Arc::new(MockAccessor::new());
    lamp.set_value(1);
    let door = Arc::new(MockAccessor::new());
    door.set_value(2);
    gateway
        .registry("lamps", lamp, Arc::new(NoObservation))
        .register_data_origin(origin("lamp", false))
        .await?;
    gateway
        .registry("doors", door, Arc::new(NoObservation))
        .register_data_origin(origin("door", false))
        .await?;

    let response = gateway
        .server()
        .post("/sparql")
        .text(VALUES_QUERY)
        .content_type("application/sparql-query")
        .await;

    response.assert_status_ok();
    let duration = response
        .header(QUERY_DURATION_HEADER)
        .to_str()?
        .parse::<u128>()?;
    assert!(duration < 60_000);
    let results: serde_json::Value = serde_json::from_str(&response.text())?;
    let things = results["results"]["bindings"]
        .as_array()
        .ok_or("no bindings")?
        .iter()
        .map(|binding| binding["thing"]["value"].as_str().unwrap_or_default().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(things, vec![format!("{EX}lamp"), format!("{EX}door")]);
    Ok(())
}

#[tokio::test]
async fn invalid_sparql_query_is_bad_request() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;

    let response = gateway
        .server()
        .get("/sparql")
        .add_query_param("query", "SELECT WHERE {")
        .await;

    response.assert_status_bad_request();
    Ok(())
}

#[tokio::test]
async fn writes_are_forwarded_to_the_data_origin() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    let accessor = Arc::new(MockAccessor::new());
    let registry = gateway.registry("mock", Arc::clone(&accessor), Arc::new(NoObservation));
    let uri = graph_proxy_uri(iri("lamp").as_ref());
    registry.register_data_origin(origin("lamp", false)).await?;

    let created = gateway
        .server()
        .put(&uri)
        .text("<> <http://example.com/on> true .")
        .content_type("text/turtle")
        .await;
    let updated = gateway
        .server()
        .put(&uri)
        .text("<http://example.com/lamp> <http://example.com/on> false .")
        .content_type("application/n-triples")
        .await;
    let deleted = gateway.server().delete(&uri).await;

    created.assert_status(StatusCode::CREATED);
    updated.assert_status(StatusCode::NO_CONTENT);
    deleted.assert_status(StatusCode::NO_CONTENT);
    let written = accessor.written().ok_or("nothing was written")?;
    assert_eq!(written.len(), 1);
    let lamp = Subject::from(iri("lamp"));
    assert!(written.iter().all(|triple| triple.subject.into_owned() == lamp));
    assert_eq!(accessor.deletions(), 1);
    Ok(())
}

#[tokio::test]
async fn resources_are_described_across_graphs() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    gateway
        .registry("mock", Arc::new(MockAccessor::new()), Arc::new(NoObservation))
        .register_data_origin(origin("lamp", false))
        .await?;

    let known = gateway
        .server()
        .get("/")
        .add_query_param("resource", format!("{EX}lamp"))
        .add_header(header::ACCEPT, "application/n-triples")
        .await;
    let unknown = gateway
        .server()
        .get("/")
        .add_query_param("resource", format!("{EX}nothing"))
        .await;

    known.assert_status_ok();
    assert_eq!(known.header(header::CONTENT_TYPE), "application/n-triples");
    assert!(known.text().contains("<http://example.com/value>"));
    unknown.assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn directory_lists_data_origins() -> Result<(), Box<dyn Error>> {
    let gateway = TestGateway::start().await?;
    gateway
        .registry("mock", Arc::new(MockAccessor::new()), Arc::new(NoObservation))
        .register_data_origin(origin("lamp", false))
        .await?;

    let response = gateway.server().get("/services/directory").await;

    response.assert_status_ok();
    let directory: serde_json::Value = serde_json::from_str(&response.text())?;
    let data_origins = directory["services"]
        .as_array()
        .ok_or("no services")?
        .iter()
        .filter(|service| service["kind"] == "dataOrigin")
        .map(|service| service["description"].as_str().unwrap_or_default().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(data_origins, vec!["lamp (mock)".to_owned()]);
    assert_eq!(directory["cachedGraphs"][0], format!("{EX}lamp"));
    Ok(())
}
