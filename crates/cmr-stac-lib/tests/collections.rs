use cmr_stac_lib::{Params, Relation, Vocabulary};
use mockito::Matcher;
use serde_json::{json, Value};

mod common;

use common::{cmr_fixture, service_for, test_settings};

fn mock_collections(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", "/collections.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("has_granules".into(), "true".into()),
            Matcher::UrlEncoded("downloadable".into(), "true".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(cmr_fixture("collections.json"))
        .create()
}

fn mock_lookup(server: &mut mockito::Server, short_name: &str, version: &str, body: String) -> mockito::Mock {
    server
        .mock("GET", "/collections.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider_id".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("short_name".into(), short_name.into()),
            Matcher::UrlEncoded("version".into(), version.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

fn params(value: Value) -> Params {
    value.as_object().cloned().expect("object literal")
}

#[test]
fn provider_catalog_links_each_collection() {
    let mut server = mockito::Server::new();
    let mock = mock_collections(&mut server);
    let service = service_for(&server, test_settings(&[("INVALID_RESPONSE_IS_ERROR", "true")]));

    let result = service
        .provider_collections("USGS_EROS", &Params::new(), true)
        .expect("collections convert and validate");

    mock.assert();
    assert_eq!(result.catalog.id, "USGS_EROS");
    let children: Vec<&str> = result
        .catalog
        .links_with(Relation::Child)
        .map(|link| link.href())
        .collect();
    assert_eq!(
        children,
        vec![
            "https://gateway.test/stac/USGS_EROS/collections/Landsat7_ETM_Plus_C1.v1",
            "https://gateway.test/stac/USGS_EROS/collections/SRTM_V3",
        ]
    );

    let srtm = &result.collections[1];
    let json = srtm.to_value().expect("serializes");
    assert_eq!(json["license"], "public-domain");
    assert_eq!(
        json["extent"]["temporal"]["interval"][0][1],
        "2000-02-21T23:59:59.000Z"
    );
    assert_eq!(json["extent"]["spatial"]["bbox"][0][0], -180.0);

    let document = result.to_value().expect("serializes");
    assert_eq!(document["collections"].as_array().map(Vec::len), Some(2));
}

#[test]
fn collection_lookup_by_stac_id() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/collections.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider_id".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("short_name".into(), "Landsat7_ETM_Plus_C1".into()),
            Matcher::UrlEncoded("version".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(cmr_fixture("collections.json"))
        .create();
    let service = service_for(&server, test_settings(&[]));

    let collection = service
        .collection("USGS_EROS", "Landsat7_ETM_Plus_C1.v1")
        .expect("lookup succeeds")
        .expect("collection found");

    mock.assert();
    assert_eq!(collection.id, "Landsat7_ETM_Plus_C1.v1");
    assert_eq!(
        collection.self_href(),
        Some("https://gateway.test/stac/USGS_EROS/collections/Landsat7_ETM_Plus_C1.v1")
    );
}

#[test]
fn stac_collection_ids_resolve_to_concept_ids() {
    let mut server = mockito::Server::new();
    let landsat = mock_lookup(&mut server, "Landsat7_ETM_Plus_C1", "1", cmr_fixture("collections.json"));
    let unknown = mock_lookup(&mut server, "UNKNOWN", "9", r#"{"feed":{"entry":[]}}"#.to_string());
    let service = service_for(&server, test_settings(&[]));

    let translation = service
        .translate(
            Vocabulary::StacSearch,
            &params(json!({
                "collections": ["Landsat7_ETM_Plus_C1.v1", "UNKNOWN.v9", "C1220567575-USGS_EROS"]
            })),
            Some("USGS_EROS"),
        )
        .expect("translation succeeds");

    landsat.assert();
    unknown.assert();
    assert_eq!(
        translation.cmr_params["collection_concept_id"],
        json!(["C1379757686-USGS_EROS", "C1220567575-USGS_EROS"])
    );
    assert_eq!(translation.cmr_params["provider"], "USGS_EROS");
}

#[test]
fn unresolvable_collection_ids_are_omitted() {
    let mut server = mockito::Server::new();
    mock_lookup(&mut server, "UNKNOWN", "9", r#"{"feed":{"entry":[]}}"#.to_string());
    let service = service_for(&server, test_settings(&[]));

    let translation = service
        .translate(
            Vocabulary::StacQuery,
            &params(json!({"collections": "UNKNOWN.v9"})),
            Some("USGS_EROS"),
        )
        .expect("translation succeeds");

    assert!(!translation.cmr_params.contains_key("collection_concept_id"));
}

#[test]
fn concept_ids_skip_the_lookup() {
    let mut server = mockito::Server::new();
    let lookup = server
        .mock("GET", "/collections.json")
        .match_query(Matcher::Any)
        .expect(0)
        .create();
    let service = service_for(&server, test_settings(&[]));

    let translation = service
        .translate(
            Vocabulary::StacQuery,
            &params(json!({"collections": "C1379757686-USGS_EROS"})),
            Some("USGS_EROS"),
        )
        .expect("translation succeeds");

    lookup.assert();
    assert_eq!(
        translation.cmr_params["collection_concept_id"],
        json!(["C1379757686-USGS_EROS"])
    );
}

#[test]
fn root_catalog_from_provider_list() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/ingest/providers")
        .match_header("Client-Id", "cmr-stac-api-proxy")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"provider-id":"LPDAAC_ECS","short-name":"LPDAAC"},{"provider-id":"USGS_EROS","short-name":"EROS"}]"#)
        .create();
    let service = service_for(&server, test_settings(&[]));

    let providers = service.providers().expect("provider list");
    mock.assert();
    assert_eq!(providers, vec!["LPDAAC_ECS", "USGS_EROS"]);

    let catalog = service.root_catalog(&providers).expect("catalog renders");
    let children: Vec<&str> = catalog
        .links_with(Relation::Child)
        .map(|link| link.href())
        .collect();
    assert_eq!(
        children,
        vec![
            "https://gateway.test/stac/LPDAAC_ECS",
            "https://gateway.test/stac/USGS_EROS"
        ]
    );
}
