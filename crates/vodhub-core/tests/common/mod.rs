//! Shared fixtures: a wiremock server acting as relay for fake upstream hosts

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use vodhub_core::url::{build_detail_url, build_search_url};
use vodhub_core::{ClientConfig, SourceDescriptor, UpstreamClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RELAY_PATH: &str = "/relay";

/// Relay prefix pointing at the mock server
pub fn relay_url(server: &MockServer) -> String {
    format!("{}{}?url=", server.uri(), RELAY_PATH)
}

/// Client routed through the mock relay
pub fn relayed_client(server: &MockServer, timeout: Duration) -> UpstreamClient {
    UpstreamClient::with_config(ClientConfig {
        relay_url: Some(relay_url(server)),
        timeout,
        ..Default::default()
    })
    .expect("client should build")
}

/// A source on a fake host; requests to it only ever reach the relay
pub fn source(id: &str) -> SourceDescriptor {
    SourceDescriptor::new(id, format!("Source {}", id.to_uppercase()), format!("http://{}.test", id))
}

/// Upstream record in the `vod_` convention
pub fn record(id: u64, name: &str) -> Value {
    json!({
        "vod_id": id,
        "vod_name": name,
        "vod_pic": format!("https://img.test/{}.jpg", id),
        "vod_remarks": "HD",
        "type_name": "Movie",
        "vod_year": "2024",
    })
}

/// Expect a relayed request for `target` and answer with `response`
pub async fn mount_target(server: &MockServer, target: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(RELAY_PATH))
        .and(query_param("url", target))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_search(
    server: &MockServer,
    source: &SourceDescriptor,
    query: &str,
    response: ResponseTemplate,
) {
    let target = build_search_url(&source.search_base_url, query);
    mount_target(server, &target, response).await;
}

pub async fn mount_detail(
    server: &MockServer,
    source: &SourceDescriptor,
    item_id: &str,
    response: ResponseTemplate,
) {
    let target = build_detail_url(&source.detail_base_url, item_id);
    mount_target(server, &target, response).await;
}

/// 200 with a `{"list": [...]}` body
pub fn list_response(records: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 1, "msg": "ok", "list": records }))
}
