use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

fn test_config(server_uri: &str) -> Config {
    let mut config = Config::default();
    config.graph.authority_url = server_uri.to_string();
    config.graph.graph_url = server_uri.to_string();
    config.graph.tenant_id = "tenant".to_string();
    config.graph.client_id = "client".to_string();
    config.graph.client_secret = "secret".to_string();
    config.graph.site_id = "site-1".to_string();
    config
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "graph-token",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

#[test]
fn lists_url_from_config() {
    let source =
        SharePointSource::new(&test_config("https://graph.example.com")).expect("should build");
    assert_eq!(
        source.lists_url().as_str(),
        "https://graph.example.com/v1.0/sites/site-1/lists"
    );
    assert_eq!(source.source_tag(), SHAREPOINT_SOURCE);
}

#[test]
fn list_items_prefer_name_over_display_name() {
    let item = ListItem {
        id: "1".to_string(),
        name: Some("Documents".to_string()),
        display_name: Some("Shared Documents".to_string()),
    };
    assert_eq!(item.into_document(), Some(RawDocument::new("1", "Documents")));

    let item = ListItem {
        id: "2".to_string(),
        name: Some(" ".to_string()),
        display_name: Some("Site Pages".to_string()),
    };
    assert_eq!(item.into_document(), Some(RawDocument::new("2", "Site Pages")));

    let item = ListItem {
        id: "3".to_string(),
        name: None,
        display_name: None,
    };
    assert_eq!(item.into_document(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_documents_across_pages() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .and(query_param("$skiptoken", "page2"))
        .and(header("Authorization", "Bearer graph-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "3", "name": "cherry"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .and(header("Authorization", "Bearer graph-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "1", "name": "apple", "displayName": "Apple"},
                {"id": "2", "displayName": "banana"},
                {"id": "x"}
            ],
            "@odata.nextLink": format!("{}/v1.0/sites/site-1/lists?$skiptoken=page2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");
    let documents = source.list_documents().expect("listing should succeed");

    assert_eq!(
        documents,
        vec![
            RawDocument::new("1", "apple"),
            RawDocument::new("2", "banana"),
            RawDocument::new("3", "cherry"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_site_yields_no_documents() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");
    assert!(source.list_documents().expect("listing should succeed").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_site_is_an_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");
    assert!(matches!(source.list_documents(), Err(QaError::Auth(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_token_request_stops_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");
    assert!(matches!(source.list_documents(), Err(QaError::Auth(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_transport_errors() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");
    assert!(matches!(source.list_documents(), Err(QaError::Transport(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn next_link_to_another_origin_is_refused() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/site-1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "1", "name": "apple"}],
            "@odata.nextLink": format!("{}/v1.0/sites/site-1/lists?$skiptoken=page2", elsewhere.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let source = SharePointSource::new(&test_config(&server.uri())).expect("should build");

    match source.list_documents() {
        Err(QaError::Transport(message)) => assert!(message.contains("Refusing")),
        other => panic!("expected transport error, got {:?}", other),
    }
}
