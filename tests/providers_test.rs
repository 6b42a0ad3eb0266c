use gtmserver::crm::{ContactFields, CrmClient, CrmError, HubspotClient};
use gtmserver::llm::{ChatRequest, LlmError, LlmProvider, TogetherClient};
use serde_json::json;

#[tokio::test]
async fn together_client_returns_message_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "test-model",
            "temperature": 0.7,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hello there"}}]}"#)
        .create_async()
        .await;

    let client = TogetherClient::new(
        "test-key".to_string(),
        Some(server.url()),
        "test-model".to_string(),
    );
    let output = client.complete(ChatRequest::user("hi")).await.unwrap();

    assert_eq!(output, "hello there");
    mock.assert_async().await;
}

#[tokio::test]
async fn together_client_sends_system_message_and_max_tokens() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({
            "max_tokens": 120,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "summarize"}
            ],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"done"}}]}"#)
        .create_async()
        .await;

    let client = TogetherClient::new(
        "test-key".to_string(),
        Some(server.url()),
        "test-model".to_string(),
    );
    let request = ChatRequest::user("summarize")
        .with_system("be brief")
        .with_max_tokens(120);
    let output = client.complete(request).await.unwrap();

    assert_eq!(output, "done");
    mock.assert_async().await;
}

#[tokio::test]
async fn together_client_surfaces_empty_choices() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let client = TogetherClient::new(
        "test-key".to_string(),
        Some(server.url()),
        "test-model".to_string(),
    );
    let err = client.complete(ChatRequest::user("hi")).await.unwrap_err();

    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn together_client_surfaces_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let client = TogetherClient::new(
        "test-key".to_string(),
        Some(server.url()),
        "test-model".to_string(),
    );
    let err = client.complete(ChatRequest::user("hi")).await.unwrap_err();

    match err {
        LlmError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn hubspot_client_posts_contact_properties() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/crm/v3/objects/contacts")
        .match_header("authorization", "Bearer crm-token")
        .match_body(mockito::Matcher::PartialJson(json!({
            "properties": {
                "email": "jane@x.com",
                "firstname": "Jane",
                "lastname": "Doe",
                "jobtitle": "CTO",
                "company": "Acme",
            }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"1"}"#)
        .create_async()
        .await;

    let client = HubspotClient::new("crm-token".to_string(), Some(server.url()));
    let contact = ContactFields {
        name: "Jane Doe".to_string(),
        email: "jane@x.com".to_string(),
        title: Some("CTO".to_string()),
        company: Some("Acme".to_string()),
    };

    client.sync_contact(&contact).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn hubspot_client_omits_absent_optional_properties() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/crm/v3/objects/contacts")
        .match_body(mockito::Matcher::PartialJson(json!({
            "properties": {
                "email": "solo@x.com",
                "firstname": "Cher",
            }
        })))
        .with_status(201)
        .with_body(r#"{"id":"2"}"#)
        .create_async()
        .await;

    let client = HubspotClient::new("crm-token".to_string(), Some(server.url()));
    let contact = ContactFields {
        name: "Cher".to_string(),
        email: "solo@x.com".to_string(),
        title: None,
        company: None,
    };

    client.sync_contact(&contact).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn hubspot_client_surfaces_rejection_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/crm/v3/objects/contacts")
        .with_status(400)
        .with_body("contact already exists")
        .create_async()
        .await;

    let client = HubspotClient::new("crm-token".to_string(), Some(server.url()));
    let contact = ContactFields {
        name: "Jane Doe".to_string(),
        email: "jane@x.com".to_string(),
        title: None,
        company: None,
    };

    let err = client.sync_contact(&contact).await.unwrap_err();
    match err {
        CrmError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "contact already exists");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
