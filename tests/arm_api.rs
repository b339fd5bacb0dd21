//! Integration tests for ARM REST behavior using wiremock
//!
//! These tests verify the wire-level shapes taz depends on: bearer-token
//! auth, list pagination via nextLink, and the error codes the client maps
//! to typed provider errors.

use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod arm_rest_tests {
    use super::*;

    /// Test successful list request returns parsed resource groups
    #[tokio::test]
    async fn test_list_resource_groups_returns_value_array() {
        let server = MockServer::start().await;

        let expected_response = json!({
            "value": [
                {"id": "/subscriptions/sub-1/resourceGroups/rg-app", "name": "rg-app",
                 "type": "Microsoft.Resources/resourceGroups", "location": "westeurope"},
                {"id": "/subscriptions/sub-1/resourceGroups/rg-data", "name": "rg-data",
                 "type": "Microsoft.Resources/resourceGroups", "location": "northeurope"}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourcegroups"))
            .and(query_param("api-version", "2021-04-01"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&expected_response))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!(
            "{}/subscriptions/sub-1/resourcegroups?api-version=2021-04-01",
            server.uri()
        );

        let response = client
            .get(&url)
            .bearer_auth("test-token")
            .send()
            .await
            .expect("Request should succeed")
            .json::<serde_json::Value>()
            .await
            .expect("Should parse JSON");

        assert_eq!(response["value"].as_array().unwrap().len(), 2);
        assert_eq!(response["value"][0]["name"], "rg-app");
    }

    /// Test paginated responses carry an absolute nextLink
    #[tokio::test]
    async fn test_list_pagination_follows_next_link() {
        let server = MockServer::start().await;

        let next_link = format!(
            "{}/subscriptions/sub-1/resourcegroups?api-version=2021-04-01&$skiptoken=page2",
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourcegroups"))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"id": "/subscriptions/sub-1/resourceGroups/rg-z", "name": "rg-z",
                     "type": "Microsoft.Resources/resourceGroups", "location": "westeurope"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourcegroups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"id": "/subscriptions/sub-1/resourceGroups/rg-a", "name": "rg-a",
                     "type": "Microsoft.Resources/resourceGroups", "location": "westeurope"}
                ],
                "nextLink": next_link
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let first_url = format!(
            "{}/subscriptions/sub-1/resourcegroups?api-version=2021-04-01",
            server.uri()
        );

        let page_one = client
            .get(&first_url)
            .send()
            .await
            .expect("Request should succeed")
            .json::<serde_json::Value>()
            .await
            .expect("Should parse JSON");

        let follow = page_one["nextLink"].as_str().expect("nextLink present");
        let page_two = client
            .get(follow)
            .send()
            .await
            .expect("Request should succeed")
            .json::<serde_json::Value>()
            .await
            .expect("Should parse JSON");

        assert_eq!(page_one["value"][0]["name"], "rg-a");
        assert_eq!(page_two["value"][0]["name"], "rg-z");
        assert!(page_two.get("nextLink").is_none());
    }

    /// Test 401 response indicates authentication failure
    #[tokio::test]
    async fn test_401_returns_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourcegroups"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({
                    "error": {
                        "code": "InvalidAuthenticationToken",
                        "message": "The access token is expired."
                    }
                })),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!(
            "{}/subscriptions/sub-1/resourcegroups?api-version=2021-04-01",
            server.uri()
        );

        let response = client
            .get(&url)
            .send()
            .await
            .expect("Request should complete");

        assert_eq!(response.status(), 401);
    }

    /// Test 403 response carries the ARM authorization error shape
    #[tokio::test]
    async fn test_403_returns_forbidden_with_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourceGroups/rg-locked/resources"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({
                    "error": {
                        "code": "AuthorizationFailed",
                        "message": "The client does not have authorization to perform action."
                    }
                })),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!(
            "{}/subscriptions/sub-1/resourceGroups/rg-locked/resources?api-version=2021-04-01",
            server.uri()
        );

        let response = client
            .get(&url)
            .bearer_auth("valid-token")
            .send()
            .await
            .expect("Request should complete");

        assert_eq!(response.status(), 403);
        let body = response
            .json::<serde_json::Value>()
            .await
            .expect("Should parse JSON");
        assert_eq!(body["error"]["code"], "AuthorizationFailed");
    }

    /// Test 404 response for a vanished resource
    #[tokio::test]
    async fn test_404_for_missing_resource() {
        let server = MockServer::start().await;

        let vm_id = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/gone";

        Mock::given(method("GET"))
            .and(path(vm_id))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({
                    "error": {
                        "code": "ResourceNotFound",
                        "message": "The Resource was not found."
                    }
                })),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}{}?api-version=2023-09-01", server.uri(), vm_id);

        let response = client
            .get(&url)
            .send()
            .await
            .expect("Request should complete");

        assert_eq!(response.status(), 404);
    }

    /// Test PUT create returns the materialized resource
    #[tokio::test]
    async fn test_put_create_echoes_resource() {
        let server = MockServer::start().await;

        let storage_id = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/stor1";

        Mock::given(method("PUT"))
            .and(path(storage_id))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": storage_id,
                "name": "stor1",
                "type": "Microsoft.Storage/storageAccounts",
                "location": "westeurope",
                "sku": {"name": "Standard_LRS"},
                "properties": {"provisioningState": "Succeeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}{}?api-version=2023-01-01", server.uri(), storage_id);

        let response = client
            .put(&url)
            .bearer_auth("test-token")
            .json(&json!({"location": "westeurope", "sku": {"name": "Standard_LRS"}}))
            .send()
            .await
            .expect("Request should succeed")
            .json::<serde_json::Value>()
            .await
            .expect("Should parse JSON");

        assert_eq!(response["name"], "stor1");
        assert_eq!(response["properties"]["provisioningState"], "Succeeded");
    }

    /// Test 429 throttling responses are recognizable
    #[tokio::test]
    async fn test_429_throttling() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-1/resourcegroups"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "30")
                    .set_body_json(json!({
                        "error": {"code": "TooManyRequests", "message": "Rate limit exceeded"}
                    })),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!(
            "{}/subscriptions/sub-1/resourcegroups?api-version=2021-04-01",
            server.uri()
        );

        let response = client
            .get(&url)
            .send()
            .await
            .expect("Request should complete");

        assert_eq!(response.status(), 429);
        assert_eq!(
            response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok()),
            Some("30")
        );
    }
}
