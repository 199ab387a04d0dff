use labor_pool_shared::{
    api::{json_response, ApiError},
    applications, events, orgs, shifts, users, AppState,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

/// Main Lambda handler - routes requests to the entity endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET,POST,PUT,PATCH,DELETE,OPTIONS",
            )
            .header(
                "Access-Control-Allow-Headers",
                "Content-Type,Authorization,X-User-Id",
            )
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    match route(event, method, &path, state).await {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!("Unhandled error on {}: {}", path, e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "message": "Something went wrong" }),
            )
        }
    }
}

/// User ID as asserted by the API gateway. The `X-User-Id` header wins for
/// local testing; deployed traffic carries it in the JWT authorizer claims.
fn requesting_user_id(event: &Request) -> Option<String> {
    event
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            event
                .request_context_ref()
                .and_then(|ctx| ctx.authorizer())
                .and_then(|auth| auth.jwt.as_ref())
                .and_then(|jwt| jwt.claims.get("sub"))
                .map(|s| s.to_string())
        })
        .filter(|id| !id.is_empty())
}

async fn route(
    event: Request,
    method: Method,
    path: &str,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let dynamo = &state.dynamo_client;
    let sns = &state.sns_client;
    let table = state.table_name.as_str();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let body = event.body().to_vec();

    match (&method, parts.as_slice()) {
        // Users are provisioned by the identity pipeline, never over HTTP
        (&Method::GET, ["users", user_id]) => users::get_user(dynamo, table, user_id).await,
        (&Method::PATCH, ["users", user_id]) => {
            users::patch_user(dynamo, table, user_id, &body).await
        }
        (&Method::GET, ["users", user_id, "shifts"]) => {
            users::get_user_shifts(dynamo, table, user_id).await
        }
        (&Method::GET, ["users", user_id, "applications"]) => {
            users::get_user_applications(dynamo, table, user_id).await
        }

        (&Method::POST, ["orgs"]) => {
            let Some(user_id) = requesting_user_id(&event) else {
                return unauthenticated();
            };
            orgs::post_org(dynamo, table, &user_id, &body).await
        }
        (&Method::GET, ["orgs", org_id]) => orgs::get_org(dynamo, table, org_id).await,
        (&Method::POST, ["orgs", org_id, "members"]) => {
            orgs::post_org_member(dynamo, table, org_id, &body).await
        }
        (&Method::POST, ["orgs", org_id, "friends"]) => {
            orgs::post_org_friend(dynamo, table, org_id, &body).await
        }
        (&Method::GET, ["orgs", org_id, "shifts"]) => {
            orgs::get_org_shifts(dynamo, table, org_id).await
        }
        (&Method::GET, ["orgs", org_id, "applications"]) => {
            orgs::get_org_applications(dynamo, table, org_id).await
        }

        (&Method::GET, ["shifts"]) => shifts::get_all_shifts(dynamo, table).await,
        (&Method::POST, ["shifts"]) => {
            let Some(user_id) = requesting_user_id(&event) else {
                return unauthenticated();
            };
            shifts::post_shift(dynamo, table, &user_id, &body).await
        }
        (&Method::GET, ["shifts", shift_id]) => shifts::get_shift(dynamo, table, shift_id).await,
        (&Method::PATCH, ["shifts", shift_id]) => {
            shifts::patch_shift(dynamo, table, shift_id, &body).await
        }
        (&Method::DELETE, ["shifts", shift_id]) => {
            shifts::delete_shift(dynamo, table, shift_id).await
        }
        (&Method::GET, ["shifts", shift_id, "applications"]) => {
            applications::get_shift_applications(dynamo, table, shift_id).await
        }
        (&Method::POST, ["shifts", shift_id, "applications"]) => {
            applications::post_application(dynamo, sns, table, shift_id, &body).await
        }

        (&Method::PATCH, ["applications", application_id]) => {
            applications::patch_application_status(dynamo, sns, table, application_id, &body)
                .await
        }
        (&Method::DELETE, ["applications", application_id]) => {
            applications::delete_application(dynamo, table, application_id).await
        }

        (&Method::GET, ["events"]) => events::get_all_events(dynamo, table).await,
        (&Method::GET, ["entities", entity_urn, "events"]) => {
            events::get_entity_events(dynamo, table, entity_urn).await
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            serde_json::json!({ "message": "Route not found", "path": path }),
        ),
    }
}

fn unauthenticated() -> Result<Response<Body>, Error> {
    ApiError::validation("No authenticated user on request", vec![]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::Client as DynamoClient;
    use aws_sdk_sns::Client as SnsClient;
    use lambda_http::http;

    fn test_state() -> Arc<AppState> {
        let dynamo = DynamoClient::from_conf(
            aws_sdk_dynamodb::Config::builder()
                .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
                .build(),
        );
        let sns = SnsClient::from_conf(
            aws_sdk_sns::Config::builder()
                .behavior_version(aws_sdk_sns::config::BehaviorVersion::latest())
                .build(),
        );
        AppState::new(dynamo, sns, "labor-pool-dev".to_string())
    }

    fn request(method: &str, path: &str, body: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Body::Text(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let response = function_handler(request("OPTIONS", "/shifts", ""), test_state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn unknown_routes_return_404() {
        let response = function_handler(request("GET", "/widgets/42", ""), test_state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn posting_a_shift_requires_an_identity() {
        let response =
            function_handler(request("POST", "/shifts", "{\"name\":\"x\"}"), test_state())
                .await
                .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn application_status_must_be_terminal() {
        let response = function_handler(
            request("PATCH", "/applications/a1", "{\"status\":\"maybe\"}"),
            test_state(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
