use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    server::AppState,
    transport::{
        middleware::{add_response_headers, check_auth},
        routes::{guild, stats},
    },
};

const API_V1: &str = "/v1";

pub fn router(state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/info", get(stats::get_info))
        .route("/guilds/{guild_id}/commands", post(guild::post_command))
        .route("/guilds/{guild_id}/player", get(guild::get_player));

    Router::new()
        .nest(API_V1, v1_routes)
        .route("/version", get(stats::get_version))
        .layer(middleware::from_fn_with_state(state.clone(), check_auth))
        .layer(middleware::from_fn(add_response_headers))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        configs::Config,
        protocol::{StreamHandle, Track},
        server::SessionRegistry,
        sources::{ResolveError, TrackResolver},
        voice::VirtualTransport,
    };

    const PASSWORD: &str = "youshallnotpass";

    struct FixedResolver;

    #[async_trait]
    impl TrackResolver for FixedResolver {
        async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
            Ok(Track::new(query, query, StreamHandle::new(query)))
        }
    }

    fn app() -> Router {
        let config = Config::default();
        let transport = Arc::new(VirtualTransport::with_default_track(Duration::from_secs(3600)));
        let registry = SessionRegistry::new(transport, config.player.clone());
        router(Arc::new(AppState::new(registry, Arc::new(FixedResolver), config)))
    }

    fn command(guild: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(format!("/v1/guilds/{guild}/commands"))
            .header("authorization", PASSWORD)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_password() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::get("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/version")
                    .header("authorization", "nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["status"], 401);
    }

    #[tokio::test]
    async fn version_carries_api_header() {
        let response = app()
            .oneshot(
                Request::get("/version")
                    .header("authorization", PASSWORD)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Rustbeat-Api-Version"], "1");
    }

    #[tokio::test]
    async fn play_then_read_player_snapshot() {
        let app = app();

        let response = app
            .clone()
            .oneshot(command(
                "10",
                serde_json::json!({ "content": "!play song", "channelId": 3 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["reply"], "Now playing: **song**");

        let response = app
            .oneshot(
                Request::get("/v1/guilds/10/player")
                    .header("authorization", PASSWORD)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let snapshot = json(response).await;
        assert_eq!(snapshot["guildId"], "10");
        assert_eq!(snapshot["state"], "playing");
        assert_eq!(snapshot["current"]["title"], "song");
        assert_eq!(snapshot["channelId"], 3);
        assert_eq!(snapshot["queueLen"], 0);
    }

    #[tokio::test]
    async fn unknown_guild_has_no_player() {
        let response = app()
            .oneshot(
                Request::get("/v1/guilds/404/player")
                    .header("authorization", PASSWORD)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["path"], "/v1/guilds/404/player");
    }

    #[tokio::test]
    async fn command_errors_map_to_statuses() {
        let app = app();
        let cases = [
            (serde_json::json!({ "content": "!dance" }), StatusCode::BAD_REQUEST),
            (serde_json::json!({ "content": "!play x" }), StatusCode::CONFLICT),
            (serde_json::json!({ "content": "!pause" }), StatusCode::CONFLICT),
            (
                serde_json::json!({ "content": "!volume 300" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (body, expected) in cases {
            let response = app.clone().oneshot(command("1", body.clone())).await.unwrap();
            assert_eq!(response.status(), expected, "{body}");
            let error = json(response).await;
            assert_eq!(error["status"], expected.as_u16());
            assert_eq!(error["path"], "/v1/guilds/1/commands");
        }
    }
}
