//! Web服务器

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    all_entries, call, complete, dashboard_status, delete, health, import_batch, recent_calls,
    register, room_config, room_queue, room_types, rooms, test_voice, type_queue, AppState,
};

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = create_app(state);
        Self { addr, app }
    }

    /// 运行直到 `shutdown` 完成
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        info!("Web server stopped");
        Ok(())
    }
}

/// 构建完整路由
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health))

        // API路由
        .nest("/api", api_routes())
        .with_state(state)

        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// API 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        // 房间目录
        .route("/config/room-types", get(room_types))
        .route("/config/rooms", get(rooms))
        .route("/config/room/:room_id", get(room_config))

        // 号票操作
        .route("/register", post(register))
        .route("/call", post(call))
        .route("/complete", post(complete))
        .route("/delete", post(delete))
        .route("/import-batch", post(import_batch))

        // 查询
        .route("/queue", get(all_entries))
        .route("/queue/:room_id", get(room_queue))
        .route("/type-queue/:room_type", get(type_queue))
        .route("/dashboard-status", get(dashboard_status))
        .route("/recent-calls/:room_id", get(recent_calls))

        .route("/test-voice", get(test_voice))
}
