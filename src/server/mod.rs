//! HTTP 服务模块
//!
//! 负责监听、连接管理和优雅关闭，路由见 [`routes`]

pub mod routes;

use anyhow::{anyhow, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use routes::AppState;

/// 关闭时等待在途连接的最长时间
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DiagnosisServer {
    /// 已绑定的监听器
    listener: TcpListener,
    /// 共享只读状态
    state: Arc<AppState>,
}

impl DiagnosisServer {
    /// 绑定监听地址
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow!("绑定监听地址 {} 失败: {}", addr, e))?;

        tracing::info!("诊断服务监听于 http://{}", listener.local_addr()?);
        tracing::debug!("允许的跨域来源: {:?}", config.allowed_origins);

        Ok(Self {
            listener,
            state: Arc::new(AppState::from_config(config)),
        })
    }

    /// 实际监听地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行直到收到 Ctrl+C 或 TERM 信号
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("收到 Ctrl+C 信号，正在关闭...");
                }
                _ = Self::wait_for_term_signal() => {
                    tracing::info!("收到 TERM 信号，正在关闭...");
                }
            }
        })
        .await
    }

    /// 运行直到 `shutdown` 完成，然后停止接受新连接并等待在途请求
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!("接受连接失败: {}", e);
                            continue;
                        }
                    };
                    tracing::trace!(%peer, "新连接");

                    let state = self.state.clone();
                    let mut shutdown_rx = shutdown_rx.clone();
                    connections.spawn(async move {
                        let service = service_fn(move |req| routes::handle(state.clone(), req));
                        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = shutdown_rx.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(e) = result {
                            tracing::warn!(%peer, "连接错误: {}", e);
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        // 通知在途连接关闭
        tracing::info!("正在关闭诊断服务，在途连接: {}", connections.len());
        let _ = shutdown_tx.send(true);

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!("等待在途连接超时，强制终止");
            connections.abort_all();
        }

        tracing::info!("诊断服务已关闭");
        Ok(())
    }

    /// 等待 TERM 信号
    async fn wait_for_term_signal() {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
            }
        }

        #[cfg(not(unix))]
        {
            // Windows 不支持 SIGTERM，使用 Ctrl+C 替代
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
