//! 配置系统模块
//!
//! 统一处理 TOML 配置文件、环境变量、命令行参数

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config as ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(name = "vital-triage")]
#[command(about = "生命体征模糊诊断服务")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// 监听地址
    #[arg(long)]
    pub host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 支持的命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动 HTTP 诊断服务
    Serve,
    /// 对一组读数做一次诊断并输出 JSON
    Evaluate {
        /// 身份名称（决定规则分支）
        #[arg(long)]
        name: String,
        /// 体温（°C）
        #[arg(long)]
        temperature: f64,
        /// 心率（bpm）
        #[arg(long)]
        heart_rate: i64,
        /// 收缩压（mmHg）
        #[arg(long)]
        blood_pressure: i64,
        /// 呼吸频率（次/分）
        #[arg(long)]
        respiratory_rate: i64,
        /// 血氧饱和度（%）
        #[arg(long)]
        oxygen_saturation: f64,
        /// 血糖（mg/dL）
        #[arg(long)]
        blood_sugar: f64,
    },
    /// 显示某个变量取值的各语言项隶属度
    Membership {
        /// 变量名，例如 temperature、heart_rate
        variable: String,
        /// 取值
        value: f64,
        /// 只显示指定语言项
        #[arg(long)]
        term: Option<String>,
    },
    /// 重置配置
    ResetConfig,
}

/// 日志级别
#[derive(clap::ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// 服务配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口（0 表示由系统分配）
    pub port: u16,
    /// 允许跨域访问的来源
    pub allowed_origins: Vec<String>,
    /// 请求体大小上限（字节）
    pub max_body_bytes: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
    /// 日志输出目录
    pub directory: Option<PathBuf>,
    /// 保留的日志文件数
    pub max_files: u32,
}

/// 日志格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 简洁格式
    Compact,
    /// 详细格式
    Full,
    /// JSON 格式
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| anyhow!("无效的监听地址 '{}': {}", self.host, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            directory: None,
            max_files: 5,
        }
    }
}

impl Config {
    /// 使用指定的 CLI 参数加载配置
    pub fn load_with_cli(cli: Cli) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. 首先加载默认配置
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // 2. 加载系统配置文件
        if let Some(system_config) = Self::get_system_config_path() {
            if system_config.exists() {
                builder = builder.add_source(File::from(system_config));
            }
        }

        // 3. 加载用户配置文件
        if let Some(user_config) = Self::get_user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config));
            }
        }

        // 4. 加载指定的配置文件
        if let Some(config_path) = cli.config {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            } else {
                return Err(anyhow!("配置文件不存在: {}", config_path.display()));
            }
        }

        // 5. 加载环境变量（前缀 VITAL_TRIAGE_）
        builder = builder.add_source(
            Environment::with_prefix("VITAL_TRIAGE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        );

        // 6. 构建配置
        let mut config: Config = builder.build()?.try_deserialize()?;

        // 7. 应用命令行参数覆盖
        if let Some(log_level) = cli.log_level {
            config.logging.level = log_level;
        }

        if let Some(host) = cli.host {
            config.server.host = host;
        }

        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // 8. 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 获取系统配置文件路径
    pub fn get_system_config_path() -> Option<PathBuf> {
        Some(PathBuf::from("/etc/vital-triage/config.toml"))
    }

    /// 获取用户配置文件路径
    pub fn get_user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vital-triage").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| anyhow!("序列化配置失败: {}", e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        // 验证监听地址
        self.server.socket_addr()?;

        if self.server.allowed_origins.is_empty() {
            return Err(anyhow!("至少需要配置一个允许的跨域来源"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(anyhow!("请求体大小上限不能为 0"));
        }

        // 验证日志目录
        if let Some(log_dir) = &self.logging.directory {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
        }

        Ok(())
    }

    /// 初始化日志系统
    ///
    /// 返回的 guard 需要持有到进程退出，否则文件日志会丢失
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let level_filter = EnvFilter::builder()
            .with_default_directive(Level::from(self.logging.level.clone()).into())
            .from_env_lossy();

        // 可选的文件输出（按天轮转）
        let (file_writer, guard) = match &self.logging.directory {
            Some(log_dir) => {
                std::fs::create_dir_all(log_dir)?;
                let file_appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix("vital-triage")
                    .filename_suffix("log")
                    .max_log_files(self.logging.max_files.max(1) as usize)
                    .build(log_dir)
                    .map_err(|e| anyhow!("创建日志文件失败: {}", e))?;
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                (Some(non_blocking), Some(guard))
            }
            None => (None, None),
        };

        // 根据格式选择不同的初始化方式
        let result = match self.logging.format {
            LogFormat::Compact => tracing_subscriber::registry()
                .with(level_filter)
                .with(fmt::layer().compact())
                .with(file_writer.map(|w| fmt::layer().compact().with_ansi(false).with_writer(w)))
                .try_init(),
            LogFormat::Full => tracing_subscriber::registry()
                .with(level_filter)
                .with(fmt::layer())
                .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(level_filter)
                .with(fmt::layer().json().with_target(true).with_level(true))
                .with(file_writer.map(|w| fmt::layer().json().with_writer(w)))
                .try_init(),
        };
        result.map_err(|e| anyhow!("初始化日志系统失败: {}", e))?;

        tracing::info!("日志系统已初始化，级别: {:?}", self.logging.level);
        Ok(guard)
    }
}
