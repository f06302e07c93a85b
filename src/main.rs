//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、遥测层初始化与依赖装配。

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use http::header::LOCATION;
use http::{Method, StatusCode};
use serde::Serialize;
use url::Url;

use spider_hop::core::config::AppConfig;
use spider_hop::core::model::{HandleStatus, ProxyContext, Request, Response, SpiderContext};
use spider_hop::engine::{Downloader, FetchReport};
use spider_hop::interfaces::{NetworkPolicy, PolicyResult};
use spider_hop::network::html::extract_meta_refresh;
use spider_hop::network::policies::RedirectPolicy;
use spider_hop::network::service::HttpService;
use spider_hop::network::url::resolve_text;

/// 命令行界面脚手架 (CLI Scaffolding)
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 抓取 URL 并跟随跳转，输出每条链路的 JSON 报告
    Fetch {
        urls: Vec<String>,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// 附加请求头 (KEY=VALUE)
        #[arg(short = 'H', long = "header", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
        #[arg(short, long)]
        data: Option<String>,
        /// 为请求指定代理（可内嵌凭据）
        #[arg(long, conflicts_with = "direct")]
        proxy: Option<String>,
        /// 强制直连
        #[arg(long)]
        direct: bool,
        /// 自行处理的状态码，不再当作跳转
        #[arg(long = "handle-status")]
        handle_status: Vec<u16>,
    },
    /// 离线模拟一跳 HTTP 重定向，输出后续请求
    Resolve {
        #[arg(short, long)]
        base: String,
        location: String,
        #[arg(short, long, default_value_t = 302)]
        status: u16,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
    },
    /// 离线提取 HTML 中的 meta refresh（未指定文件时读取 stdin）
    Refresh {
        #[arg(short, long)]
        base: String,
        file: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct RefreshReport {
    interval: f64,
    url: String,
    base_href: Option<String>,
    target: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 遥测层初始化 (Telemetry Layer Initialization)
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            urls,
            method,
            headers,
            data,
            proxy,
            direct,
            handle_status,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut requests = Vec::with_capacity(urls.len());
            for raw in &urls {
                let mut req = Request::new(method.clone(), Url::parse(raw)?);
                for (k, v) in &headers {
                    req = req.with_header(k.as_str(), v.as_str());
                }
                if let Some(body) = &data {
                    req = req.with_body(Bytes::from(body.clone()));
                }
                if let Some(proxy) = &proxy {
                    req = req.with_proxy(ProxyContext::pinned(proxy.clone()));
                } else if direct {
                    req = req.with_proxy(ProxyContext {
                        direct: true,
                        ..ProxyContext::default()
                    });
                }
                req.meta.handle_httpstatus = HandleStatus {
                    list: handle_status.clone(),
                    all: false,
                };
                requests.push(req);
            }

            let transport = Arc::new(HttpService::new(config.http.clone())?);
            let downloader =
                Downloader::from_config(transport, &config, SpiderContext::new("cli"))?;

            let mut failed = 0;
            for (url, result) in urls.iter().zip(downloader.fetch_all(requests).await) {
                match result {
                    Ok(resp) => {
                        let report = FetchReport::from_response(&resp);
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!("{}: {}", url, e);
                    }
                }
            }
            tracing::info!("完成 {} 条链路，失败 {} 条", urls.len(), failed);
        }
        Commands::Resolve {
            base,
            location,
            status,
            method,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let request = Arc::new(Request::new(method, Url::parse(&base)?));
            let response = Response::new(request, StatusCode::from_u16(status)?)
                .with_header(LOCATION, location.as_bytes());

            let policy = RedirectPolicy::new(config.redirect.clone());
            match policy.check(response, &SpiderContext::new("cli"))? {
                PolicyResult::Redirect(next) => {
                    println!("{}", serde_json::to_string_pretty(&next.summary())?)
                }
                PolicyResult::Pass(resp) => {
                    tracing::info!("{} 不产生跳转: {}", resp.status, resp.url)
                }
            }
        }
        Commands::Refresh { base, file } => {
            let base = Url::parse(&base)?;
            let html = match file {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => std::io::read_to_string(std::io::stdin())?,
            };

            match extract_meta_refresh(&html, &config.meta_refresh.ignore_tags) {
                Some((refresh, base_href)) => {
                    let effective = base_href
                        .as_deref()
                        .and_then(|href| resolve_text(href, &base).ok())
                        .unwrap_or_else(|| base.clone());
                    let report = RefreshReport {
                        interval: refresh.interval,
                        target: resolve_text(&refresh.url, &effective).ok().map(|u| u.to_string()),
                        url: refresh.url,
                        base_href,
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                None => tracing::info!("未找到 meta refresh"),
            }
        }
    }

    Ok(())
}

/// 执行 KEY=VALUE 格式参数解析
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no = found in {}", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}
