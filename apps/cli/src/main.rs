use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use smartpaste_core_sdk::{
    secrets::{KeyringSecretStore, SecretStore, DASHSCOPE_ACCOUNT, DASHSCOPE_SERVICE_ID},
    server,
    telemetry::FileTelemetry,
    CompletionClient,
};

/**
 * \brief CLI 程序入口：按自然语言指令改写剪贴板文本。
 */
#[derive(Parser, Debug)]
#[command(name = "smartpaste", version, about = "AI clipboard formatting via DashScope")]
struct Cli {
    /** \brief 输出 debug 日志 */
    #[arg(short, long, global = true)]
    verbose: bool,

    /** \brief 记录遥测事件到本地文件 */
    #[arg(long, global = true, default_value_t = false)]
    telemetry: bool,

    #[arg(long, global = true, default_value = "logs")]
    telemetry_dir: PathBuf,

    /** \brief 本次运行使用的 API Key，不写入密钥库 */
    #[arg(long, global = true, env = "SMARTPASTE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 显示 AI 格式化是否可用。
     */
    Status,

    /**
     * \brief 按指令改写文本；未提供 --input 时从 stdin 读取。
     */
    Format {
        #[arg(long)]
        instructions: String,
        #[arg(long)]
        input: Option<String>,
    },

    /**
     * \brief 管理系统密钥库中的 API Key。
     */
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /**
     * \brief 启动本地 HTTP 服务。
     */
    Serve {
        #[arg(long, default_value = "127.0.0.1:5174")]
        addr: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /** \brief 保存 API Key */
    Save {
        #[arg(long)]
        value: String,
    },
    /** \brief 删除已保存的 API Key */
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let telemetry_enabled = cli.telemetry;
    let telemetry_dir = cli.telemetry_dir;
    let api_key = cli.api_key;
    let build_client = move || {
        let telemetry = Arc::new(FileTelemetry::new(telemetry_dir, telemetry_enabled));
        let client = CompletionClient::with_defaults(telemetry);
        if let Some(key) = api_key {
            client.set_credential(key);
        }
        client
    };

    match cli.command {
        Commands::Key { action } => manage_key(&KeyringSecretStore, action)?,
        Commands::Status => {
            let client = build_client();
            if client.is_enabled() {
                println!("AI formatting enabled (model={})", client.config().model);
            } else {
                println!(
                    "AI formatting disabled, run: smartpaste key save --value <DASHSCOPE_API_KEY>"
                );
            }
        }
        Commands::Format {
            instructions,
            input,
        } => {
            let client = build_client();
            if !client.is_enabled() {
                bail!("no DashScope key configured, run: smartpaste key save --value ...");
            }
            let input = match input {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut buf)
                        .await
                        .context("read stdin failed")?;
                    buf
                }
            };

            let result = client.format_with_instructions(&instructions, &input).await;
            if !result.is_success() {
                bail!(
                    "AI formatting unavailable this time (status={})",
                    result.status
                );
            }
            println!("{}", result.text.unwrap_or_default());
        }
        Commands::Serve { addr } => {
            server::run(&addr, Arc::new(build_client())).await?;
        }
    }

    Ok(())
}

/**
 * \brief RUST_LOG 优先；否则按 --verbose 选择 debug 或 info。
 */
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

/**
 * \brief 写入或删除密钥库条目；组件本身从不持久化凭据。
 */
fn manage_key(store: &dyn SecretStore, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Save { value } => {
            store
                .store(DASHSCOPE_SERVICE_ID, DASHSCOPE_ACCOUNT, &value)
                .context("save key failed")?;
            println!("Saved DashScope key to the system keyring");
        }
        KeyAction::Clear => {
            store
                .delete(DASHSCOPE_SERVICE_ID, DASHSCOPE_ACCOUNT)
                .context("clear key failed")?;
            println!("Removed DashScope key from the system keyring");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbose_flag() {
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(true, Some("  ")).to_string(), "debug");
    }

    #[test]
    fn test_log_filter_prefers_rust_log() {
        let filter = log_filter(false, Some("smartpaste_core_sdk=trace")).to_string();
        assert!(filter.contains("smartpaste_core_sdk=trace"), "got {}", filter);
    }

    #[test]
    fn test_log_filter_ignores_invalid_rust_log() {
        assert_eq!(log_filter(true, Some("smartpaste=notalevel")).to_string(), "debug");
    }
}
