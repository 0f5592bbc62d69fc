// パス: src/config.rs
// 役割: ブリッジ（内省・型解決）の設定を JSON から読み込む
// 意図: タイムアウトや外部コマンドをコード変更なしで差し替えられるようにする
// 関連ファイル: src/bridge/resolve.rs, src/bridge/introspect.rs, src/bin/rugo_bridge.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::resolve::CommandResolver;

/// 設定読み込みの失敗。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[CONFIG001] 設定ファイルを読めません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("[CONFIG002] 設定の JSON が不正です: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("[CONFIG003] resolver_command が空です")]
    EmptyCommand,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_resolver_command() -> Vec<String> {
    vec!["rugo-typeinfo".to_string()]
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// 外部型解決コマンド 1 回あたりの上限。
    #[serde(default = "default_timeout_ms")]
    pub resolver_timeout_ms: u64,
    /// 読み飛ばした記号を 1 行ずつ報告する。
    pub verbose_skips: bool,
    /// 先頭がプログラム、残りが引数。パッケージパスは末尾に付く。
    #[serde(default = "default_resolver_command")]
    pub resolver_command: Vec<String>,
    /// 可変長メソッドは常に読み飛ばす（false は受け付けない）。
    #[serde(default = "default_true")]
    pub skip_variadic_methods: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            resolver_timeout_ms: default_timeout_ms(),
            verbose_skips: false,
            resolver_command: default_resolver_command(),
            skip_variadic_methods: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let mut cfg: Self = serde_json::from_str(src)?;
        if cfg.resolver_command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        cfg.skip_variadic_methods = true;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&src)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_timeout_ms)
    }

    /// 設定どおりの外部コマンド解決器。
    pub fn command_resolver(&self) -> Result<CommandResolver, ConfigError> {
        let (program, args) = self
            .resolver_command
            .split_first()
            .ok_or(ConfigError::EmptyCommand)?;
        Ok(CommandResolver::new(program.clone(), self.resolver_timeout()).args(args.iter().cloned()))
    }
}
