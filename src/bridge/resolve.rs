// パス: src/bridge/resolve.rs
// 役割: 外部パッケージの型情報を解決するポートと、その実装（外部コマンド / キャッシュ / 固定表）
// 意図: 分類・内省のロジックからプロセス起動を切り離し、テストでは固定表へ差し替えられるようにする
// 関連ファイル: src/bridge/introspect.rs, src/bridge/types.rs, src/config.rs
//! 型情報の解決
//!
//! - `CommandResolver`: 外部コマンドに `<args..> <pkg>` を渡し、標準出力の JSON を読む。
//!   時間切れはプロセスを kill して失敗にする。
//! - `CachingResolver`: 1 回の実行中、成功も失敗も記録し、同じパスを二度と問い合わせない。
//! - `ResolvingLookup`: 解決結果を `TypeLookup` として分類器へ渡す。

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use wait_timeout::ChildExt;

use super::types::{FuncDecl, PackageInfo, TypeDef, TypeLookup, TypeName, TypeTable};
use crate::errors::ResolveError;

pub type ResolveResult = Result<Arc<PackageInfo>, ResolveError>;

/// パッケージパスから型情報を得るポート。
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, path: &str) -> ResolveResult;
}

impl<R: TypeResolver + ?Sized> TypeResolver for Arc<R> {
    fn resolve(&self, path: &str) -> ResolveResult {
        (**self).resolve(path)
    }
}

impl<R: TypeResolver + ?Sized> TypeResolver for &R {
    fn resolve(&self, path: &str) -> ResolveResult {
        (**self).resolve(path)
    }
}

/// 固定の表から答える実装。問い合わせ回数を数える。
#[derive(Debug, Default)]
pub struct StaticResolver {
    packages: HashMap<String, Arc<PackageInfo>>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, pkg: PackageInfo) -> Self {
        self.insert(pkg);
        self
    }

    pub fn insert(&mut self, pkg: PackageInfo) {
        self.packages.insert(pkg.path.clone(), Arc::new(pkg));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TypeResolver for StaticResolver {
    fn resolve(&self, path: &str) -> ResolveResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packages.get(path).cloned().ok_or_else(|| {
            ResolveError::new("RESOLVE005", format!("パッケージが見つかりません: {path}"))
        })
    }
}

/// 外部コマンドで型情報を得る実装。
#[derive(Clone, Debug)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    workdir: Option<PathBuf>,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            workdir: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// モジュールのルートで実行する。
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command_line(&self, path: &str) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(path.to_string());
        parts.join(" ")
    }
}

fn drain<R: Read + Send + 'static>(src: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut src) = src {
            let _ = src.read_to_end(&mut buf);
        }
        buf
    })
}

impl TypeResolver for CommandResolver {
    fn resolve(&self, path: &str) -> ResolveResult {
        let line = self.command_line(path);
        tracing::debug!(command = %line, "resolve package types");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|e| {
            ResolveError::new("RESOLVE001", format!("外部コマンドを起動できません: {line}: {e}"))
        })?;

        // パイプが詰まらないよう出力は別スレッドで読み切る。
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(command = %line, timeout_ms = self.timeout.as_millis() as u64, "resolver timed out");
                return Err(ResolveError::new(
                    "RESOLVE002",
                    format!(
                        "型情報の解決が時間切れになりました ({} ms): {path}",
                        self.timeout.as_millis()
                    ),
                ));
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ResolveError::new(
                    "RESOLVE006",
                    format!("外部コマンドの待機に失敗しました: {line}: {e}"),
                ));
            }
        };

        let out = stdout.join().unwrap_or_default();
        let err = stderr.join().unwrap_or_default();
        if !status.success() {
            return Err(ResolveError::with_detail(
                "RESOLVE003",
                format!("外部コマンドが失敗しました ({status}): {line}"),
                String::from_utf8_lossy(&err).into_owned(),
            ));
        }
        let info: PackageInfo = serde_json::from_slice(&out).map_err(|e| {
            ResolveError::new("RESOLVE004", format!("型情報の JSON が不正です: {path}: {e}"))
        })?;
        Ok(Arc::new(info))
    }
}

/// 成功・失敗ともに記録するキャッシュ。失敗したパスは再試行しない。
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, ResolveResult>>,
}

impl<R: TypeResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn failures(&self) -> Vec<(String, ResolveError)> {
        let mut out: Vec<(String, ResolveError)> = self
            .cache
            .lock()
            .iter()
            .filter_map(|(k, v)| v.as_ref().err().map(|e| (k.clone(), e.clone())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<R: TypeResolver> TypeResolver for CachingResolver<R> {
    fn resolve(&self, path: &str) -> ResolveResult {
        if let Some(hit) = self.cache.lock().get(path) {
            tracing::trace!(path, ok = hit.is_ok(), "resolver cache hit");
            return hit.clone();
        }
        tracing::debug!(path, "resolver cache miss");
        let result = self.inner.resolve(path);
        if let Err(e) = &result {
            tracing::warn!(path, code = e.code(), "type resolution failed");
        }
        self.cache
            .lock()
            .entry(path.to_string())
            .or_insert(result)
            .clone()
    }
}

/// 解決器を `TypeLookup` として使う。内省中のパッケージ自身は `local` から引く。
pub struct ResolvingLookup<'a> {
    resolver: &'a dyn TypeResolver,
    local: TypeTable,
    local_path: Option<String>,
}

impl<'a> ResolvingLookup<'a> {
    pub fn new(resolver: &'a dyn TypeResolver) -> Self {
        Self {
            resolver,
            local: TypeTable::new(),
            local_path: None,
        }
    }

    pub fn with_local(resolver: &'a dyn TypeResolver, pkg: &PackageInfo) -> Self {
        let mut local = TypeTable::new();
        local.add_package(pkg);
        Self {
            resolver,
            local,
            local_path: Some(pkg.path.clone()),
        }
    }
}

impl TypeLookup for ResolvingLookup<'_> {
    fn lookup(&self, name: &TypeName) -> Option<Arc<TypeDef>> {
        if name.is_builtin() {
            return None;
        }
        if let Some(def) = self.local.lookup(name) {
            return Some(def);
        }
        if self.local_path.as_deref() == Some(name.pkg.as_str()) {
            return None;
        }
        let pkg = self.resolver.resolve(&name.pkg).ok()?;
        pkg.type_def(&name.name).cloned().map(Arc::new)
    }

    fn package_funcs(&self, pkg: &str) -> Vec<FuncDecl> {
        if self.local_path.as_deref() == Some(pkg) {
            return self.local.package_funcs(pkg);
        }
        self.resolver
            .resolve(pkg)
            .map(|p| p.funcs.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_appends_package() {
        let r = CommandResolver::new("rugo-typeinfo", Duration::from_secs(1)).args(["-json"]);
        assert_eq!(r.command_line("net/http"), "rugo-typeinfo -json net/http");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let r = CommandResolver::new("rugo-no-such-program-xyz", Duration::from_secs(1));
        let err = r.resolve("fmt").unwrap_err();
        assert_eq!(err.code(), "RESOLVE001");
    }
}
