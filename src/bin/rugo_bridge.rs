// パス: src/bin/rugo_bridge.rs
// 役割: 1 パッケージを内省し、段階→名前順の一覧と読み飛ばし理由を表示する診断ツール
// 意図: ブリッジ対象の確認とドキュメント生成の元データを CLI から得られるようにする
// 関連ファイル: src/bridge/introspect.rs, src/config.rs

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rugo::bridge::introspect::{IntrospectError, IntrospectResult, Introspector};
use rugo::bridge::resolve::{CachingResolver, StaticResolver, TypeResolver};
use rugo::bridge::types::PackageInfo;
use rugo::bridge::WrapperRegistry;
use rugo::BridgeConfig;

/// Rugo host-function bridge report
#[derive(Parser, Debug)]
#[command(name = "rugo-bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Bridge configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit doc entries as JSON
    #[arg(long)]
    json: bool,

    /// Print one line per skipped symbol
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Introspect an installed package by import path
    Package {
        /// Import path (e.g. net/url)
        path: String,
    },
    /// Introspect package source located through go.mod
    Dir {
        /// Source directory
        dir: PathBuf,
    },
    /// Introspect from type-info JSON files instead of the external resolver
    Offline {
        /// Package to report
        path: String,
        /// Type-info JSON files (one package each)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUGO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_offline(files: &[PathBuf]) -> Result<StaticResolver, String> {
    let mut resolver = StaticResolver::new();
    for file in files {
        let src = std::fs::read_to_string(file)
            .map_err(|e| format!("{}: {e}", file.display()))?;
        let info: PackageInfo =
            serde_json::from_str(&src).map_err(|e| format!("{}: {e}", file.display()))?;
        resolver.insert(info);
    }
    Ok(resolver)
}

fn print_report(result: &IntrospectResult, json: bool, verbose: bool) -> Result<(), String> {
    if json {
        let out = serde_json::to_string_pretty(&result.doc_entries()).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }
    println!("package {} ({})", result.package.path, result.package.name);
    for f in &result.funcs {
        println!("  {:<9} {:<32} {}", f.tier().as_str(), f.rugo_name, f.sig.describe());
    }
    for w in &result.wrappers {
        println!("  struct    {:<32} {}", w.type_name.qualified(), w.wrapper);
    }
    for t in &result.reused_wrappers {
        println!("  reuse     {}", t.qualified());
    }
    if verbose {
        print!("{}", result.skip_report());
    } else if !result.skipped.is_empty() {
        println!("  ({} skipped; use --verbose)", result.skipped.len());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path).map_err(|e| e.to_string())?,
        None => BridgeConfig::default(),
    };
    config.verbose_skips |= cli.verbose;

    let registry = WrapperRegistry::new();
    let resolver: Box<dyn TypeResolver> = match &cli.command {
        Commands::Offline { files, .. } => Box::new(CachingResolver::new(load_offline(files)?)),
        _ => Box::new(CachingResolver::new(
            config.command_resolver().map_err(|e| e.to_string())?,
        )),
    };
    let introspector = Introspector::new(resolver.as_ref(), &registry, &config);

    let result = match &cli.command {
        Commands::Package { path } | Commands::Offline { path, .. } => {
            introspector.introspect_package(path)
        }
        Commands::Dir { dir } => introspector.introspect_module_dir(dir),
    };

    match result {
        Ok(result) => print_report(&result, cli.json, config.verbose_skips),
        Err(IntrospectError::NothingBridgeable { path, skipped }) => {
            let mut msg = format!("no bridgeable symbols in {path}");
            for s in &skipped {
                msg.push_str(&format!("\n  skip {s}"));
            }
            Err(msg)
        }
        Err(e) => Err(e.to_string()),
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}
