//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line=N）。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub line: Option<usize>,      // 1-origin（任意）
    pub detail: Option<String>, // 外部コマンドの stderr など（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            line: None,
            detail: None,
        }
    }
    pub fn at(code: &'static str, msg: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            line,
            detail: None,
        }
    }
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // 1行目: ヘッダ
        match self.line {
            Some(l) => write!(f, "[{}] {} @line={}", self.code, self.msg, l)?,
            None => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        // 2行目以降: 詳細
        if let Some(d) = &self.detail {
            let d = d.trim_end();
            if !d.is_empty() {
                write!(f, "\n{}", d)?;
            }
        }
        Ok(())
    }
}

/// 外部パッケージの型情報解決に失敗したことを表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError(pub ErrorInfo);
impl ResolveError {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self(ErrorInfo::new(code, msg))
    }
    pub fn with_detail(code: &'static str, msg: impl Into<String>, detail: impl Into<String>) -> Self {
        Self(ErrorInfo::new(code, msg).with_detail(detail))
    }
    pub fn code(&self) -> &'static str {
        self.0.code
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ResolveError {}

/// go.mod の解釈に失敗したことを表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFileError(pub ErrorInfo);
impl ModuleFileError {
    pub fn at(code: &'static str, msg: impl Into<String>, line: Option<usize>) -> Self {
        Self(ErrorInfo::at(code, msg, line))
    }
}

impl Display for ModuleFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ModuleFileError {}
