// パス: tests/errors_display.rs
// 役割: エラー表示形式のテスト
// 意図: 「[CODE] メッセージ @line=N」と詳細行の出力を固定する
// 関連ファイル: src/errors.rs
use rugo::{ErrorInfo, ModuleFileError, ResolveError};

#[test]
fn header_with_and_without_line() {
    assert_eq!(ErrorInfo::new("X001", "boom").to_string(), "[X001] boom");
    assert_eq!(
        ErrorInfo::at("X002", "bad", Some(7)).to_string(),
        "[X002] bad @line=7"
    );
}

#[test]
fn detail_goes_on_following_lines_and_blank_detail_is_dropped() {
    let e = ResolveError::with_detail("RESOLVE003", "exit status 2", "cannot find package\n");
    assert_eq!(e.to_string(), "[RESOLVE003] exit status 2\ncannot find package");
    assert_eq!(e.code(), "RESOLVE003");

    let e = ErrorInfo::new("X003", "quiet").with_detail("  \n");
    assert_eq!(e.to_string(), "[X003] quiet");
}

#[test]
fn module_file_error_carries_line() {
    let e = ModuleFileError::at("INTRO004", "unclosed", Some(3));
    assert_eq!(e.to_string(), "[INTRO004] unclosed @line=3");
    let boxed: Box<dyn std::error::Error> = Box::new(e);
    assert!(boxed.source().is_none());
}
