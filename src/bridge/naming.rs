// パス: src/bridge/naming.rs
// 役割: ホスト側の PascalCase/camelCase 名をスクリプト側の snake_case 名へ変換する
// 意図: 生成コードとドキュメントが依存する名前を決定的かつ冪等に保つ
// 関連ファイル: src/bridge/introspect.rs, src/bridge/wrappers.rs
//! 名前変換
//!
//! 手順:
//! 1. 左から走査し、単語境界から始まる既知の略語を `_xxx_` へ置き換える。
//!    候補は長い順に試し、直後が小文字なら不採用（`HTTPServer` の `HTTPS` は当たらない）。
//!    直後の `s` が単語末なら複数形として取り込む（`IDs` → `ids`）。
//! 2. 大文字の境界で区切って小文字化する。
//! 3. 連続する `_` をひとつに畳み、両端の `_` を落とす。
//!
//! 略語表は長さ降順・同長は辞書順に固定する。格納順に依存しない。

use once_cell::sync::Lazy;

const ACRONYMS: &[&str] = &[
    "API", "ASCII", "CPU", "CSS", "CSV", "DNS", "EOF", "GID", "GUID", "HTML", "HTTP", "HTTPS",
    "ID", "IO", "IP", "IPv4", "IPv6", "JSON", "JWT", "MD5", "OS", "RAM", "RGB", "RGBA", "RPC",
    "SHA", "SMTP", "SQL", "SSH", "SSL", "TCP", "TLS", "TTL", "UDP", "UI", "UID", "URI", "URL",
    "UTF8", "UUID", "VM", "XML", "XSRF", "XSS", "YAML",
];

/// 置換順に並べ替えた略語表（文字列と小文字形）。
static ORDERED_ACRONYMS: Lazy<Vec<(Vec<char>, String)>> = Lazy::new(|| {
    let mut list: Vec<&'static str> = ACRONYMS.to_vec();
    list.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    list.into_iter()
        .map(|acr| (acr.chars().collect(), acr.to_ascii_lowercase()))
        .collect()
});

/// 置換に使う略語の一覧（適用順）。
pub fn acronyms() -> impl Iterator<Item = String> {
    ORDERED_ACRONYMS
        .iter()
        .map(|(chars, _)| chars.iter().collect())
}

fn ends_word(c: Option<&char>) -> bool {
    c.map_or(true, |c| !c.is_lowercase())
}

/// `chars[i..]` に当たる略語を探し、(消費文字数, 置換後) を返す。
fn match_acronym(chars: &[char], i: usize) -> Option<(usize, String)> {
    for (acr, lower) in ORDERED_ACRONYMS.iter() {
        if !chars[i..].starts_with(acr) {
            continue;
        }
        let end = i + acr.len();
        if ends_word(chars.get(end)) {
            return Some((acr.len(), lower.clone()));
        }
        if chars.get(end) == Some(&'s') && ends_word(chars.get(end + 1)) {
            return Some((acr.len() + 1, format!("{lower}s")));
        }
    }
    None
}

/// 略語を `_xxx_` に置き換える。
fn replace_acronyms(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    let mut at_boundary = true;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_uppercase() && at_boundary {
            if let Some((len, lower)) = match_acronym(&chars, i) {
                out.push('_');
                out.push_str(&lower);
                out.push('_');
                i += len;
                at_boundary = true;
                continue;
            }
        }
        out.push(c);
        at_boundary = !c.is_uppercase();
        i += 1;
    }
    out
}

/// `HTTPServer` → `http_server`、`ParseURL` → `parse_url`。
pub fn to_snake_case(name: &str) -> String {
    let replaced = replace_acronyms(name);
    let chars: Vec<char> = replaced.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    collapse_underscores(&out)
}

fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_underscore = false;
    for c in s.chars() {
        if c == '_' {
            if !last_was_underscore {
                out.push(c);
            }
            last_was_underscore = true;
        } else {
            out.push(c);
            last_was_underscore = false;
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_table_is_longest_first() {
        let order: Vec<String> = acronyms().collect();
        let https = order.iter().position(|a| a == "HTTPS").expect("HTTPS");
        let http = order.iter().position(|a| a == "HTTP").expect("HTTP");
        assert!(https < http);
        for pair in order.windows(2) {
            assert!(pair[0].len() >= pair[1].len());
        }
    }

    #[test]
    fn acronym_followed_by_lowercase_is_not_taken() {
        assert_eq!(replace_acronyms("HTTPServer"), "_http_Server");
        assert_eq!(replace_acronyms("Close"), "Close");
    }

    #[test]
    fn collapse_trims_and_merges() {
        assert_eq!(collapse_underscores("__a___b_"), "a_b");
    }
}
