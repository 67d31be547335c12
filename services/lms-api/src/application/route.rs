// パスのルーティング
//
// パターンは`/courses/{id}`形式。固定セグメントは大文字小文字を区別せず、
// `{...}`セグメントは値をそのまま取り出す。

/// パターンに一致した場合、パラメーターを出現順に返す
pub fn match_path<'a>(pattern: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let mut pattern_segments = segments(pattern);
    let mut path_segments = segments(path);
    let mut params = Vec::new();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if expected.starts_with('{') && expected.ends_with('}') {
                    params.push(actual);
                } else if !expected.eq_ignore_ascii_case(actual) {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
