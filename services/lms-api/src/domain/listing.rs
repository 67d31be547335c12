/// オブジェクトストアの一覧結果とフォルダ表示
///
/// S3の`ListObjectsV2`（デリミタ`/`）の結果を、フォルダ（CommonPrefixes）と
/// ファイル（Contents）に分けて表現する。
use serde::Serialize;

/// 一覧で得られたオブジェクトの概要
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    /// 最終更新日時（RFC 3339）
    pub last_modified: Option<String>,
}

/// プレフィックス配下の一覧結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectListing {
    /// デリミタで区切られたサブフォルダ（末尾`/`付き）
    pub prefixes: Vec<String>,
    /// プレフィックス直下のオブジェクト
    pub objects: Vec<ObjectSummary>,
}

impl ObjectListing {
    /// フォルダマーカー（末尾`/`のキー）を除いたオブジェクト
    pub fn files(&self) -> impl Iterator<Item = &ObjectSummary> {
        self.objects.iter().filter(|o| !o.key.ends_with('/'))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.objects.is_empty()
    }
}

/// カテゴリ（フォルダ）の名前とパス
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub path: String,
}

/// フォルダ表示の1エントリ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FolderEntry {
    Directory {
        name: String,
        path: String,
    },
    File {
        name: String,
        path: String,
        size: i64,
        #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
        last_modified: Option<String>,
    },
}

/// パスの最後の空でないセグメントを返す
///
/// `"CLOUD/AWS/"` → `"AWS"`、`"CLOUD/AWS/intro.pdf"` → `"intro.pdf"`
pub fn entry_name(path: &str) -> &str {
    path.split('/').filter(|s| !s.is_empty()).next_back().unwrap_or("")
}

/// フォルダパスを一覧用のプレフィックス（末尾`/`付き）にする
///
/// 先頭の`/`は取り除く。空のパスはバケット全体を表す空文字になる。
pub fn folder_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// プレフィックス一覧をカテゴリに変換
pub fn categories(listing: &ObjectListing) -> Vec<Category> {
    listing
        .prefixes
        .iter()
        .map(|prefix| Category {
            name: entry_name(prefix).to_string(),
            path: prefix.clone(),
        })
        .collect()
}

/// ディレクトリを先に、続けてファイルを並べたフォルダ表示
pub fn folder_entries(listing: &ObjectListing) -> Vec<FolderEntry> {
    let directories = listing.prefixes.iter().map(|prefix| FolderEntry::Directory {
        name: entry_name(prefix).to_string(),
        path: prefix.clone(),
    });

    let files = listing.files().map(|object| FolderEntry::File {
        name: entry_name(&object.key).to_string(),
        path: object.key.clone(),
        size: object.size,
        last_modified: object.last_modified.clone(),
    });

    directories.chain(files).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> ObjectListing {
        ObjectListing {
            prefixes: vec!["CLOUD/AWS/".to_string(), "CLOUD/GCP/".to_string()],
            objects: vec![
                ObjectSummary {
                    key: "CLOUD/".to_string(),
                    size: 0,
                    last_modified: None,
                },
                ObjectSummary {
                    key: "CLOUD/guide.pdf".to_string(),
                    size: 2048,
                    last_modified: Some("2024-01-01T00:00:00Z".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("CLOUD/"), "CLOUD");
        assert_eq!(entry_name("CLOUD/AWS/"), "AWS");
        assert_eq!(entry_name("CLOUD/AWS/intro.pdf"), "intro.pdf");
        assert_eq!(entry_name(""), "");
    }

    #[test]
    fn test_folder_prefix() {
        assert_eq!(folder_prefix("CLOUD/AWS/courses/c-1"), "CLOUD/AWS/courses/c-1/");
        assert_eq!(folder_prefix("/CLOUD/AWS/"), "CLOUD/AWS/");
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("/"), "");
    }

    #[test]
    fn test_categories_from_prefixes() {
        let categories = categories(&listing());
        assert_eq!(
            categories,
            vec![
                Category {
                    name: "AWS".to_string(),
                    path: "CLOUD/AWS/".to_string()
                },
                Category {
                    name: "GCP".to_string(),
                    path: "CLOUD/GCP/".to_string()
                },
            ]
        );
    }

    /// フォルダマーカーはファイルとして表示しない
    #[test]
    fn test_folder_entries_skip_folder_markers() {
        let entries = folder_entries(&listing());

        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], FolderEntry::Directory { name, .. } if name == "AWS"));
        assert!(matches!(&entries[2], FolderEntry::File { name, size: 2048, .. } if name == "guide.pdf"));
    }

    #[test]
    fn test_folder_entry_serialization() {
        let entries = folder_entries(&listing());
        let value = serde_json::to_value(&entries).unwrap();

        assert_eq!(value[0]["type"], "directory");
        assert_eq!(value[0]["path"], "CLOUD/AWS/");
        assert_eq!(value[2]["type"], "file");
        assert_eq!(value[2]["lastModified"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_empty_listing() {
        assert!(ObjectListing::default().is_empty());
        assert!(!listing().is_empty());
    }
}
