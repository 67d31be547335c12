// 掲示板ごとのオブジェクト配置
//
// - コミュニティ: `posts/<id>/metadata.json`
// - Q&A: `qna/<id>.json`
// - お知らせ: `notices/<id>/metadata.json`
//
// 添付ファイルはいずれも`<root><id>/attachments/`以下に置く。

use crate::domain::ObjectListing;

const METADATA_FILE_NAME: &str = "metadata.json";

/// 掲示板の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    Notice,
    Community,
    Qna,
}

impl BoardKind {
    /// 掲示板の全オブジェクトに共通するプレフィックス
    pub fn root_prefix(&self) -> &'static str {
        match self {
            BoardKind::Notice => "notices/",
            BoardKind::Community => "posts/",
            BoardKind::Qna => "qna/",
        }
    }

    /// 投稿JSONのキー
    pub fn metadata_key(&self, post_id: &str) -> String {
        match self {
            BoardKind::Qna => format!("{}{post_id}.json", self.root_prefix()),
            _ => format!("{}{post_id}/{METADATA_FILE_NAME}", self.root_prefix()),
        }
    }

    pub fn attachment_prefix(&self, post_id: &str) -> String {
        format!("{}{post_id}/attachments/", self.root_prefix())
    }

    pub fn attachment_key(&self, post_id: &str, file_id: &str, file_name: &str) -> String {
        format!("{}{file_id}-{file_name}", self.attachment_prefix(post_id))
    }

    /// `isAnswered`フラグを持つか（Q&Aのみ）
    pub fn tracks_answers(&self) -> bool {
        matches!(self, BoardKind::Qna)
    }

    /// 閲覧時に`updatedAt`も更新するか（Q&Aのみ）
    pub fn touches_on_view(&self) -> bool {
        matches!(self, BoardKind::Qna)
    }

    /// `root_prefix()`を区切り文字付きで一覧した結果から投稿JSONのキーを取り出す
    ///
    /// 投稿ごとにフォルダを持つ掲示板は共通プレフィックスが投稿になる。
    /// Q&Aはルート直下の`.json`が投稿で、添付フォルダのプレフィックスは無視する。
    pub fn metadata_keys(&self, listing: &ObjectListing) -> Vec<String> {
        match self {
            BoardKind::Qna => listing
                .objects
                .iter()
                .filter(|o| o.key.ends_with(".json"))
                .filter(|o| {
                    o.key
                        .strip_prefix(self.root_prefix())
                        .is_some_and(|rest| !rest.contains('/'))
                })
                .map(|o| o.key.clone())
                .collect(),
            _ => listing
                .prefixes
                .iter()
                .map(|prefix| format!("{prefix}{METADATA_FILE_NAME}"))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectSummary;

    fn object(key: &str) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            size: 1,
            last_modified: None,
        }
    }

    #[test]
    fn test_metadata_keys_per_board() {
        assert_eq!(
            BoardKind::Community.metadata_key("p-1"),
            "posts/p-1/metadata.json"
        );
        assert_eq!(BoardKind::Qna.metadata_key("q-1"), "qna/q-1.json");
        assert_eq!(
            BoardKind::Notice.metadata_key("n-1"),
            "notices/n-1/metadata.json"
        );
    }

    #[test]
    fn test_attachment_key() {
        assert_eq!(
            BoardKind::Qna.attachment_key("q-1", "f-1", "log.txt"),
            "qna/q-1/attachments/f-1-log.txt"
        );
        assert_eq!(
            BoardKind::Community.attachment_prefix("p-1"),
            "posts/p-1/attachments/"
        );
    }

    #[test]
    fn test_tracks_answers() {
        assert!(BoardKind::Qna.tracks_answers());
        assert!(!BoardKind::Community.tracks_answers());
        assert!(!BoardKind::Notice.tracks_answers());
    }

    #[test]
    fn test_touches_on_view() {
        assert!(BoardKind::Qna.touches_on_view());
        assert!(!BoardKind::Community.touches_on_view());
        assert!(!BoardKind::Notice.touches_on_view());
    }

    #[test]
    fn test_folder_board_keys_come_from_prefixes() {
        let listing = ObjectListing {
            prefixes: vec!["posts/a/".to_string(), "posts/b/".to_string()],
            objects: vec![object("posts/readme.json")],
        };

        assert_eq!(
            BoardKind::Community.metadata_keys(&listing),
            vec!["posts/a/metadata.json", "posts/b/metadata.json"]
        );
    }

    #[test]
    fn test_qna_keys_skip_non_json_and_nested_objects() {
        let listing = ObjectListing {
            prefixes: vec!["qna/q-1/".to_string()],
            objects: vec![
                object("qna/q-1.json"),
                object("qna/q-2.json"),
                object("qna/notes.txt"),
                object("qna/q-1/attachments/f-data.json"),
            ],
        };

        assert_eq!(
            BoardKind::Qna.metadata_keys(&listing),
            vec!["qna/q-1.json", "qna/q-2.json"]
        );
    }
}
