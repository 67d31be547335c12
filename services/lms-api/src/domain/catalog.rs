// 講義カタログのカテゴリツリー
//
// 講義テーブル全件を大分類 → 小分類 → 講義の木構造にまとめる。
// 分類名の昇順で並べる。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::CourseRecord;

/// 大分類ノード
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainCategoryNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sub_categories: Vec<SubCategoryNode>,
}

/// 小分類ノード
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub courses: Vec<CourseRecord>,
}

const DIRECTORY: &str = "directory";

/// 講義一覧をカテゴリツリーにまとめる
pub fn group_by_category(courses: &[CourseRecord]) -> Vec<MainCategoryNode> {
    let mut tree: BTreeMap<&str, BTreeMap<&str, Vec<CourseRecord>>> = BTreeMap::new();

    for course in courses {
        tree.entry(course.main_category.as_str())
            .or_default()
            .entry(course.sub_category.as_str())
            .or_default()
            .push(course.clone());
    }

    tree.into_iter()
        .map(|(main, subs)| MainCategoryNode {
            name: main.to_string(),
            path: main.to_string(),
            kind: DIRECTORY,
            sub_categories: subs
                .into_iter()
                .map(|(sub, courses)| SubCategoryNode {
                    name: sub.to_string(),
                    path: format!("{main}/{sub}"),
                    kind: DIRECTORY,
                    courses,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseStatus, InstructorRef};

    fn course(id: &str, main: &str, sub: &str) -> CourseRecord {
        CourseRecord {
            id: id.to_string(),
            title: format!("course {id}"),
            description: String::new(),
            main_category: main.to_string(),
            sub_category: sub.to_string(),
            instructor: InstructorRef::default(),
            status: CourseStatus::Published,
            thumbnail: None,
            price: None,
            level: None,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_group_by_category() {
        let courses = vec![
            course("1", "WEB", "React"),
            course("2", "CLOUD", "AWS"),
            course("3", "CLOUD", "AWS"),
            course("4", "CLOUD", "Azure"),
        ];

        let tree = group_by_category(&courses);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "CLOUD");
        assert_eq!(tree[0].sub_categories.len(), 2);
        assert_eq!(tree[0].sub_categories[0].path, "CLOUD/AWS");
        assert_eq!(tree[0].sub_categories[0].courses.len(), 2);
        assert_eq!(tree[1].name, "WEB");
        assert_eq!(tree[1].sub_categories[0].courses[0].id, "1");
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_category(&[]).is_empty());
    }

    #[test]
    fn test_node_serialization() {
        let tree = group_by_category(&[course("1", "CLOUD", "AWS")]);
        let value = serde_json::to_value(&tree).unwrap();

        assert_eq!(value[0]["type"], "directory");
        assert_eq!(value[0]["subCategories"][0]["type"], "directory");
        assert_eq!(value[0]["subCategories"][0]["courses"][0]["id"], "1");
    }
}
