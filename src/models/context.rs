//! 批改上下文
//!
//! 一次批改会话只录入一次，批处理期间只读

use serde::{Deserialize, Serialize};

/// 单个评分点
///
/// 评分点的标签本身就是模型回复和产物中的键名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricPoint {
    pub label: String,
}

impl RubricPoint {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into().trim().to_string(),
        }
    }

    /// 在 JSON 中使用的键名
    pub fn key(&self) -> &str {
        &self.label
    }
}

/// 批改上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingContext {
    /// 题目
    pub question: String,
    /// 评分点（有序）
    pub rubric_points: Vec<RubricPoint>,
    /// 批改说明（有序）
    pub grading_notes: Vec<String>,
    /// 反馈目标字数
    pub word_limit: u32,
}

impl GradingContext {
    /// 创建批改上下文
    ///
    /// 空白评分点会被忽略，重复的评分点只保留第一个；字数至少为 1
    pub fn new<R, N>(question: impl Into<String>, rubric: R, notes: N, word_limit: u32) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let mut rubric_points: Vec<RubricPoint> = Vec::new();
        for label in rubric {
            let point = RubricPoint::new(label);
            if point.label.is_empty() || rubric_points.iter().any(|p| p.label == point.label) {
                continue;
            }
            rubric_points.push(point);
        }

        let grading_notes = notes
            .into_iter()
            .map(|n| n.into().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        Self {
            question: question.into().trim().to_string(),
            rubric_points,
            grading_notes,
            word_limit: word_limit.max(1),
        }
    }

    /// 所有评分点键名
    pub fn rubric_keys(&self) -> impl Iterator<Item = &str> {
        self.rubric_points.iter().map(RubricPoint::key)
    }

    /// 是否是已知的评分点
    pub fn has_rubric_key(&self, key: &str) -> bool {
        self.rubric_keys().any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_dedupes() {
        let ctx = GradingContext::new(
            "  Why ferment? ",
            vec!["A", " A ", "", "B"],
            vec!["note", "   "],
            0,
        );

        assert_eq!(ctx.question, "Why ferment?");
        assert_eq!(ctx.rubric_keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(ctx.grading_notes, vec!["note"]);
        assert_eq!(ctx.word_limit, 1);
        assert!(ctx.has_rubric_key("B"));
        assert!(!ctx.has_rubric_key("C"));
    }
}
