use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::context::GradingContext;

/// 第一阶段的分析结果：学生作答的转写与评分点覆盖情况
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 学生作答原文
    pub student_response: String,
    /// 教师评分，形如 "earned/total"
    pub teacher_score: String,
    /// 评分点 → 是否得分
    pub rubric_points: BTreeMap<String, bool>,
    /// 概念错误
    pub misconceptions: Vec<String>,
    /// 已得分的评分点描述
    pub points_earned: Vec<String>,
}

impl AnalysisResult {
    /// 评分点是否得分，缺失的键视为未得分
    pub fn is_point_earned(&self, key: &str) -> bool {
        self.rubric_points.get(key).copied().unwrap_or(false)
    }

    /// 按上下文顺序列出未得分的评分点
    pub fn missing_points<'a>(&self, context: &'a GradingContext) -> Vec<&'a str> {
        context
            .rubric_keys()
            .filter(|key| !self.is_point_earned(key))
            .collect()
    }

    /// 按上下文顺序列出每个评分点的状态（缺失视为 false）
    pub fn rubric_status(&self, context: &GradingContext) -> BTreeMap<String, bool> {
        let mut status: BTreeMap<String, bool> = context
            .rubric_keys()
            .map(|key| (key.to_string(), self.is_point_earned(key)))
            .collect();
        for (key, value) in &self.rubric_points {
            status.entry(key.clone()).or_insert(*value);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_points_default_to_false() {
        let ctx = GradingContext::new("q", vec!["A", "B", "C"], Vec::<String>::new(), 50);
        let result = AnalysisResult {
            rubric_points: BTreeMap::from([("A".to_string(), true), ("B".to_string(), false)]),
            ..Default::default()
        };

        assert_eq!(result.missing_points(&ctx), vec!["B", "C"]);
        let status = result.rubric_status(&ctx);
        assert_eq!(status.get("C"), Some(&false));
        assert_eq!(status.get("A"), Some(&true));
    }
}
