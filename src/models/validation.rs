//! 反馈质量校验结果
//!
//! 八项固定的校验标准，以及由逐项 Y/N 计算出的得分

use std::collections::BTreeMap;

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 校验标准
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCriterion {
    /// 科学正确性
    ScientificCorrectness,
    /// 与评分标准一致
    RubricAlignment,
    /// 切题
    TopicalRelevance,
    /// 清晰专业
    ClarityProfessionalism,
    /// 可执行的指导
    ActionableGuidance,
    /// 语气符合教师偏好
    ToneAlignment,
    /// 鼓励改进
    EncouragesImprovement,
    /// 结构清晰
    StructuralClarity,
}

/// 标准键名及常见别名（小写、下划线分隔）
static CRITERION_KEYS: phf::Map<&'static str, ValidationCriterion> = phf_map! {
    "scientific_correctness" => ValidationCriterion::ScientificCorrectness,
    "scientific_accuracy" => ValidationCriterion::ScientificCorrectness,
    "correctness" => ValidationCriterion::ScientificCorrectness,
    "rubric_alignment" => ValidationCriterion::RubricAlignment,
    "topical_relevance" => ValidationCriterion::TopicalRelevance,
    "relevance" => ValidationCriterion::TopicalRelevance,
    "clarity_professionalism" => ValidationCriterion::ClarityProfessionalism,
    "clarity_and_professionalism" => ValidationCriterion::ClarityProfessionalism,
    "actionable_guidance" => ValidationCriterion::ActionableGuidance,
    "tone_alignment" => ValidationCriterion::ToneAlignment,
    "encourages_improvement" => ValidationCriterion::EncouragesImprovement,
    "encouragement_of_improvement" => ValidationCriterion::EncouragesImprovement,
    "structural_clarity" => ValidationCriterion::StructuralClarity,
    "structure" => ValidationCriterion::StructuralClarity,
};

impl ValidationCriterion {
    /// 全部标准，按固定顺序
    pub const ALL: [ValidationCriterion; 8] = [
        ValidationCriterion::ScientificCorrectness,
        ValidationCriterion::RubricAlignment,
        ValidationCriterion::TopicalRelevance,
        ValidationCriterion::ClarityProfessionalism,
        ValidationCriterion::ActionableGuidance,
        ValidationCriterion::ToneAlignment,
        ValidationCriterion::EncouragesImprovement,
        ValidationCriterion::StructuralClarity,
    ];

    /// JSON 键名
    pub fn key(self) -> &'static str {
        match self {
            ValidationCriterion::ScientificCorrectness => "scientific_correctness",
            ValidationCriterion::RubricAlignment => "rubric_alignment",
            ValidationCriterion::TopicalRelevance => "topical_relevance",
            ValidationCriterion::ClarityProfessionalism => "clarity_professionalism",
            ValidationCriterion::ActionableGuidance => "actionable_guidance",
            ValidationCriterion::ToneAlignment => "tone_alignment",
            ValidationCriterion::EncouragesImprovement => "encourages_improvement",
            ValidationCriterion::StructuralClarity => "structural_clarity",
        }
    }

    /// 展示用名称
    pub fn label(self) -> &'static str {
        match self {
            ValidationCriterion::ScientificCorrectness => "Scientific correctness",
            ValidationCriterion::RubricAlignment => "Rubric alignment",
            ValidationCriterion::TopicalRelevance => "Topical relevance",
            ValidationCriterion::ClarityProfessionalism => "Clarity and professionalism",
            ValidationCriterion::ActionableGuidance => "Actionable guidance",
            ValidationCriterion::ToneAlignment => "Tone alignment",
            ValidationCriterion::EncouragesImprovement => "Encourages improvement",
            ValidationCriterion::StructuralClarity => "Structural clarity",
        }
    }

    /// 写进提示词的判定问题
    pub fn question(self) -> &'static str {
        match self {
            ValidationCriterion::ScientificCorrectness => {
                "Is every scientific statement in the feedback correct?"
            }
            ValidationCriterion::RubricAlignment => {
                "Does the feedback reflect which rubric points were earned and which were missed?"
            }
            ValidationCriterion::TopicalRelevance => {
                "Does the feedback stay on the question and the student's actual response?"
            }
            ValidationCriterion::ClarityProfessionalism => {
                "Is the feedback clear and professional?"
            }
            ValidationCriterion::ActionableGuidance => {
                "Does the feedback tell the student concretely what to improve?"
            }
            ValidationCriterion::ToneAlignment => {
                "Does the tone match the teacher's preferences (direct, personal, academic)?"
            }
            ValidationCriterion::EncouragesImprovement => {
                "Does the feedback encourage the student to improve?"
            }
            ValidationCriterion::StructuralClarity => {
                "Is the feedback well structured (strengths first, then gaps)?"
            }
        }
    }

    /// 从键名或别名解析标准，忽略大小写、空格和连字符
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' | '/' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        CRITERION_KEYS.get(normalized.as_str()).copied()
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 每项标准是否通过
    pub results: BTreeMap<ValidationCriterion, bool>,
    /// 未通过的标准（固定顺序）
    pub failed_criteria: Vec<ValidationCriterion>,
    /// 百分制得分 = 100 × 通过数 / 8
    pub score: f64,
    /// 未通过标准的说明
    pub explanations: BTreeMap<ValidationCriterion, String>,
}

/// 模型没有给出判定时使用的说明
pub const NO_VERDICT_EXPLANATION: &str = "no verdict returned";

impl ValidationResult {
    /// 由逐项判定构建校验结果
    ///
    /// 缺失的标准按未通过处理；只保留未通过标准的说明
    pub fn from_verdicts(
        verdicts: &BTreeMap<ValidationCriterion, bool>,
        explanations: &BTreeMap<ValidationCriterion, String>,
    ) -> Self {
        let mut results = BTreeMap::new();
        let mut failed_criteria = Vec::new();
        let mut failed_explanations = BTreeMap::new();

        for criterion in ValidationCriterion::ALL {
            match verdicts.get(&criterion) {
                Some(true) => {
                    results.insert(criterion, true);
                }
                verdict => {
                    results.insert(criterion, false);
                    failed_criteria.push(criterion);
                    let explanation = match (verdict, explanations.get(&criterion)) {
                        (_, Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
                        (None, _) => NO_VERDICT_EXPLANATION.to_string(),
                        (Some(_), _) => String::new(),
                    };
                    if !explanation.is_empty() {
                        failed_explanations.insert(criterion, explanation);
                    }
                }
            }
        }

        let passed = ValidationCriterion::ALL.len() - failed_criteria.len();
        let score = 100.0 * passed as f64 / ValidationCriterion::ALL.len() as f64;

        Self {
            results,
            failed_criteria,
            score,
            explanations: failed_explanations,
        }
    }

    /// 通过的标准数量
    pub fn passed_count(&self) -> usize {
        self.results.values().filter(|passed| **passed).count()
    }
}
