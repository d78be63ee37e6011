//! 结果摘要
//!
//! 把一张图片的批改结果渲染成便于阅读的文本

use std::fmt::Write;

use crate::models::context::GradingContext;
use crate::workflow::GradedFile;

/// 渲染单个文件的结果摘要
pub fn render_summary(file_name: &str, graded: &GradedFile, context: &GradingContext) -> String {
    let analysis = &graded.analysis;
    let validation = &graded.validation;
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "📄 {}", file_name);
    let _ = writeln!(out, "{}", "=".repeat(60));

    let score = if analysis.teacher_score.is_empty() {
        "(未给出)"
    } else {
        analysis.teacher_score.as_str()
    };
    let _ = writeln!(out, "Score: {}", score);

    let earned: Vec<&str> = context
        .rubric_keys()
        .filter(|key| analysis.is_point_earned(key))
        .collect();
    write_list(&mut out, "Earned points", &earned);
    write_list(&mut out, "Missing points", &analysis.missing_points(context));

    let described: Vec<&str> = analysis.points_earned.iter().map(String::as_str).collect();
    write_list(&mut out, "Points earned (as described)", &described);

    let misconceptions: Vec<&str> = analysis.misconceptions.iter().map(String::as_str).collect();
    write_list(&mut out, "Misconceptions", &misconceptions);

    let _ = writeln!(out, "\nFeedback:\n{}", graded.feedback.trim());

    let _ = writeln!(
        out,
        "\nValidation: {:.1}% ({}/{} passed)",
        validation.score,
        validation.passed_count(),
        validation.results.len()
    );
    for (criterion, passed) in &validation.results {
        let icon = if *passed { "✅" } else { "❌" };
        let _ = writeln!(out, "  {} {}", icon, criterion.label());
        if let Some(explanation) = validation.explanations.get(criterion) {
            let _ = writeln!(out, "      ↳ {}", explanation);
        }
    }

    out
}

fn write_list(out: &mut String, title: &str, items: &[&str]) {
    let _ = writeln!(out, "{}:", title);
    if items.is_empty() {
        let _ = writeln!(out, "  - (none)");
    }
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::AnalysisResult;
    use crate::models::validation::{ValidationCriterion, ValidationResult};
    use crate::services::ParseTier;
    use crate::workflow::ProcessState;
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_shows_points_and_failed_criteria() {
        let ctx = GradingContext::new("q", vec!["A", "B"], Vec::<String>::new(), 50);
        let verdicts: BTreeMap<_, _> = ValidationCriterion::ALL
            .iter()
            .map(|c| (*c, *c != ValidationCriterion::ToneAlignment))
            .collect();
        let explanations =
            BTreeMap::from([(ValidationCriterion::ToneAlignment, "Too formal.".to_string())]);
        let graded = GradedFile {
            analysis: AnalysisResult {
                teacher_score: "1/2".to_string(),
                rubric_points: BTreeMap::from([("A".to_string(), true), ("B".to_string(), false)]),
                misconceptions: vec!["mixes up oxidation".to_string()],
                points_earned: vec!["Explains why A happens".to_string()],
                ..Default::default()
            },
            analysis_tier: ParseTier::Strict,
            feedback: "You explain A well.".to_string(),
            validation: ValidationResult::from_verdicts(&verdicts, &explanations),
            state: ProcessState::Persisted,
        };

        let summary = render_summary("scan.jpg", &graded, &ctx);

        assert!(summary.contains("Score: 1/2"));
        assert!(summary.contains("Earned points:\n  - A\n"));
        assert!(summary.contains("Missing points:\n  - B\n"));
        assert!(summary.contains("  - mixes up oxidation"));
        assert!(summary.contains("Points earned (as described):\n  - Explains why A happens\n"));
        assert!(summary.contains("Validation: 87.5% (7/8 passed)"));
        assert!(summary.contains("❌ Tone alignment\n      ↳ Too formal."));
        assert!(summary.contains("✅ Scientific correctness"));
    }
}
