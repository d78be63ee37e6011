//! 模型回复解析服务
//!
//! 模型输出不保证是合法 JSON，这里按三层逐级降级解析：
//!
//! 1. `Strict` - 去掉代码围栏后整体按 JSON 对象解码
//! 2. `BracketScan` - 找到第一个括号配平的 `{...}` 片段再解码
//! 3. `FieldRecovery` - 用正则逐个字段恢复（仅分析回复）
//!
//! 每层的结果都带上所用的层级和缺失字段，缺失字段降级为空值而不是整体失败。

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::models::analysis::AnalysisResult;
use crate::models::context::GradingContext;
use crate::models::validation::{ValidationCriterion, ValidationResult};

static STUDENT_RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"student_response"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});
static TEACHER_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"teacher_score"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});
static RUBRIC_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)+)"\s*:\s*(true|false)"#).expect("valid regex")
});
static MISCONCEPTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"misconceptions"\s*:\s*\[(.*?)\]"#).expect("valid regex")
});
static POINTS_EARNED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"points_earned"\s*:\s*\[(.*?)\]"#).expect("valid regex")
});
static QUOTED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)""#).expect("valid regex"));

/// 分析结果的字段名
pub const ANALYSIS_FIELDS: [&str; 5] = [
    "student_response",
    "teacher_score",
    "rubric_points",
    "misconceptions",
    "points_earned",
];

/// 评分点键名策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricKeyPolicy {
    /// 只接受上下文中列出的评分点（评分点列表为空时接受全部）
    Closed,
    /// 接受回复中所有的 true/false 键值对
    Open,
}

impl FromStr for RubricKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(RubricKeyPolicy::Closed),
            "open" => Ok(RubricKeyPolicy::Open),
            other => Err(format!("未知的评分点策略: {}", other)),
        }
    }
}

impl RubricKeyPolicy {
    fn accepts(self, context: &GradingContext, key: &str) -> bool {
        match self {
            RubricKeyPolicy::Open => true,
            RubricKeyPolicy::Closed => {
                context.rubric_points.is_empty() || context.has_rubric_key(key)
            }
        }
    }
}

/// 解析所用的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Strict,
    BracketScan,
    FieldRecovery,
}

/// 带层级和完整度标记的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub tier: ParseTier,
    /// 没有恢复出来、已降级为空值的字段
    pub missing: Vec<&'static str>,
}

impl<T> Parsed<T> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// 去掉首尾的代码围栏（```json ... ```），只做裁剪不做校验
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        body = rest.trim_start();
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim_end();
    }
    body
}

/// 找到第一个括号配平的 `{...}` 片段，字符串内的括号和转义会被跳过
pub fn find_json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// 严格解码 + 括号扫描解码，返回 JSON 对象及所用层级
fn decode_object(body: &str) -> Result<(Map<String, Value>, ParseTier), ParseError> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        return Ok((object, ParseTier::Strict));
    }

    if !body.contains('{') {
        return Err(ParseError::NoJsonObject);
    }

    let span = find_json_object_span(body)
        .ok_or_else(|| ParseError::InvalidJson("unterminated object".to_string()))?;

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Ok((object, ParseTier::BracketScan)),
        Ok(_) => Err(ParseError::InvalidJson("not an object".to_string())),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

// ========== 分析回复 ==========

/// 解析分析阶段的回复
pub fn parse_analysis(
    reply: &str,
    context: &GradingContext,
    policy: RubricKeyPolicy,
) -> Result<Parsed<AnalysisResult>, ParseError> {
    let body = strip_code_fence(reply);

    if let Ok((object, tier)) = decode_object(body) {
        let parsed = analysis_from_object(&object, tier, context, policy);
        if parsed.missing.len() < ANALYSIS_FIELDS.len() {
            return Ok(parsed);
        }
    }

    let parsed = recover_analysis_fields(body, context, policy);
    if parsed.missing.len() < ANALYSIS_FIELDS.len() {
        return Ok(parsed);
    }

    if body.contains('{') {
        Err(ParseError::NothingRecovered)
    } else {
        Err(ParseError::NoJsonObject)
    }
}

fn analysis_from_object(
    object: &Map<String, Value>,
    tier: ParseTier,
    context: &GradingContext,
    policy: RubricKeyPolicy,
) -> Parsed<AnalysisResult> {
    let mut missing = Vec::new();
    let mut result = AnalysisResult::default();

    match object.get("student_response").and_then(scalar_text) {
        Some(text) => result.student_response = text,
        None => missing.push("student_response"),
    }
    match object.get("teacher_score").and_then(scalar_text) {
        Some(text) => result.teacher_score = text,
        None => missing.push("teacher_score"),
    }
    match object.get("rubric_points").and_then(Value::as_object) {
        Some(points) => {
            result.rubric_points = points
                .iter()
                .filter_map(|(key, value)| value.as_bool().map(|flag| (key.clone(), flag)))
                .filter(|(key, _)| policy.accepts(context, key))
                .collect();
        }
        None => missing.push("rubric_points"),
    }
    match object.get("misconceptions").and_then(Value::as_array) {
        Some(items) => result.misconceptions = string_items(items),
        None => missing.push("misconceptions"),
    }
    match object.get("points_earned").and_then(Value::as_array) {
        Some(items) => result.points_earned = string_items(items),
        None => missing.push("points_earned"),
    }

    Parsed {
        value: result,
        tier,
        missing,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// 逐字段正则恢复
///
/// 评分点会匹配回复中任何位置的 `"name": true|false`，不区分是否在 rubric_points 对象内
fn recover_analysis_fields(
    body: &str,
    context: &GradingContext,
    policy: RubricKeyPolicy,
) -> Parsed<AnalysisResult> {
    let mut missing = Vec::new();
    let mut result = AnalysisResult::default();

    match capture_quoted(&STUDENT_RESPONSE_RE, body) {
        Some(text) => result.student_response = text,
        None => missing.push("student_response"),
    }
    match capture_quoted(&TEACHER_SCORE_RE, body) {
        Some(text) => result.teacher_score = text,
        None => missing.push("teacher_score"),
    }

    let rubric_points: BTreeMap<String, bool> = RUBRIC_PAIR_RE
        .captures_iter(body)
        .map(|caps| (unescape(&caps[1]), &caps[2] == "true"))
        .filter(|(key, _)| policy.accepts(context, key))
        .collect();
    if rubric_points.is_empty() {
        missing.push("rubric_points");
    }
    result.rubric_points = rubric_points;

    match capture_list(&MISCONCEPTIONS_RE, body) {
        Some(items) => result.misconceptions = items,
        None => missing.push("misconceptions"),
    }
    match capture_list(&POINTS_EARNED_RE, body) {
        Some(items) => result.points_earned = items,
        None => missing.push("points_earned"),
    }

    Parsed {
        value: result,
        tier: ParseTier::FieldRecovery,
        missing,
    }
}

fn capture_quoted(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).map(|caps| unescape(&caps[1]))
}

fn capture_list(re: &Regex, body: &str) -> Option<Vec<String>> {
    re.captures(body).map(|caps| {
        QUOTED_ITEM_RE
            .captures_iter(&caps[1])
            .map(|item| unescape(&item[1]).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

/// 按 JSON 字符串字面量反转义
///
/// 截断的多行转写里常有未转义的控制字符，先补上转义再解码；
/// 仍然失败时只还原 `\"` 和 `\\`
fn unescape(raw: &str) -> String {
    let mut literal = String::with_capacity(raw.len() + 2);
    literal.push('"');
    for c in raw.chars() {
        match c {
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\u{:04x}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');

    serde_json::from_str::<String>(&literal).unwrap_or_else(|_| unescape_quotes(raw))
}

fn unescape_quotes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('"' | '\\')) {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ========== 校验回复 ==========

/// 解析校验阶段的回复
///
/// 先整体解码，失败后取第一个配平的 `{...}` 片段；都失败则返回错误
pub fn parse_validation(reply: &str) -> Result<Parsed<ValidationResult>, ParseError> {
    let body = strip_code_fence(reply);
    let (object, tier) = decode_object(body)?;

    let verdict_source = object
        .get("results")
        .and_then(Value::as_object)
        .unwrap_or(&object);

    let mut verdicts = BTreeMap::new();
    for (key, value) in verdict_source {
        if let (Some(criterion), Some(passed)) = (ValidationCriterion::from_key(key), verdict(value))
        {
            verdicts.entry(criterion).or_insert(passed);
        }
    }

    let mut explanations = BTreeMap::new();
    if let Some(map) = object.get("explanations").and_then(Value::as_object) {
        for (key, value) in map {
            if let (Some(criterion), Some(text)) = (ValidationCriterion::from_key(key), value.as_str())
            {
                explanations.insert(criterion, text.to_string());
            }
        }
    }

    let missing = ValidationCriterion::ALL
        .iter()
        .filter(|criterion| !verdicts.contains_key(*criterion))
        .map(|criterion| criterion.key())
        .collect();

    Ok(Parsed {
        value: ValidationResult::from_verdicts(&verdicts, &explanations),
        tier,
        missing,
    })
}

fn verdict(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "pass" | "true" => Some(true),
            "n" | "no" | "fail" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(rubric: &[&str]) -> GradingContext {
        GradingContext::new("q", rubric.iter().copied(), Vec::<String>::new(), 50)
    }

    const FENCED_ANALYSIS: &str = r#"```json
{
    "student_response": "Fermentation regenerates NAD+ so glycolysis continues.",
    "teacher_score": "2/4",
    "rubric_points": {
        "purpose_regenerate_nad": true,
        "o2_role_etc": false,
        "pyruvate_oxidizing_agent": true
    },
    "misconceptions": ["Thinks pyruvate is oxidized"],
    "points_earned": ["purpose_regenerate_nad", "pyruvate_oxidizing_agent"]
}
```"#;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
    }

    #[test]
    fn test_find_json_object_span_skips_braces_in_strings() {
        let text = r#"Sure! {"a": "x}y", "b": {"c": 1}} trailing }"#;
        assert_eq!(
            find_json_object_span(text),
            Some(r#"{"a": "x}y", "b": {"c": 1}}"#)
        );
        assert_eq!(find_json_object_span(r#"{"a": 1"#), None);
        assert_eq!(find_json_object_span("no braces"), None);
    }

    #[test]
    fn test_fenced_analysis_is_parsed_strictly() {
        let ctx = context(&["purpose_regenerate_nad", "o2_role_etc", "pyruvate_oxidizing_agent"]);
        let parsed = parse_analysis(FENCED_ANALYSIS, &ctx, RubricKeyPolicy::Closed).unwrap();

        assert_eq!(parsed.tier, ParseTier::Strict);
        assert!(parsed.is_complete());
        let result = parsed.value;
        assert_eq!(
            result.student_response,
            "Fermentation regenerates NAD+ so glycolysis continues."
        );
        assert_eq!(result.teacher_score, "2/4");
        assert_eq!(
            result.rubric_points,
            BTreeMap::from([
                ("o2_role_etc".to_string(), false),
                ("purpose_regenerate_nad".to_string(), true),
                ("pyruvate_oxidizing_agent".to_string(), true),
            ])
        );
        assert_eq!(result.misconceptions, vec!["Thinks pyruvate is oxidized"]);
        assert_eq!(result.points_earned.len(), 2);
    }

    #[test]
    fn test_closed_policy_filters_unknown_keys() {
        let ctx = context(&["o2_role_etc"]);
        let closed = parse_analysis(FENCED_ANALYSIS, &ctx, RubricKeyPolicy::Closed).unwrap();
        assert_eq!(closed.value.rubric_points.len(), 1);

        let open = parse_analysis(FENCED_ANALYSIS, &ctx, RubricKeyPolicy::Open).unwrap();
        assert_eq!(open.value.rubric_points.len(), 3);

        let empty_rubric = context(&[]);
        let all = parse_analysis(FENCED_ANALYSIS, &empty_rubric, RubricKeyPolicy::Closed).unwrap();
        assert_eq!(all.value.rubric_points.len(), 3);
    }

    #[test]
    fn test_missing_misconceptions_degrades_to_empty_list() {
        let reply = r#"{"student_response": "text", "teacher_score": "1/2", "rubric_points": {"A": true}, "points_earned": ["A"]}"#;
        let parsed = parse_analysis(reply, &context(&["A"]), RubricKeyPolicy::Closed).unwrap();

        assert!(parsed.value.misconceptions.is_empty());
        assert_eq!(parsed.missing, vec!["misconceptions"]);
        assert_eq!(parsed.value.points_earned, vec!["A"]);
    }

    #[test]
    fn test_prose_wrapped_analysis_uses_bracket_scan() {
        let reply = format!("Here is the analysis:\n{}\nLet me know!", strip_code_fence(FENCED_ANALYSIS));
        let parsed = parse_analysis(&reply, &context(&[]), RubricKeyPolicy::Open).unwrap();

        assert_eq!(parsed.tier, ParseTier::BracketScan);
        assert_eq!(parsed.value.teacher_score, "2/4");
    }

    #[test]
    fn test_truncated_analysis_falls_back_to_field_recovery() {
        let reply = r#"```json
{
    "student_response": "He said \"NAD+\" is recycled",
    "teacher_score": "1/2",
    "rubric_points": {"A": true, "B": false, "C": true},
    "misconceptions": ["confuses \"oxidation\"", ""],
    "points_earn"#;
        let parsed = parse_analysis(reply, &context(&["A", "B"]), RubricKeyPolicy::Closed).unwrap();

        assert_eq!(parsed.tier, ParseTier::FieldRecovery);
        assert_eq!(parsed.missing, vec!["points_earned"]);
        assert_eq!(parsed.value.student_response, r#"He said "NAD+" is recycled"#);
        assert_eq!(
            parsed.value.rubric_points,
            BTreeMap::from([("A".to_string(), true), ("B".to_string(), false)])
        );
        assert_eq!(parsed.value.misconceptions, vec![r#"confuses "oxidation""#]);
    }

    #[test]
    fn test_field_recovery_picks_up_pairs_outside_rubric_object() {
        let reply = r#"{"teacher_score": "1/2", "rubric_points": {"A": true}, "extra": {"B": false}, oops"#;
        let parsed = parse_analysis(reply, &context(&[]), RubricKeyPolicy::Open).unwrap();

        assert_eq!(parsed.tier, ParseTier::FieldRecovery);
        assert_eq!(parsed.value.rubric_points.get("B"), Some(&false));
    }

    #[test]
    fn test_field_recovery_keeps_rubric_labels_with_quotes() {
        let label = r#"Defines "oxidizing agent""#;
        let reply = r#"{"teacher_score": "1/2", "rubric_points": {"Defines \"oxidizing agent\"": true, "B": false}, "misc"#;
        let parsed = parse_analysis(reply, &context(&[label, "B"]), RubricKeyPolicy::Closed).unwrap();

        assert_eq!(parsed.tier, ParseTier::FieldRecovery);
        assert_eq!(parsed.value.rubric_points.get(label), Some(&true));
        assert_eq!(parsed.value.rubric_points.get("B"), Some(&false));
        assert!(parsed.value.is_point_earned(label));
    }

    #[test]
    fn test_field_recovery_unescapes_multiline_transcription() {
        let reply = "{\"student_response\": \"Line one says \\\"NAD+\\\"\nline two\tend\", \"teacher_score\": \"1/2\", oops";
        let parsed = parse_analysis(reply, &context(&[]), RubricKeyPolicy::Open).unwrap();

        assert_eq!(parsed.tier, ParseTier::FieldRecovery);
        assert_eq!(
            parsed.value.student_response,
            "Line one says \"NAD+\"\nline two\tend"
        );
    }

    #[test]
    fn test_unescape_falls_back_to_quotes_only() {
        assert_eq!(unescape(r#"bad \x escape \"kept\""#), r#"bad \x escape "kept""#);
        assert_eq!(unescape(r"a \\ b"), r"a \ b");
    }

    #[test]
    fn test_garbage_analysis_is_a_parse_error() {
        let err = parse_analysis(
            "I cannot read this handwriting.",
            &context(&["A"]),
            RubricKeyPolicy::Closed,
        )
        .unwrap_err();
        assert_eq!(err, ParseError::NoJsonObject);

        let err = parse_analysis("{\"unrelated\": 1}", &context(&["A"]), RubricKeyPolicy::Closed)
            .unwrap_err();
        assert_eq!(err, ParseError::NothingRecovered);
    }

    const VALIDATION_JSON: &str = r#"{
        "scientific_correctness": "Y",
        "rubric_alignment": "Y",
        "topical_relevance": "Y",
        "clarity_professionalism": "Y",
        "actionable_guidance": "N",
        "tone_alignment": "Y",
        "encourages_improvement": "Y",
        "structural_clarity": "N",
        "explanations": {
            "actionable_guidance": "Does not say what to fix.",
            "structural_clarity": "Run-on paragraph."
        }
    }"#;

    #[test]
    fn test_parse_validation_direct() {
        let parsed = parse_validation(VALIDATION_JSON).unwrap();
        let result = &parsed.value;

        assert_eq!(parsed.tier, ParseTier::Strict);
        assert_eq!(result.score, 75.0);
        assert_eq!(
            result.failed_criteria,
            vec![
                ValidationCriterion::ActionableGuidance,
                ValidationCriterion::StructuralClarity
            ]
        );
        assert_eq!(result.explanations.len(), 2);
    }

    #[test]
    fn test_prose_wrapped_validation_matches_direct_decode() {
        let wrapped = format!(
            "Here is my evaluation of the feedback:\n{}\nHope this helps.",
            VALIDATION_JSON
        );
        let direct = parse_validation(VALIDATION_JSON).unwrap();
        let fallback = parse_validation(&wrapped).unwrap();

        assert_eq!(fallback.tier, ParseTier::BracketScan);
        assert_eq!(fallback.value, direct.value);
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            parse_validation("All criteria pass.").unwrap_err(),
            ParseError::NoJsonObject
        );
        assert!(matches!(
            parse_validation("Result: {scientific_correctness: Y}").unwrap_err(),
            ParseError::InvalidJson(_)
        ));
    }

    #[test]
    fn test_validation_accepts_booleans_and_nested_results() {
        let reply = r#"{"results": {"Scientific Correctness": true, "tone_alignment": "no"}}"#;
        let parsed = parse_validation(reply).unwrap();

        assert_eq!(parsed.value.score, 12.5);
        assert_eq!(parsed.missing.len(), 6);
        assert_eq!(
            parsed.value.results.get(&ValidationCriterion::ToneAlignment),
            Some(&false)
        );
    }
}
