//! 交互式录入批改上下文
//!
//! 依次询问题目、评分点、批改说明和反馈字数

use std::io::{self, BufRead, Write};

use crate::models::context::GradingContext;

/// 未配置字数时的默认值
pub const DEFAULT_WORD_LIMIT: u32 = 50;

/// 从终端录入批改上下文
///
/// 评分点与批改说明每行一条，空行结束；字数直接回车时使用 `default_word_limit`
pub fn collect_grading_context<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    default_word_limit: u32,
) -> io::Result<GradingContext> {
    let question = loop {
        write!(output, "Enter the question: ")?;
        output.flush()?;
        match read_line(input)? {
            Some(line) if !line.is_empty() => break line,
            Some(_) => writeln!(output, "The question cannot be empty.")?,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "输入在录入题目前结束",
                ))
            }
        }
    };

    writeln!(output, "Enter rubric points, one per line (blank line to finish):")?;
    let rubric = read_block(input, output)?;

    writeln!(output, "Enter grading notes, one per line (blank line to finish):")?;
    let notes = read_block(input, output)?;

    let word_limit = loop {
        write!(output, "Enter the feedback word limit [{}]: ", default_word_limit)?;
        output.flush()?;
        match read_line(input)? {
            None => break default_word_limit,
            Some(line) if line.is_empty() => break default_word_limit,
            Some(line) => match line.parse::<u32>() {
                Ok(limit) if limit > 0 => break limit,
                _ => writeln!(output, "Please enter a positive whole number.")?,
            },
        }
    };

    Ok(GradingContext::new(question, rubric, notes, word_limit))
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn read_block<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Vec<String>> {
    let mut items = Vec::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;
        match read_line(input)? {
            Some(line) if !line.is_empty() => items.push(line),
            _ => break,
        }
    }
    Ok(items)
}
