//! FormatParser Module
//!
//! Excel Number Format Stringを字句解析し、日付・時刻書式かどうかを判定します。

use super::sections::{FormatSection, SectionKind};
use super::tokens::FormatToken;

/// Number Format Stringパーサー
///
/// 書式文字列をセクションとトークンに分解します。
/// 引用符で囲まれた文字列、エスケープ文字、`_`/`*`による埋め文字、
/// 角括弧（色・ロケール・条件）は書式コードとして扱いません。
#[derive(Debug, Clone)]
pub(crate) struct FormatParser {
    /// パースされたセクション
    sections: Vec<FormatSection>,
}

impl FormatParser {
    /// フォーマット文字列をパース
    ///
    /// # 引数
    ///
    /// * `format_string` - Excel Number Format String
    ///
    /// # 戻り値
    ///
    /// パース結果（字句解析は失敗しません。未知の文字はリテラルになります）
    pub fn parse(format_string: &str) -> Self {
        let mut sections = Vec::new();
        for (idx, section_str) in Self::split_sections(format_string).iter().enumerate() {
            let Some(kind) = SectionKind::from_position(idx) else {
                break;
            };
            sections.push(Self::parse_section(section_str, kind));
        }

        if sections.is_empty() {
            sections.push(FormatSection::new(SectionKind::Positive));
        }

        Self { sections }
    }

    /// いずれかの数値セクションが日付・時刻書式かどうか
    ///
    /// テキストセクションは文字列にのみ適用されるため判定から除外します。
    pub fn is_datetime(&self) -> bool {
        self.sections
            .iter()
            .filter(|s| s.kind != SectionKind::Text)
            .any(|s| s.is_datetime())
    }

    #[cfg(test)]
    pub fn sections(&self) -> &[FormatSection] {
        &self.sections
    }

    /// セクションに分割
    ///
    /// ';'で分割します。ただし、引用符・角括弧の内側とエスケープされた';'は除外します。
    fn split_sections(format_string: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_brackets = false;
        let mut escaped = false;

        for ch in format_string.chars() {
            if escaped {
                current.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' if !in_quotes => {
                    escaped = true;
                    current.push(ch);
                }
                '"' if !in_brackets => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '[' if !in_quotes => {
                    in_brackets = true;
                    current.push(ch);
                }
                ']' if !in_quotes => {
                    in_brackets = false;
                    current.push(ch);
                }
                ';' if !in_quotes && !in_brackets => {
                    sections.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            sections.push(current);
        }

        sections
    }

    fn parse_section(section_str: &str, kind: SectionKind) -> FormatSection {
        let mut section = FormatSection::new(kind);
        let chars: Vec<char> = section_str.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            match ch {
                '"' => {
                    let start = i + 1;
                    let end = Self::find_from(&chars, start, '"');
                    section
                        .tokens
                        .push(FormatToken::Literal(chars[start..end].iter().collect()));
                    i = end + 1;
                }
                '\\' => {
                    if let Some(next) = chars.get(i + 1) {
                        section.tokens.push(FormatToken::Literal(next.to_string()));
                    }
                    i += 2;
                }
                // 埋め文字（"_)"は幅調整、"* "は繰り返し）
                '_' | '*' => {
                    i += 2;
                }
                '[' => {
                    let start = i + 1;
                    let end = Self::find_from(&chars, start, ']');
                    let content: String = chars[start..end].iter().collect();
                    section.tokens.push(Self::classify_bracket(&content));
                    i = end + 1;
                }
                'a' | 'A' if Self::starts_with_ignore_case(&chars[i..], "am/pm") => {
                    section.tokens.push(FormatToken::AmPm);
                    i += 5;
                }
                'a' | 'A' if Self::starts_with_ignore_case(&chars[i..], "a/p") => {
                    section.tokens.push(FormatToken::AmPm);
                    i += 3;
                }
                'g' | 'G' if Self::starts_with_ignore_case(&chars[i..], "general") => {
                    section.tokens.push(FormatToken::General);
                    i += 7;
                }
                'e' | 'E' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                    section.tokens.push(FormatToken::Exponent);
                    i += 2;
                }
                'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' => {
                    let run = Self::run_length(&chars, i);
                    let token = match ch.to_ascii_lowercase() {
                        'y' => FormatToken::Year(run),
                        'd' => FormatToken::Day(run),
                        'h' => FormatToken::Hour(run),
                        's' => FormatToken::Second(run),
                        _ => FormatToken::Month(run),
                    };
                    section.tokens.push(token);
                    i += run;
                }
                '0' | '#' | '?' => {
                    section.tokens.push(FormatToken::Digit);
                    i += 1;
                }
                '.' => {
                    section.tokens.push(FormatToken::DecimalPoint);
                    i += 1;
                }
                ',' => {
                    section.tokens.push(FormatToken::ThousandSeparator);
                    i += 1;
                }
                '%' => {
                    section.tokens.push(FormatToken::Percent);
                    i += 1;
                }
                '@' => {
                    section.tokens.push(FormatToken::TextPlaceholder);
                    i += 1;
                }
                _ => {
                    section.tokens.push(FormatToken::Literal(ch.to_string()));
                    i += 1;
                }
            }
        }

        Self::resolve_minutes(&mut section.tokens);
        section
    }

    /// 角括弧内の内容を分類（経過時間・ロケール・条件・色）
    fn classify_bracket(content: &str) -> FormatToken {
        let lower = content.to_ascii_lowercase();
        if let Some(first) = lower.chars().next() {
            if matches!(first, 'h' | 'm' | 's') && lower.chars().all(|c| c == first) {
                return FormatToken::Elapsed(first);
            }
        }
        if content.starts_with('$') {
            FormatToken::Locale(content.to_string())
        } else if content.starts_with(['<', '>', '=']) {
            FormatToken::Condition(content.to_string())
        } else {
            FormatToken::Color(content.to_string())
        }
    }

    /// "m"を文脈に応じて分に置き換える（直前が時、または直後が秒の場合）
    fn resolve_minutes(tokens: &mut [FormatToken]) {
        for idx in 0..tokens.len() {
            let FormatToken::Month(run) = tokens[idx] else {
                continue;
            };
            let prev = tokens[..idx].iter().rev().find(|t| t.is_datetime());
            let next = tokens[idx + 1..].iter().find(|t| t.is_datetime());
            let after_hour = matches!(
                prev,
                Some(FormatToken::Hour(_)) | Some(FormatToken::Elapsed('h'))
            );
            let before_second = matches!(
                next,
                Some(FormatToken::Second(_)) | Some(FormatToken::Elapsed('s'))
            );
            if after_hour || before_second {
                tokens[idx] = FormatToken::Minute(run);
            }
        }
    }

    /// 同じ文字（大文字小文字を区別しない）の連続数
    fn run_length(chars: &[char], start: usize) -> usize {
        let target = chars[start].to_ascii_lowercase();
        chars[start..]
            .iter()
            .take_while(|c| c.to_ascii_lowercase() == target)
            .count()
    }

    /// `start`以降で最初に`target`が現れる位置（なければ末尾）
    fn find_from(chars: &[char], start: usize, target: char) -> usize {
        let start = start.min(chars.len());
        chars[start..]
            .iter()
            .position(|&c| c == target)
            .map_or(chars.len(), |p| start + p)
    }

    fn starts_with_ignore_case(chars: &[char], pattern: &str) -> bool {
        let mut it = chars.iter();
        pattern
            .chars()
            .all(|p| it.next().is_some_and(|c| c.eq_ignore_ascii_case(&p)))
    }
}

/// 書式文字列が日付・時刻書式かどうかを判定
pub(crate) fn is_date_format(format_string: &str) -> bool {
    FormatParser::parse(format_string).is_datetime()
}

/// ビルトイン書式ID（0-163）のうち日付・時刻を表すもの
///
/// 14-22, 45-47 は全ロケール共通、27-36, 50-58 は東アジアロケールの日付書式です。
pub(crate) fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
/// ロケール依存のID（27-36, 50-58など）は含みません。
pub(crate) fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
