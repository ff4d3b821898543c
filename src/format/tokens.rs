//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// フォーマットトークン
///
/// Excel Number Format Stringを字句解析した際に生成されるトークンです。
/// 数値の書式適用は行わないため、日付・時刻の判定に必要な粒度のみを区別します。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（例: "yyyy" -> 4, "yy" -> 2）
    Year(usize),

    /// 月（例: "mm" -> 2, "mmm" -> 3）
    Month(usize),

    /// 日（例: "dd" -> 2, "ddd" -> 3）
    Day(usize),

    /// 時（例: "hh" -> 2）
    Hour(usize),

    /// 分
    /// 注意: "m"は直前が時、または直後が秒の場合のみ分として扱う
    Minute(usize),

    /// 秒（例: "ss" -> 2）
    Second(usize),

    /// 経過時間（例: "[h]", "[mm]", "[ss]"）
    Elapsed(char),

    /// 午前/午後（"AM/PM", "A/P"）
    AmPm,

    /// 数字プレースホルダー（"0", "#", "?"）
    Digit,

    /// 小数点
    DecimalPoint,

    /// 千の位区切り
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// 指数表記（"E+", "E-"）
    Exponent,

    /// "General"
    General,

    /// テキストプレースホルダー（"@"）
    TextPlaceholder,

    /// 色指定（例: "[Red]"）
    Color(String),

    /// ロケール・通貨指定（例: "[$-409]", "[$€-2]"）
    Locale(String),

    /// 条件（例: "[>100]"）
    Condition(String),

    /// リテラル文字列（引用符、エスケープ、記号）
    Literal(String),
}

impl FormatToken {
    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::Elapsed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_datetime() {
        assert!(FormatToken::Year(4).is_datetime());
        assert!(FormatToken::Month(2).is_datetime());
        assert!(FormatToken::Day(2).is_datetime());
        assert!(FormatToken::Hour(2).is_datetime());
        assert!(FormatToken::Minute(2).is_datetime());
        assert!(FormatToken::Second(2).is_datetime());
        assert!(FormatToken::Elapsed('h').is_datetime());
        assert!(!FormatToken::AmPm.is_datetime());
        assert!(!FormatToken::Digit.is_datetime());
        assert!(!FormatToken::Literal("$".to_string()).is_datetime());
        assert!(!FormatToken::Color("Red".to_string()).is_datetime());
    }
}
