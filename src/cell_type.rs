//! Cell Type Module
//!
//! セルの`t`属性と`s`属性から値の意味的な型を決定し、
//! セル終了時にバッファされたテキストを`CellValue`へ変換します。

use std::sync::Arc;

use crate::date::serial_to_datetime;
use crate::error::XlsxStreamError;
use crate::shared_strings::SharedStrings;
use crate::styles::StyleTable;
use crate::types::{CellValue, WorkbookProperties};

/// セル値の種類（セル開始時に決定し、セル終了時まで保持する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// `t="s"`: 共有文字列テーブルへのインデックス
    SharedString,
    /// `t="inlineStr"`: テキストそのもの
    InlineString,
    /// `t="n"`または省略: 数値
    Number,
    /// `t="b"`: 真偽値
    Bool,
    /// 日付書式が適用された数値
    Date,
    /// その他の型コード（`str`, `e`など）: テキストをそのまま使用
    Unknown,
}

/// セル型の判定と値の変換を行う
///
/// 共有文字列テーブルとスタイルテーブルは`Arc`で共有され、
/// 同じワークブックの複数のワークシート処理で複製されません。
#[derive(Debug, Clone)]
pub struct CellResolver {
    shared_strings: Arc<SharedStrings>,
    styles: Arc<StyleTable>,
    is_1904: bool,
    detect_dates: bool,
}

impl CellResolver {
    pub fn new(
        shared_strings: Arc<SharedStrings>,
        styles: Arc<StyleTable>,
        properties: &WorkbookProperties,
    ) -> Self {
        Self {
            shared_strings,
            styles,
            is_1904: properties.is_1904(),
            detect_dates: true,
        }
    }

    /// 日付書式の数値を日時として扱うかどうか（既定: true）
    pub fn with_date_detection(mut self, detect_dates: bool) -> Self {
        self.detect_dates = detect_dates;
        self
    }

    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// 型コードとスタイルIDからセルの種類を決定
    ///
    /// # 引数
    ///
    /// * `type_code` - `t`属性の値（省略時は`None`）
    /// * `style_id` - `s`属性の値（省略時は`None`）
    ///
    /// # 戻り値
    ///
    /// * `Ok(CellKind)` - 判定結果
    /// * `Err(XlsxStreamError::Format)` - 数値セルのスタイルIDが整数でない場合
    pub fn classify(
        &self,
        type_code: Option<&str>,
        style_id: Option<&str>,
    ) -> Result<CellKind, XlsxStreamError> {
        let kind = match type_code {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("b") => CellKind::Bool,
            None | Some("n") => match style_id.map(str::trim).filter(|s| !s.is_empty()) {
                Some(id) if self.detect_dates => {
                    let id: usize = id.parse().map_err(|_| {
                        XlsxStreamError::Format(format!("Invalid style id: '{}'", id))
                    })?;
                    if self.styles.is_date(id) {
                        CellKind::Date
                    } else {
                        CellKind::Number
                    }
                }
                _ => CellKind::Number,
            },
            Some(_) => CellKind::Unknown,
        };
        Ok(kind)
    }

    /// セル終了時のテキストを値に変換
    ///
    /// # 引数
    ///
    /// * `kind` - セル開始時に決定した種類
    /// * `text` - `<v>`（またはインライン文字列の`<t>`）のテキスト
    /// * `bool_override` - 直前の`<f>`が`TRUE()`/`FALSE()`だった場合にtrue
    pub fn convert(
        &self,
        kind: CellKind,
        text: &str,
        bool_override: bool,
    ) -> Result<CellValue, XlsxStreamError> {
        match kind {
            CellKind::InlineString | CellKind::Unknown => Ok(CellValue::Text(text.to_string())),
            CellKind::SharedString => self.shared_string(text),
            CellKind::Bool => Ok(CellValue::Bool(text != "0")),
            CellKind::Number | CellKind::Date if text.is_empty() => Ok(CellValue::Null),
            // 日付書式の有無にかかわらず、数値セルの上書きが優先される
            CellKind::Number | CellKind::Date if bool_override => {
                Ok(CellValue::Bool(is_one(text)))
            }
            CellKind::Number => parse_number(text),
            CellKind::Date => {
                let serial = parse_finite(text).ok_or_else(|| {
                    XlsxStreamError::Format(format!("Invalid date serial: '{}'", text))
                })?;
                serial_to_datetime(serial, self.is_1904).map(CellValue::DateTime)
            }
        }
    }

    fn shared_string(&self, text: &str) -> Result<CellValue, XlsxStreamError> {
        let len = self.shared_strings.len();
        text.trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.shared_strings.get(index))
            .map(|s| CellValue::Text(s.to_string()))
            .ok_or_else(|| XlsxStreamError::Reference {
                index: text.to_string(),
                len,
            })
    }
}

/// 整数として解釈し、失敗した場合は浮動小数点数として解釈する
fn parse_number(text: &str) -> Result<CellValue, XlsxStreamError> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(CellValue::Int(i));
    }
    parse_finite(trimmed)
        .map(CellValue::Float)
        .ok_or_else(|| XlsxStreamError::Format(format!("Invalid numeric value: '{}'", text)))
}

/// `inf`や`NaN`はセルの数値として認めない
fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// 整数の1だけを真とする
fn is_one(text: &str) -> bool {
    text.trim().parse::<i64>() == Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, HashMap};

    fn resolver(is_1904: bool) -> CellResolver {
        let strings = SharedStrings::new(vec!["hello".to_string(), "world".to_string()]);
        // スタイル0: General, スタイル1: 日付(14), スタイル2: 0.00
        let styles = StyleTable::from_format_ids(&[0, 14, 2], &HashMap::new());
        let mut entries = BTreeMap::new();
        if is_1904 {
            entries.insert("date1904".to_string(), "1".to_string());
        }
        CellResolver::new(
            Arc::new(strings),
            Arc::new(styles),
            &WorkbookProperties::from_entries(entries),
        )
    }

    #[test]
    fn test_classify_type_codes() {
        let r = resolver(false);
        assert_eq!(r.classify(Some("s"), None).unwrap(), CellKind::SharedString);
        assert_eq!(
            r.classify(Some("inlineStr"), None).unwrap(),
            CellKind::InlineString
        );
        assert_eq!(r.classify(Some("b"), None).unwrap(), CellKind::Bool);
        assert_eq!(r.classify(None, None).unwrap(), CellKind::Number);
        assert_eq!(r.classify(Some("n"), Some("2")).unwrap(), CellKind::Number);
        assert_eq!(r.classify(Some("str"), None).unwrap(), CellKind::Unknown);
        assert_eq!(r.classify(Some("e"), Some("1")).unwrap(), CellKind::Unknown);
    }

    #[test]
    fn test_classify_date_styles() {
        let r = resolver(false);
        assert_eq!(r.classify(None, Some("1")).unwrap(), CellKind::Date);
        assert_eq!(r.classify(Some("n"), Some("1")).unwrap(), CellKind::Date);
        assert_eq!(r.classify(None, Some("")).unwrap(), CellKind::Number);
        // テーブル範囲外は日付ではない
        assert_eq!(r.classify(None, Some("42")).unwrap(), CellKind::Number);
        // 日付判定を無効化
        let r = r.with_date_detection(false);
        assert_eq!(r.classify(None, Some("1")).unwrap(), CellKind::Number);
    }

    #[test]
    fn test_classify_invalid_style_id() {
        let r = resolver(false);
        assert!(matches!(
            r.classify(None, Some("x1")),
            Err(XlsxStreamError::Format(_))
        ));
    }

    #[test]
    fn test_convert_shared_string() {
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::SharedString, "1", false).unwrap(),
            CellValue::Text("world".to_string())
        );
        assert!(matches!(
            r.convert(CellKind::SharedString, "2", false),
            Err(XlsxStreamError::Reference { len: 2, .. })
        ));
        assert!(matches!(
            r.convert(CellKind::SharedString, "one", false),
            Err(XlsxStreamError::Reference { .. })
        ));
    }

    #[test]
    fn test_convert_numbers() {
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::Number, "123", false).unwrap(),
            CellValue::Int(123)
        );
        assert_eq!(
            r.convert(CellKind::Number, "-100", false).unwrap(),
            CellValue::Int(-100)
        );
        assert_eq!(
            r.convert(CellKind::Number, "123.45", false).unwrap(),
            CellValue::Float(123.45)
        );
        assert_eq!(
            r.convert(CellKind::Number, "1E3", false).unwrap(),
            CellValue::Float(1000.0)
        );
        assert_eq!(
            r.convert(CellKind::Number, "", false).unwrap(),
            CellValue::Null
        );
        assert!(matches!(
            r.convert(CellKind::Number, "abc", false),
            Err(XlsxStreamError::Format(_))
        ));
    }

    #[test]
    fn test_convert_rejects_non_finite() {
        let r = resolver(false);
        for text in ["inf", "-inf", "NaN", "infinity", "1e999"] {
            assert!(
                matches!(
                    r.convert(CellKind::Number, text, false),
                    Err(XlsxStreamError::Format(_))
                ),
                "{} should be rejected",
                text
            );
        }
        assert!(matches!(
            r.convert(CellKind::Date, "NaN", false),
            Err(XlsxStreamError::Format(_))
        ));
    }

    #[test]
    fn test_convert_bool_override() {
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::Number, "1", true).unwrap(),
            CellValue::Bool(true)
        );
        assert_eq!(
            r.convert(CellKind::Number, "0", true).unwrap(),
            CellValue::Bool(false)
        );
        assert_eq!(
            r.convert(CellKind::Number, "7", true).unwrap(),
            CellValue::Bool(false)
        );
        // 整数の1だけが真
        assert_eq!(
            r.convert(CellKind::Number, "1.0", true).unwrap(),
            CellValue::Bool(false)
        );
        // 日付書式のセルでも上書きが優先される
        assert_eq!(
            r.convert(CellKind::Date, "1", true).unwrap(),
            CellValue::Bool(true)
        );
        assert_eq!(
            r.convert(CellKind::Date, "0", true).unwrap(),
            CellValue::Bool(false)
        );
        // 上書きは数値セルのみに作用する
        assert_eq!(
            r.convert(CellKind::InlineString, "1", true).unwrap(),
            CellValue::Text("1".to_string())
        );
    }

    #[test]
    fn test_convert_bool() {
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::Bool, "0", false).unwrap(),
            CellValue::Bool(false)
        );
        assert_eq!(
            r.convert(CellKind::Bool, "1", false).unwrap(),
            CellValue::Bool(true)
        );
        assert_eq!(
            r.convert(CellKind::Bool, "", false).unwrap(),
            CellValue::Bool(true)
        );
    }

    #[test]
    fn test_convert_text_kinds() {
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::InlineString, "", false).unwrap(),
            CellValue::Text(String::new())
        );
        assert_eq!(
            r.convert(CellKind::Unknown, "#DIV/0!", false).unwrap(),
            CellValue::Text("#DIV/0!".to_string())
        );
    }

    #[test]
    fn test_convert_dates() {
        let expected = NaiveDate::from_ymd_opt(2019, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let r = resolver(false);
        assert_eq!(
            r.convert(CellKind::Date, "43534", false).unwrap(),
            CellValue::DateTime(expected)
        );
        assert_eq!(r.convert(CellKind::Date, "", false).unwrap(), CellValue::Null);
        assert!(matches!(
            r.convert(CellKind::Date, "soon", false),
            Err(XlsxStreamError::Format(_))
        ));

        let r = resolver(true);
        assert!(r.is_1904());
        assert_eq!(
            r.convert(CellKind::Date, "42072", false).unwrap(),
            CellValue::DateTime(expected)
        );
    }
}
