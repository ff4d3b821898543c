//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

/// セルの値を表す列挙型
///
/// シリアライズ時はタグなし表現になります（`null` / 文字列 / 数値 / 真偽値 /
/// ISO 8601形式の日時文字列）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// 空セル（疎な格納で省略された列、または値を持たない数値セル）
    Null,

    /// 文字列（共有文字列・インライン文字列・未知の型コード）
    Text(String),

    /// 整数（小数点や指数表記を含まない数値）
    Int(i64),

    /// 浮動小数点数
    Float(f64),

    /// 論理値
    Bool(bool),

    /// 日時（日付書式が適用された数値セル）
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// 文字列値を参照として取得
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 数値を`f64`として取得（整数も含む）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 日時値を取得
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

/// 1行分のセル値（インデックス0 = A列）
///
/// 長さは行内で観測された最大の列インデックスに等しく、
/// 最後のセルより右側の列は追加されません。
pub type Row = Vec<CellValue>;

/// ワークブックレベルのプロパティ（`<workbookPr>`の属性）
///
/// 属性名と生の文字列値の対応表です。ドキュメントごとに一度だけ構築され、
/// 以降は変更されません。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkbookProperties {
    entries: BTreeMap<String, String>,
}

impl WorkbookProperties {
    pub(crate) fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// 属性値を取得
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    /// 1904年エポックを使用するかどうか
    ///
    /// `date1904`属性が`true`または`1`の場合に`true`。
    /// 属性がない場合は1900年エポック（`false`）です。
    pub fn is_1904(&self) -> bool {
        matches!(self.get("date1904"), Some("true") | Some("1"))
    }

    /// すべての属性を名前順に列挙
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ワークシートの表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SheetVisibility {
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetVisibility {
    pub(crate) fn from_state(state: Option<&str>) -> Self {
        match state {
            Some("hidden") => SheetVisibility::Hidden,
            Some("veryHidden") => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }
}

/// パッケージ内のワークシート情報（宣言順）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    /// シート名
    pub name: String,
    /// ZIP内のパーツパス（例: `xl/worksheets/sheet1.xml`）
    pub path: String,
    /// 表示状態
    pub visibility: SheetVisibility,
}
