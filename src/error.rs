//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

use crate::security::PartSizeExceeded;

/// xlsxstreamクレート全体で使用するエラー型
///
/// ワークシートの読み込み中に発生するすべてのエラーを統一的に扱います。
/// どのエラーも現在のパスにとって回復不能であり、行の反復はその時点で停止します。
///
/// # エラーの種類
///
/// - `InvalidReference`: セル参照（列文字 + 行番号）の文法違反
/// - `Reference`: 共有文字列インデックスが解析不能、または範囲外
/// - `MalformedDocument`: XMLをトークン化できない、または構造が不正
/// - `SheetNotFound` / `SheetNameNotFound`: 指定されたワークシートが存在しない
/// - `Format`: 数値・日付セルの内容が数値として解釈できない
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::{read_rows, XlsxStreamError};
///
/// match read_rows("book.xlsx", 3) {
///     Err(XlsxStreamError::SheetNotFound { index, count }) => {
///         eprintln!("sheet {} requested, workbook has {}", index, count);
///     }
///     Err(e) => eprintln!("{}", e),
///     Ok(rows) => {
///         for row in rows {
///             println!("{:?}", row);
///         }
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxStreamError {
    /// セル参照が「英大文字 + 数字」の文法に一致しない
    #[error("Invalid cell reference: '{0}'")]
    InvalidReference(String),

    /// 共有文字列インデックスが整数でない、または共有文字列テーブルの範囲外
    #[error("Shared string reference '{index}' is invalid (table size: {len})")]
    Reference {
        /// セルに書かれていた生のインデックス文字列
        index: String,
        /// 共有文字列テーブルの要素数
        len: usize,
    },

    /// XMLのトークン化に失敗した、またはワークシートの構造が不正
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// ワークシートのインデックスが範囲外
    #[error("Sheet index {index} is out of range (total: {count})")]
    SheetNotFound {
        /// 要求されたインデックス（0始まり）
        index: usize,
        /// パッケージ内のワークシート数
        count: usize,
    },

    /// 指定された名前のワークシートが存在しない
    #[error("Sheet '{0}' not found")]
    SheetNameNotFound(String),

    /// 数値・日付セルの内容が整数としても浮動小数点数としても解釈できない
    #[error("Format error: {0}")]
    Format(String),

    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ReaderBuilder::build()`時に設定を検証し、無効な設定が検出された場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、サイズ制限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl From<std::io::Error> for XlsxStreamError {
    fn from(e: std::io::Error) -> Self {
        match size_violation(&e) {
            Some(violation) => violation,
            None => XlsxStreamError::Io(e),
        }
    }
}

impl From<quick_xml::Error> for XlsxStreamError {
    fn from(e: quick_xml::Error) -> Self {
        if let quick_xml::Error::Io(ref io) = e {
            if let Some(violation) = size_violation(io) {
                return violation;
            }
        }
        XlsxStreamError::MalformedDocument(e.to_string())
    }
}

/// 展開サイズ上限の超過を`SecurityViolation`として取り出す
fn size_violation(e: &std::io::Error) -> Option<XlsxStreamError> {
    e.get_ref()
        .and_then(|inner| inner.downcast_ref::<PartSizeExceeded>())
        .map(|exceeded| XlsxStreamError::SecurityViolation(exceeded.to_string()))
}

impl From<quick_xml::escape::EscapeError> for XlsxStreamError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        XlsxStreamError::MalformedDocument(format!("XML escape error: {}", e))
    }
}

impl From<quick_xml::events::attributes::AttrError> for XlsxStreamError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        XlsxStreamError::MalformedDocument(format!("XML attribute error: {}", e))
    }
}

impl From<zip::result::ZipError> for XlsxStreamError {
    fn from(e: zip::result::ZipError) -> Self {
        XlsxStreamError::Zip(e.to_string())
    }
}
