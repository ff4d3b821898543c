//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// シート選択方式
///
/// 読み込み対象のワークシートを選択する方法を指定します。
/// インデックスは`xl/workbook.xml`の`<sheets>`に宣言された順序に従います。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(0)` は最初のシートを選択（デフォルト）
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first_sheet() {
        assert_eq!(SheetSelector::default(), SheetSelector::Index(0));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(SheetSelector::from(2usize), SheetSelector::Index(2));
        assert_eq!(
            SheetSelector::from("Data"),
            SheetSelector::Name("Data".to_string())
        );
    }
}
