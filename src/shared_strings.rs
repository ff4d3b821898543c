//! Shared Strings Module
//!
//! `xl/sharedStrings.xml`を解析し、インデックス -> 文字列のテーブルを提供します。
//! リッチテキストの書式情報は保持せず、各`<si>`内の`<t>`を連結したプレーンテキストのみを保持します。

use crate::error::XlsxStreamError;
use crate::parser::{parse_document, Attribute, EventConsumer, Flow};

/// 共有文字列テーブル
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    pub fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    /// `xl/sharedStrings.xml`の内容から共有文字列テーブルを構築
    ///
    /// ふりがな（`<rPh>`）のテキストは含めません。
    ///
    /// # 引数
    ///
    /// * `xml` - sharedStrings.xmlのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(SharedStrings)` - 解析に成功した場合
    /// * `Err(XlsxStreamError::MalformedDocument)` - XMLが不正な場合
    pub fn from_xml(xml: &[u8]) -> Result<Self, XlsxStreamError> {
        let mut collector = SharedStringsCollector::default();
        parse_document(xml, &mut collector)?;
        Ok(Self::new(collector.strings))
    }

    /// インデックスに対応する文字列を取得
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// uniqueCountを信用して確保する容量の上限
const MAX_PREALLOCATED: usize = 1 << 16;

#[derive(Default)]
struct SharedStringsCollector {
    strings: Vec<String>,
    current: Option<String>,
    in_text: bool,
    phonetic_depth: usize,
}

impl EventConsumer for SharedStringsCollector {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        match name {
            "sst" => {
                let unique = attributes
                    .iter()
                    .find(|a| a.name == "uniqueCount")
                    .and_then(|a| a.value.parse::<usize>().ok());
                if let Some(count) = unique {
                    self.strings.reserve(count.min(MAX_PREALLOCATED));
                }
            }
            "si" => self.current = Some(String::new()),
            "rPh" => self.phonetic_depth += 1,
            "t" if self.phonetic_depth == 0 => self.in_text = true,
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn element_end(&mut self, name: &str) -> Result<Flow, XlsxStreamError> {
        match name {
            "si" => {
                if let Some(text) = self.current.take() {
                    self.strings.push(text);
                }
            }
            "rPh" => self.phonetic_depth = self.phonetic_depth.saturating_sub(1),
            "t" => self.in_text = false,
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn text(&mut self, chunk: &str) -> Result<Flow, XlsxStreamError> {
        if self.in_text {
            if let Some(current) = self.current.as_mut() {
                current.push_str(chunk);
            }
        }
        Ok(Flow::Continue(()))
    }
}
