//! Style Table Module
//!
//! `xl/styles.xml`の`<numFmts>`と`<cellXfs>`を解析し、
//! セルのスタイルIDからNumber Format Stringを引けるようにします。
//! 用途は「数値セルが日付書式かどうか」の判定のみです。

use std::collections::HashMap;

use crate::error::XlsxStreamError;
use crate::format::{builtin_format, is_builtin_date_format, is_date_format};
use crate::parser::{parse_document, Attribute, EventConsumer, Flow};

/// スタイルに割り当てられたNumber Format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    /// numFmtId
    pub id: u32,
    /// フォーマット文字列（カスタム書式、またはビルトイン書式の既定文字列）
    pub code: Option<String>,
    is_date: bool,
}

impl NumberFormat {
    fn resolve(id: u32, custom: Option<&String>) -> Self {
        match custom {
            Some(code) => Self {
                id,
                is_date: is_date_format(code),
                code: Some(code.clone()),
            },
            None => Self {
                id,
                is_date: is_builtin_date_format(id),
                code: builtin_format(id).map(str::to_string),
            },
        }
    }

    /// 日付・時刻書式かどうか
    pub fn is_date(&self) -> bool {
        self.is_date
    }
}

/// スタイルテーブル（cellXfsのインデックス -> Number Format）
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    formats: Vec<NumberFormat>,
}

impl StyleTable {
    /// `xl/styles.xml`の内容からスタイルテーブルを構築
    ///
    /// # 引数
    ///
    /// * `xml` - styles.xmlのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(StyleTable)` - 解析に成功した場合
    /// * `Err(XlsxStreamError::MalformedDocument)` - XMLまたは数値属性が不正な場合
    pub fn from_xml(xml: &[u8]) -> Result<Self, XlsxStreamError> {
        let mut collector = StylesCollector::default();
        parse_document(xml, &mut collector)?;
        Ok(collector.finish())
    }

    /// numFmtIdの列から直接構築する（カスタム書式は`custom`で与える）
    pub fn from_format_ids(
        num_fmt_ids: &[u32],
        custom: &HashMap<u32, String>,
    ) -> Self {
        let formats = num_fmt_ids
            .iter()
            .map(|&id| NumberFormat::resolve(id, custom.get(&id)))
            .collect();
        Self { formats }
    }

    /// スタイルIDに対応するNumber Formatを取得
    pub fn number_format(&self, style_id: usize) -> Option<&NumberFormat> {
        self.formats.get(style_id)
    }

    /// スタイルIDが日付書式を指しているかどうか
    ///
    /// テーブル範囲外のスタイルIDは日付ではないものとして扱います。
    pub fn is_date(&self, style_id: usize) -> bool {
        match self.formats.get(style_id) {
            Some(format) => format.is_date(),
            None => {
                log::warn!(
                    "Style id {} is outside the style table ({} entries)",
                    style_id,
                    self.formats.len()
                );
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

#[derive(Default)]
struct StylesCollector {
    in_num_fmts: bool,
    in_cell_xfs: bool,
    custom: HashMap<u32, String>,
    xf_format_ids: Vec<u32>,
}

impl StylesCollector {
    fn finish(self) -> StyleTable {
        StyleTable::from_format_ids(&self.xf_format_ids, &self.custom)
    }
}

impl EventConsumer for StylesCollector {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        match name {
            "numFmts" => self.in_num_fmts = true,
            "cellXfs" => self.in_cell_xfs = true,
            "numFmt" if self.in_num_fmts => {
                // <numFmt numFmtId="165" formatCode="0.000"/>
                let mut id = None;
                let mut code = None;
                for attr in attributes {
                    match attr.name {
                        "numFmtId" => id = Some(parse_id(&attr.value)?),
                        "formatCode" => code = Some(attr.value.clone()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    self.custom.insert(id, code);
                }
            }
            "xf" if self.in_cell_xfs => {
                // <xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
                let mut num_fmt_id = 0;
                for attr in attributes {
                    if attr.name == "numFmtId" {
                        num_fmt_id = parse_id(&attr.value)?;
                    }
                }
                self.xf_format_ids.push(num_fmt_id);
            }
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn element_end(&mut self, name: &str) -> Result<Flow, XlsxStreamError> {
        match name {
            "numFmts" => self.in_num_fmts = false,
            "cellXfs" => self.in_cell_xfs = false,
            _ => {}
        }
        Ok(Flow::Continue(()))
    }
}

fn parse_id(value: &str) -> Result<u32, XlsxStreamError> {
    value.trim().parse().map_err(|_| {
        XlsxStreamError::MalformedDocument(format!("Invalid numFmtId in styles: '{}'", value))
    })
}
