//! Workbook Parser Module
//!
//! `xl/workbook.xml`と`xl/_rels/workbook.xml.rels`から、
//! ワークブックプロパティ（1904年エポックなど）と宣言順のシート一覧を抽出します。

use std::collections::{BTreeMap, HashMap};

use super::events::{Attribute, EventConsumer, Flow};
use crate::error::XlsxStreamError;
use crate::types::{SheetVisibility, WorkbookProperties};

/// `<workbookPr>`の属性をそのまま収集する
#[derive(Debug, Default)]
pub struct WorkbookPropertiesExtractor {
    entries: BTreeMap<String, String>,
}

impl WorkbookPropertiesExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析完了後にプロパティを取り出す
    pub fn finish(self) -> WorkbookProperties {
        WorkbookProperties::from_entries(self.entries)
    }
}

impl EventConsumer for WorkbookPropertiesExtractor {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        if name == "workbookPr" {
            // <workbookPr date1904="1" defaultThemeVersion="124226"/>
            for attr in attributes {
                self.entries
                    .insert(attr.name.to_string(), attr.value.clone());
            }
        }
        Ok(Flow::Continue(()))
    }
}

/// `<sheets>`内で宣言されたシート
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclaredSheet {
    pub name: String,
    pub relationship_id: Option<String>,
    pub visibility: SheetVisibility,
}

/// `<sheet>`要素を宣言順に収集する
#[derive(Debug, Default)]
pub(crate) struct SheetListExtractor {
    in_sheets: bool,
    sheets: Vec<DeclaredSheet>,
}

impl SheetListExtractor {
    pub fn finish(self) -> Vec<DeclaredSheet> {
        self.sheets
    }
}

impl EventConsumer for SheetListExtractor {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        match name {
            "sheets" => self.in_sheets = true,
            "sheet" if self.in_sheets => {
                // <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
                let mut sheet_name = None;
                let mut relationship_id = None;
                let mut state = None;
                for attr in attributes {
                    match attr.name {
                        "name" => sheet_name = Some(attr.value.clone()),
                        "state" => state = Some(attr.value.as_str()),
                        // 接頭辞は文書により異なる（r:id, ns1:id など）
                        n if n.ends_with(":id") => relationship_id = Some(attr.value.clone()),
                        _ => {}
                    }
                }
                let name = sheet_name.ok_or_else(|| {
                    XlsxStreamError::MalformedDocument(
                        "<sheet> element without a name attribute".to_string(),
                    )
                })?;
                self.sheets.push(DeclaredSheet {
                    name,
                    relationship_id,
                    visibility: SheetVisibility::from_state(state),
                });
            }
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn element_end(&mut self, name: &str) -> Result<Flow, XlsxStreamError> {
        if name == "sheets" {
            self.in_sheets = false;
        }
        Ok(Flow::Continue(()))
    }
}

/// リレーションシップ（Id -> Target）を収集する
#[derive(Debug, Default)]
pub(crate) struct RelationshipsExtractor {
    targets: HashMap<String, String>,
}

impl RelationshipsExtractor {
    pub fn finish(self) -> HashMap<String, String> {
        self.targets
    }
}

impl EventConsumer for RelationshipsExtractor {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        if name == "Relationship" {
            let mut id = None;
            let mut target = None;
            for attr in attributes {
                match attr.name {
                    "Id" => id = Some(attr.value.clone()),
                    "Target" => target = Some(attr.value.clone()),
                    _ => {}
                }
            }
            // IdまたはTargetが欠落している場合はスキップ
            if let (Some(id), Some(target)) = (id, target) {
                self.targets.insert(id, target);
            }
        }
        Ok(Flow::Continue(()))
    }
}

/// リレーションシップのTargetをパッケージ内のパスに解決
///
/// 相対パスは`xl/`を基準に解決し、`/`で始まる場合はパッケージルートからのパスとします。
///
/// # 例
///
/// * `worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`
/// * `/xl/worksheets/sheet2.xml` -> `xl/worksheets/sheet2.xml`
/// * `../xl/worksheets/sheet3.xml` -> `xl/worksheets/sheet3.xml`
pub(crate) fn resolve_part_path(target: &str) -> String {
    let (base, relative) = match target.strip_prefix('/') {
        Some(absolute) => (Vec::new(), absolute),
        None => (vec!["xl"], target),
    };

    let mut parts = base;
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}
