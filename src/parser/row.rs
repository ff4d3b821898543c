//! Row Assembler Module
//!
//! ワークシートの構造イベント列（`<row>`/`<c>`/`<v>`/`<f>`/`<is>`）を消費し、
//! 欠落セルをNullで埋めた型付きの行を1行ずつ`RowSink`に渡す状態機械です。
//!
//! 状態（組み立て中の行、最後に見た列、テキストバッファ、真偽値上書きフラグ）は
//! `AssemblerState`に集約され、各イベント処理ステップに可変参照として渡されます。
//! ZIPやXMLパーサーに依存しないため、イベント列を直接与えてテストできます。

use std::collections::HashSet;
use std::ops::ControlFlow;

use super::events::{Attribute, EventConsumer, Flow};
use crate::cell_type::{CellKind, CellResolver};
use crate::error::XlsxStreamError;
use crate::reference::{column_of, MAX_COLUMN};
use crate::types::{CellValue, Row};

/// 組み立て済みの行の受け取り先
///
/// `ControlFlow::Break(())`を返すと、その行を最後に処理を停止します。
pub trait RowSink {
    fn push_row(&mut self, row: Row) -> ControlFlow<()>;
}

impl<F> RowSink for F
where
    F: FnMut(Row) -> ControlFlow<()>,
{
    fn push_row(&mut self, row: Row) -> ControlFlow<()> {
        self(row)
    }
}

/// 状態機械の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 行の外側（初期状態・終了状態）
    OutsideRow,
    /// `<row>`の内側
    InRow,
    /// `<c>`の内側
    InCell,
    /// `<v>`の内側
    InValue,
    /// `<f>`の内側
    InFormula,
    /// `<is>`の内側
    InInlineString,
    /// `<is>`内の`<t>`の内側
    InInlineText,
    /// `<is>`内の`<rPh>`（ふりがな）の内側
    InPhonetic,
}

/// 行組み立ての状態
#[derive(Debug)]
pub struct AssemblerState {
    phase: Phase,
    row: Row,
    last_column: u32,
    text: String,
    kind: CellKind,
    bool_override: bool,
}

impl Default for AssemblerState {
    fn default() -> Self {
        Self {
            phase: Phase::OutsideRow,
            row: Row::new(),
            last_column: 0,
            text: String::new(),
            kind: CellKind::Number,
            bool_override: false,
        }
    }
}

impl AssemblerState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn start_row(&mut self) {
        self.row = Row::new();
        self.last_column = 0;
        self.text.clear();
        self.bool_override = false;
        self.phase = Phase::InRow;
    }

    /// `<c>`開始: 列位置を求めて欠落分をNullで埋め、セルの種類を決定する
    ///
    /// 未知の型コードの場合は、その型コードを返す（警告用）。
    fn start_cell<'a>(
        &mut self,
        resolver: &CellResolver,
        attributes: &'a [Attribute<'a>],
    ) -> Result<Option<&'a str>, XlsxStreamError> {
        let mut reference = None;
        let mut type_code = None;
        let mut style_id = None;
        for attr in attributes {
            match attr.name {
                "r" => reference = Some(attr.value.as_str()),
                "t" => type_code = Some(attr.value.as_str()),
                "s" => style_id = Some(attr.value.as_str()),
                _ => {}
            }
        }

        let column = match reference {
            Some(r) => column_of(r)?,
            None => self.last_column + 1,
        };
        if column > MAX_COLUMN {
            return Err(XlsxStreamError::InvalidReference(
                reference.map_or_else(|| format!("column {}", column), str::to_string),
            ));
        }
        if column <= self.last_column {
            return Err(XlsxStreamError::MalformedDocument(format!(
                "Cell column {} is not to the right of the previous cell (column {})",
                reference.unwrap_or("?"),
                self.last_column
            )));
        }

        let gap = (column - self.last_column - 1) as usize;
        self.row.resize(self.row.len() + gap, CellValue::Null);
        self.last_column = column;

        self.kind = resolver.classify(type_code, style_id)?;
        self.text.clear();
        self.phase = Phase::InCell;

        Ok(match self.kind {
            CellKind::Unknown => type_code,
            _ => None,
        })
    }

    fn start_text(&mut self, phase: Phase) {
        self.text.clear();
        self.phase = phase;
    }

    /// `<f>`終了: 数式が`TRUE()`/`FALSE()`なら次の値を真偽値として扱う
    fn end_formula(&mut self) {
        if self.text == "TRUE()" || self.text == "FALSE()" {
            self.bool_override = true;
        }
        self.text.clear();
        self.phase = Phase::InCell;
    }

    /// `<c>`終了: バッファを値に変換して行に追加する
    fn end_cell(&mut self, resolver: &CellResolver) -> Result<(), XlsxStreamError> {
        let value = resolver.convert(self.kind, &self.text, self.bool_override)?;
        self.row.push(value);
        self.bool_override = false;
        self.text.clear();
        self.phase = Phase::InRow;
        Ok(())
    }

    /// `<row>`終了: 完成した行の所有権を取り出す
    fn end_row(&mut self) -> Row {
        self.phase = Phase::OutsideRow;
        self.last_column = 0;
        std::mem::take(&mut self.row)
    }
}

/// ワークシートの行組み立て器
pub struct RowAssembler<S: RowSink> {
    resolver: CellResolver,
    state: AssemblerState,
    sink: S,
    rows_emitted: usize,
    warned_types: HashSet<String>,
}

impl<S: RowSink> RowAssembler<S> {
    pub fn new(resolver: CellResolver, sink: S) -> Self {
        Self {
            resolver,
            state: AssemblerState::default(),
            sink,
            rows_emitted: 0,
            warned_types: HashSet::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// これまでに`RowSink`へ渡した行数
    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// 文書終端での検証（行の途中で終わっていないこと）
    pub fn finish(&self) -> Result<(), XlsxStreamError> {
        match self.state.phase {
            Phase::OutsideRow => Ok(()),
            phase => Err(XlsxStreamError::MalformedDocument(format!(
                "Worksheet ended inside a row ({:?})",
                phase
            ))),
        }
    }

    fn warn_unknown_type(&mut self, code: &str) {
        if self.warned_types.insert(code.to_string()) {
            log::warn!(
                "Unknown cell type '{}', using the raw text as the value",
                code
            );
        }
    }
}

impl<S: RowSink> EventConsumer for RowAssembler<S> {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        match (self.state.phase, name) {
            (_, "row") => self.state.start_row(),
            (Phase::InRow, "c") => {
                if let Some(code) = self.state.start_cell(&self.resolver, attributes)? {
                    self.warn_unknown_type(code);
                }
            }
            (Phase::InCell, "v") => self.state.start_text(Phase::InValue),
            (Phase::InCell, "f") => self.state.start_text(Phase::InFormula),
            (Phase::InCell, "is") => self.state.start_text(Phase::InInlineString),
            (Phase::InInlineString, "t") => self.state.phase = Phase::InInlineText,
            (Phase::InInlineString, "rPh") => self.state.phase = Phase::InPhonetic,
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn element_end(&mut self, name: &str) -> Result<Flow, XlsxStreamError> {
        match (self.state.phase, name) {
            (Phase::InFormula, "f") => self.state.end_formula(),
            (Phase::InValue, "v") => self.state.phase = Phase::InCell,
            (Phase::InInlineText, "t") => self.state.phase = Phase::InInlineString,
            (Phase::InPhonetic, "rPh") => self.state.phase = Phase::InInlineString,
            (Phase::InInlineString, "is") => self.state.phase = Phase::InCell,
            (Phase::InCell, "c") => self.state.end_cell(&self.resolver)?,
            (Phase::InRow, "row") => {
                let row = self.state.end_row();
                self.rows_emitted += 1;
                log::trace!("Row {} assembled ({} cells)", self.rows_emitted, row.len());
                return Ok(self.sink.push_row(row));
            }
            _ => {}
        }
        Ok(Flow::Continue(()))
    }

    fn text(&mut self, chunk: &str) -> Result<Flow, XlsxStreamError> {
        if matches!(
            self.state.phase,
            Phase::InValue | Phase::InFormula | Phase::InInlineText
        ) {
            self.state.text.push_str(chunk);
        }
        Ok(Flow::Continue(()))
    }
}

/// 1行だけを受け取って停止するシンク（`Rows`イテレータ用）
#[derive(Debug, Default)]
pub(crate) struct NextRow {
    slot: Option<Row>,
}

impl NextRow {
    pub fn take(&mut self) -> Option<Row> {
        self.slot.take()
    }
}

impl RowSink for NextRow {
    fn push_row(&mut self, row: Row) -> ControlFlow<()> {
        self.slot = Some(row);
        ControlFlow::Break(())
    }
}
