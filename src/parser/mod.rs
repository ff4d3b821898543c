//! Parser Module
//!
//! quick-xmlによる構造イベントの配送と、その上に構築された消費者群。
//! ワークシートは`RowAssembler`で1行ずつ組み立てられます。

mod events;
mod row;
mod workbook;

pub use events::{parse_document, Attribute, Completion, EventConsumer, EventSource, Flow};
pub use row::{Phase, RowAssembler, RowSink};
pub use workbook::WorkbookPropertiesExtractor;

pub(crate) use row::NextRow;
pub(crate) use workbook::{
    resolve_part_path, RelationshipsExtractor, SheetListExtractor,
};
