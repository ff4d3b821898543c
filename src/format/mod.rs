//! Format Module
//!
//! Excel Number Format Stringの構文解析を提供します。
//! 書式の適用は行わず、数値セルが日付として表示されるかどうかの判定にのみ使用します。

mod parser;
mod sections;
mod tokens;

pub(crate) use parser::{builtin_format, is_builtin_date_format, is_date_format};
