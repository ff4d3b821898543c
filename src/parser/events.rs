//! Structural Event Module
//!
//! XMLバイト列を「要素開始・要素終了・テキスト」のイベント列に変換し、
//! `EventConsumer`トレイトを実装した消費者に文書順で配送します。
//! quick-xmlのプルパーサーを内部で使用します。

use std::io::BufRead;
use std::ops::ControlFlow;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XlsxStreamError;

/// イベント処理後の継続/停止の指示
///
/// `ControlFlow::Break(())`を返すと、`EventSource::drive`はその時点で呼び出し元に戻ります。
pub type Flow = ControlFlow<()>;

/// 要素の属性（名前は接頭辞付きのまま、値はエスケープ解除済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: String,
}

/// 構造イベントの消費者
///
/// 要素名は名前空間接頭辞を除いたローカル名で渡されます（`x:row` -> `row`）。
/// すべてのメソッドは何もしない既定実装を持つため、
/// 実装側は関心のあるイベントだけを上書きします。
pub trait EventConsumer {
    fn element_start(
        &mut self,
        _name: &str,
        _attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        Ok(Flow::Continue(()))
    }

    fn element_end(&mut self, _name: &str) -> Result<Flow, XlsxStreamError> {
        Ok(Flow::Continue(()))
    }

    /// テキスト内容（1つのテキストノードが複数回に分かれて届くことがある）
    fn text(&mut self, _chunk: &str) -> Result<Flow, XlsxStreamError> {
        Ok(Flow::Continue(()))
    }
}

/// 2つの消費者に同じイベント列を配送する（1回の走査で複数の情報を抽出するため）
impl<A: EventConsumer, B: EventConsumer> EventConsumer for (A, B) {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<Flow, XlsxStreamError> {
        let first = self.0.element_start(name, attributes)?;
        let second = self.1.element_start(name, attributes)?;
        Ok(merge(first, second))
    }

    fn element_end(&mut self, name: &str) -> Result<Flow, XlsxStreamError> {
        let first = self.0.element_end(name)?;
        let second = self.1.element_end(name)?;
        Ok(merge(first, second))
    }

    fn text(&mut self, chunk: &str) -> Result<Flow, XlsxStreamError> {
        let first = self.0.text(chunk)?;
        let second = self.1.text(chunk)?;
        Ok(merge(first, second))
    }
}

fn merge(a: Flow, b: Flow) -> Flow {
    if a.is_break() || b.is_break() {
        Flow::Break(())
    } else {
        Flow::Continue(())
    }
}

/// `EventSource::drive`の終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 文書の終端に達した
    Finished,
    /// 消費者が停止を要求した（再度`drive`を呼ぶと続きから再開する）
    Stopped,
}

/// XMLイベントの供給元
///
/// 自己終了タグ（`<c r="A1"/>`）は開始・終了の2イベントに展開されます。
/// 空白のみのテキストもそのまま配送されます（`xml:space="preserve"`を尊重するため）。
pub struct EventSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> EventSource<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(false);
        reader.expand_empty_elements(true);
        reader.check_end_names(true);

        Self {
            reader,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// 文書終端まで、または消費者が停止を要求するまでイベントを配送する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Completion::Finished)` - 文書の終端に達した
    /// * `Ok(Completion::Stopped)` - 消費者が`Flow::Break`を返した
    /// * `Err(XlsxStreamError::MalformedDocument)` - XMLをトークン化できない場合
    pub fn drive<C: EventConsumer + ?Sized>(
        &mut self,
        consumer: &mut C,
    ) -> Result<Completion, XlsxStreamError> {
        if self.finished {
            return Ok(Completion::Finished);
        }

        loop {
            self.buf.clear();
            let flow = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = utf8(e.local_name().into_inner())?;
                    let attributes = collect_attributes(&e)?;
                    consumer.element_start(name, &attributes)?
                }
                Event::End(e) => {
                    let name = utf8(e.local_name().into_inner())?;
                    consumer.element_end(name)?
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    consumer.text(&text)?
                }
                Event::CData(e) => {
                    let bytes = e.into_inner();
                    consumer.text(utf8(&bytes)?)?
                }
                Event::Eof => {
                    self.finished = true;
                    return Ok(Completion::Finished);
                }
                _ => Flow::Continue(()),
            };

            if flow.is_break() {
                return Ok(Completion::Stopped);
            }
        }
    }

    /// 入力の現在位置（バイト）
    pub fn position(&self) -> usize {
        self.reader.buffer_position()
    }
}

/// バイト列全体を1つの消費者で解析する
pub fn parse_document<C: EventConsumer + ?Sized>(
    xml: &[u8],
    consumer: &mut C,
) -> Result<Completion, XlsxStreamError> {
    EventSource::new(xml).drive(consumer)
}

fn collect_attributes<'a>(e: &'a BytesStart<'_>) -> Result<Vec<Attribute<'a>>, XlsxStreamError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        attributes.push(Attribute {
            name: utf8(attr.key.into_inner())?,
            value: unescape(utf8(&attr.value)?)?.into_owned(),
        });
    }
    Ok(attributes)
}

/// UTF-8として解釈できないバイト列はトークン化の失敗として扱う
fn utf8(bytes: &[u8]) -> Result<&str, XlsxStreamError> {
    std::str::from_utf8(bytes).map_err(|e| {
        XlsxStreamError::MalformedDocument(format!("Invalid UTF-8 in XML: {}", e))
    })
}
