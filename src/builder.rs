//! Builder Module
//!
//! Fluent Builder APIを提供し、`SheetReader`インスタンスを段階的に構築する。
//! あわせて、ワークブックハンドル`Workbook`と行イテレータ`Rows`を定義します。

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;

use crate::api::SheetSelector;
use crate::cell_type::CellResolver;
use crate::error::XlsxStreamError;
use crate::package::Package;
use crate::parser::{Completion, EventSource, NextRow, RowAssembler, RowSink};
use crate::security::SecurityConfig;
use crate::shared_strings::SharedStrings;
use crate::styles::StyleTable;
use crate::types::{Row, SheetInfo, WorkbookProperties};

/// 読み込み処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ReaderConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 日付書式の数値を日時として返すか
    pub detect_dates: bool,

    /// セキュリティ制限
    pub security: SecurityConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::default(),
            detect_dates: true,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::{ReaderBuilder, SheetSelector};
///
/// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
/// let reader = ReaderBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("Data".to_string()))
///     .detect_dates(false)
///     .build()?;
///
/// for row in reader.open("book.xlsx")? {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    /// 内部設定（構築中）
    config: ReaderConfig,
}

impl ReaderBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: 最初のシート（`SheetSelector::Index(0)`）
    /// - 日付判定: 有効
    /// - セキュリティ制限: `SecurityConfig::default()`
    pub fn new() -> Self {
        Self::default()
    }

    /// 読み込み対象のシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 日付書式が適用された数値セルを`CellValue::DateTime`として返すかを指定する
    ///
    /// `false`の場合、日付セルはシリアル値（数値）のまま返されます。
    pub fn detect_dates(mut self, detect: bool) -> Self {
        self.config.detect_dates = detect;
        self
    }

    /// セキュリティ制限を指定する
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定を検証し、`SheetReader`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetReader)`: 設定が有効な場合
    /// * `Err(XlsxStreamError::Config)`: シート名が空、またはセキュリティ制限が0の場合
    pub fn build(self) -> Result<SheetReader, XlsxStreamError> {
        if let SheetSelector::Name(ref name) = self.config.sheet_selector {
            if name.is_empty() {
                return Err(XlsxStreamError::Config(
                    "Sheet name must not be empty".to_string(),
                ));
            }
        }
        self.config.security.validate()?;

        Ok(SheetReader {
            config: self.config,
        })
    }
}

/// 設定済みのワークシートリーダー
///
/// 呼び出しごとにパッケージを開き直すため、同じ`SheetReader`で何度でも読み込めます。
#[derive(Debug, Clone)]
pub struct SheetReader {
    config: ReaderConfig,
}

impl SheetReader {
    /// ファイルを開き、選択されたワークシートの行イテレータを返す
    ///
    /// イテレータはファイルを所有し、ワークシートのエントリを展開しながら読み進めます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Rows)` - 行イテレータ
    /// * `Err(XlsxStreamError::SheetNotFound)` - インデックスが範囲外の場合
    /// * `Err(XlsxStreamError::SheetNameNotFound)` - 名前が見つからない場合
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Rows<'static>, XlsxStreamError> {
        Workbook::open_with_config(path, &self.config)?
            .into_rows(self.config.sheet_selector.clone())
    }

    /// 任意のリーダーからワークシートの行イテレータを返す
    pub fn open_reader<'a, R: Read + Seek + 'a>(
        &self,
        reader: R,
    ) -> Result<Rows<'a>, XlsxStreamError> {
        Workbook::from_reader_with_config(reader, &self.config)?
            .into_rows(self.config.sheet_selector.clone())
    }

    /// ワークシート全体を`RowSink`に流し込む（プッシュ型）
    ///
    /// シンクが`ControlFlow::Break`を返した時点で処理を終了し、シンクを返します。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::ops::ControlFlow;
    /// use xlsxstream::ReaderBuilder;
    ///
    /// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
    /// let reader = ReaderBuilder::new().build()?;
    /// let mut count = 0;
    /// reader.for_each_row("book.xlsx", |_row| {
    ///     count += 1;
    ///     if count == 100 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn for_each_row<P, S>(&self, path: P, sink: S) -> Result<S, XlsxStreamError>
    where
        P: AsRef<Path>,
        S: RowSink,
    {
        let mut workbook = Workbook::open_with_config(path, &self.config)?;
        workbook.for_each_row(self.config.sheet_selector.clone(), sink)
    }

    /// `for_each_row`の任意リーダー版
    pub fn for_each_row_from_reader<R, S>(&self, reader: R, sink: S) -> Result<S, XlsxStreamError>
    where
        R: Read + Seek,
        S: RowSink,
    {
        let mut workbook = Workbook::from_reader_with_config(reader, &self.config)?;
        workbook.for_each_row(self.config.sheet_selector.clone(), sink)
    }
}

/// 開かれたワークブック
///
/// ワークブックプロパティ、シート一覧、共有文字列テーブル、スタイルテーブルを一度だけ読み込み、
/// 複数のワークシートを順に処理できます。テーブルは`Arc`で各パスに共有されます。
pub struct Workbook<R: Read + Seek> {
    package: Package<R>,
    properties: WorkbookProperties,
    sheets: Vec<SheetInfo>,
    shared_strings: Arc<SharedStrings>,
    styles: Arc<StyleTable>,
    detect_dates: bool,
}

impl Workbook<BufReader<File>> {
    /// デフォルト設定でファイルを開く
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, XlsxStreamError> {
        Self::open_with_config(path, &ReaderConfig::default())
    }

    pub(crate) fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: &ReaderConfig,
    ) -> Result<Self, XlsxStreamError> {
        let file = File::open(path.as_ref())?;
        log::debug!("Opening workbook '{}'", path.as_ref().display());
        Self::from_reader_with_config(BufReader::new(file), config)
    }
}

impl<R: Read + Seek> Workbook<R> {
    /// デフォルト設定で任意のリーダーから開く
    pub fn from_reader(reader: R) -> Result<Self, XlsxStreamError> {
        Self::from_reader_with_config(reader, &ReaderConfig::default())
    }

    pub(crate) fn from_reader_with_config(
        reader: R,
        config: &ReaderConfig,
    ) -> Result<Self, XlsxStreamError> {
        let mut package = Package::open(reader, config.security.clone())?;

        // 1. ワークブックプロパティ（エポック）とシート一覧
        let (properties, sheets) = package.workbook()?;

        // 2. 共有文字列テーブル
        let shared_strings = Arc::new(package.shared_strings()?);

        // 3. スタイルテーブル
        let styles = Arc::new(package.styles()?);

        Ok(Self {
            package,
            properties,
            sheets,
            shared_strings,
            styles,
            detect_dates: config.detect_dates,
        })
    }

    pub fn properties(&self) -> &WorkbookProperties {
        &self.properties
    }

    /// 宣言順のワークシート一覧
    pub fn sheets(&self) -> &[SheetInfo] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// シート選択をインデックスに解決する
    pub fn sheet_index(&self, selector: &SheetSelector) -> Result<usize, XlsxStreamError> {
        match selector {
            SheetSelector::Index(index) if *index < self.sheets.len() => Ok(*index),
            SheetSelector::Index(index) => Err(XlsxStreamError::SheetNotFound {
                index: *index,
                count: self.sheets.len(),
            }),
            SheetSelector::Name(name) => self
                .sheets
                .iter()
                .position(|s| &s.name == name)
                .ok_or_else(|| XlsxStreamError::SheetNameNotFound(name.clone())),
        }
    }

    /// ワークシートの行イテレータを返す
    ///
    /// イテレータはワークブックを借用し、終了後は別のシートを読めます。
    ///
    /// # 引数
    ///
    /// * `selector` - `0usize`、`"Sheet1"`、または`SheetSelector`
    pub fn rows<S: Into<SheetSelector>>(
        &mut self,
        selector: S,
    ) -> Result<Rows<'_>, XlsxStreamError> {
        let index = self.select(&selector.into())?;
        let resolver = self.resolver();
        let sheet = &self.sheets[index];
        let reader = self.package.worksheet_reader(sheet)?;
        Ok(Rows::new(Box::new(reader), resolver, sheet.name.clone()))
    }

    /// ワークブックを消費し、ワークシートの行イテレータを返す
    pub fn into_rows<'a, S: Into<SheetSelector>>(
        self,
        selector: S,
    ) -> Result<Rows<'a>, XlsxStreamError>
    where
        R: 'a,
    {
        let index = self.select(&selector.into())?;
        let resolver = self.resolver();
        let sheet = &self.sheets[index];
        let reader = self.package.into_worksheet_reader(sheet)?;
        Ok(Rows::new(reader, resolver, sheet.name.clone()))
    }

    /// ワークシート全体を`RowSink`に流し込む（プッシュ型）
    pub fn for_each_row<T, S>(&mut self, selector: T, sink: S) -> Result<S, XlsxStreamError>
    where
        T: Into<SheetSelector>,
        S: RowSink,
    {
        let index = self.select(&selector.into())?;
        let mut assembler = RowAssembler::new(self.resolver(), sink);
        let sheet = &self.sheets[index];
        let name = &sheet.name;
        let reader = self.package.worksheet_reader(sheet)?;

        match EventSource::new(BufReader::new(reader)).drive(&mut assembler)? {
            Completion::Finished => {
                assembler.finish()?;
                log::debug!(
                    "Finished sheet '{}' ({} rows)",
                    name,
                    assembler.rows_emitted()
                );
            }
            Completion::Stopped => {
                log::debug!(
                    "Stopped sheet '{}' after {} rows",
                    name,
                    assembler.rows_emitted()
                );
            }
        }

        Ok(assembler.into_sink())
    }

    fn select(&self, selector: &SheetSelector) -> Result<usize, XlsxStreamError> {
        let index = self.sheet_index(selector)?;
        let sheet = &self.sheets[index];
        log::debug!("Selected sheet {} '{}' ({})", index, sheet.name, sheet.path);
        Ok(index)
    }

    fn resolver(&self) -> CellResolver {
        CellResolver::new(
            Arc::clone(&self.shared_strings),
            Arc::clone(&self.styles),
            &self.properties,
        )
        .with_date_detection(self.detect_dates)
    }
}

/// ワークシートの行イテレータ
///
/// `next()`のたびに、1行が完成するまでだけエントリを展開してXMLイベントを読み進めます。
/// エラーが発生した場合はそのエラーを1度だけ返し、以降は`None`を返します。
pub struct Rows<'a> {
    source: EventSource<BufReader<Box<dyn Read + 'a>>>,
    assembler: RowAssembler<NextRow>,
    sheet_name: String,
    done: bool,
}

impl<'a> Rows<'a> {
    fn new(reader: Box<dyn Read + 'a>, resolver: CellResolver, sheet_name: String) -> Self {
        Self {
            source: EventSource::new(BufReader::new(reader)),
            assembler: RowAssembler::new(resolver, NextRow::default()),
            sheet_name,
            done: false,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// これまでに返した行数
    pub fn rows_read(&self) -> usize {
        self.assembler.rows_emitted()
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row, XlsxStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.source.drive(&mut self.assembler) {
            Ok(Completion::Stopped) => match self.assembler.sink_mut().take() {
                Some(row) => Some(Ok(row)),
                None => {
                    self.done = true;
                    None
                }
            },
            Ok(Completion::Finished) => {
                self.done = true;
                match self.assembler.finish() {
                    Ok(()) => {
                        log::debug!(
                            "Finished sheet '{}' ({} rows)",
                            self.sheet_name,
                            self.assembler.rows_emitted()
                        );
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Rows<'_> {}

/// ワークシートを開き、行の遅延シーケンスを返す
///
/// # 引数
///
/// * `path` - XLSXファイルのパス
/// * `worksheet_index` - 宣言順でのワークシート位置（0始まり）
///
/// # 戻り値
///
/// * `Ok(Rows)` - 行イテレータ（各要素は`Result<Row, XlsxStreamError>`）
/// * `Err(XlsxStreamError::SheetNotFound)` - インデックスがワークシート数以上の場合
///
/// # 使用例
///
/// ```rust,no_run
/// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
/// for row in xlsxstream::read_rows("book.xlsx", 0)? {
///     let row = row?;
///     println!("{} cells", row.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn read_rows<P: AsRef<Path>>(
    path: P,
    worksheet_index: usize,
) -> Result<Rows<'static>, XlsxStreamError> {
    ReaderBuilder::new()
        .with_sheet_selector(SheetSelector::Index(worksheet_index))
        .build()?
        .open(path)
}
