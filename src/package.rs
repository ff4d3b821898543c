//! Package Module
//!
//! XLSXパッケージ（ZIPアーカイブ）へのアクセスを提供します。
//! 開く時点で全エントリのパスとサイズを検証します。
//! 参照テーブルはメモリに読み込み、ワークシートは展開しながらストリームとして読みます。

use std::io::{Read, Seek, SeekFrom};

use flate2::read::DeflateDecoder;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

use crate::error::XlsxStreamError;
use crate::parser::{
    parse_document, resolve_part_path, RelationshipsExtractor, SheetListExtractor,
    WorkbookPropertiesExtractor,
};
use crate::security::{validate_zip_path, SecurityConfig, SizeLimited};
use crate::shared_strings::SharedStrings;
use crate::styles::StyleTable;
use crate::types::{SheetInfo, WorkbookProperties};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// 開かれたXLSXパッケージ
pub(crate) struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
    security: SecurityConfig,
}

impl<R: Read + Seek> Package<R> {
    /// ZIPアーカイブを開き、全エントリを検証する
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    /// * `security` - 適用するセキュリティ制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(Package)` - 検証に成功した場合
    /// * `Err(XlsxStreamError::Zip)` - ZIPとして読めない場合
    /// * `Err(XlsxStreamError::SecurityViolation)` - 制限に違反した場合
    pub fn open(reader: R, security: SecurityConfig) -> Result<Self, XlsxStreamError> {
        let mut archive = ZipArchive::new(reader)?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security.max_file_count {
            return Err(XlsxStreamError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security.max_file_count
            )));
        }

        // セキュリティチェック: 各ファイルのパス検証とサイズチェック
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let file_name = file.name();
            validate_zip_path(file_name)?;
            security.check_part_size(file_name, file.size())?;

            total_decompressed_size = total_decompressed_size
                .checked_add(file.size())
                .ok_or_else(|| {
                    XlsxStreamError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;
            if total_decompressed_size > security.max_decompressed_size {
                return Err(XlsxStreamError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, security.max_decompressed_size
                )));
            }
        }

        log::debug!(
            "Opened package: {} entries, {} bytes uncompressed",
            archive.len(),
            total_decompressed_size
        );

        Ok(Self { archive, security })
    }

    /// パーツの内容を読み込む（存在しない場合は`None`）
    ///
    /// ワークブック・共有文字列・スタイルのような参照テーブル用です。
    /// ワークシートは`part_reader`でストリームとして読みます。
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, XlsxStreamError> {
        let Some(mut reader) = self.part_reader(name)? else {
            return Ok(None);
        };
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(Some(content))
    }

    /// パーツを展開しながら読むリーダーを返す（存在しない場合は`None`）
    ///
    /// パーツ名は大文字・小文字を区別せずに照合します。
    /// 中央ディレクトリのサイズ表記を信用せず、展開量そのものにも上限を適用します。
    pub fn part_reader(
        &mut self,
        name: &str,
    ) -> Result<Option<SizeLimited<ZipFile<'_>>>, XlsxStreamError> {
        let Some(actual_name) = self.find_part(name) else {
            return Ok(None);
        };

        let file = match self.archive.by_name(&actual_name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.security.check_part_size(&actual_name, file.size())?;

        Ok(Some(SizeLimited::new(
            file,
            &actual_name,
            self.security.max_file_size,
        )))
    }

    /// アーカイブを消費し、パーツを展開しながら読む所有権付きのリーダーを返す
    ///
    /// エントリのデータ開始位置へ元のリーダーをシークし、
    /// 格納（Stored）またはDeflateのデータをその場で展開します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(reader))` - パーツのリーダー
    /// * `Ok(None)` - パーツが存在しない場合
    /// * `Err(XlsxStreamError::Zip)` - 未対応の圧縮方式の場合
    pub fn into_part_reader<'a>(
        mut self,
        name: &str,
    ) -> Result<Option<Box<dyn Read + 'a>>, XlsxStreamError>
    where
        R: 'a,
    {
        let Some(actual_name) = self.find_part(name) else {
            return Ok(None);
        };

        let (data_start, compressed_size, method) = match self.archive.by_name(&actual_name) {
            Ok(file) => {
                self.security.check_part_size(&actual_name, file.size())?;
                (file.data_start(), file.compressed_size(), file.compression())
            }
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut reader = self.archive.into_inner();
        reader.seek(SeekFrom::Start(data_start))?;
        let raw = reader.take(compressed_size);

        let decoded: Box<dyn Read + 'a> = match method {
            CompressionMethod::Stored => Box::new(raw),
            CompressionMethod::Deflated => Box::new(DeflateDecoder::new(raw)),
            other => {
                return Err(XlsxStreamError::Zip(format!(
                    "Unsupported compression method {:?} for '{}'",
                    other, actual_name
                )))
            }
        };

        Ok(Some(Box::new(SizeLimited::new(
            decoded,
            &actual_name,
            self.security.max_file_size,
        ))))
    }

    fn find_part(&self, name: &str) -> Option<String> {
        let mut case_insensitive = None;
        for candidate in self.archive.file_names() {
            if candidate == name {
                return Some(candidate.to_string());
            }
            if case_insensitive.is_none() && candidate.eq_ignore_ascii_case(name) {
                case_insensitive = Some(candidate.to_string());
            }
        }
        case_insensitive
    }

    /// ワークブックプロパティと宣言順のワークシート一覧を読み込む
    ///
    /// 各シートのパーツパスは`xl/_rels/workbook.xml.rels`で解決し、
    /// 解決できない場合は`xl/worksheets/sheet{n}.xml`とみなします。
    pub fn workbook(&mut self) -> Result<(WorkbookProperties, Vec<SheetInfo>), XlsxStreamError> {
        let workbook_xml = self.read_part(WORKBOOK_PART)?.ok_or_else(|| {
            XlsxStreamError::MalformedDocument(format!("Package has no '{}'", WORKBOOK_PART))
        })?;

        let mut extractors = (
            WorkbookPropertiesExtractor::new(),
            SheetListExtractor::default(),
        );
        parse_document(&workbook_xml, &mut extractors)?;
        let (properties, sheet_list) = extractors;
        let properties = properties.finish();

        let mut relationships = RelationshipsExtractor::default();
        if let Some(rels_xml) = self.read_part(WORKBOOK_RELS_PART)? {
            parse_document(&rels_xml, &mut relationships)?;
        }
        let relationships = relationships.finish();

        let sheets = sheet_list
            .finish()
            .into_iter()
            .enumerate()
            .map(|(position, declared)| {
                let target = declared
                    .relationship_id
                    .as_ref()
                    .and_then(|id| relationships.get(id));
                let path = match target {
                    Some(target) => resolve_part_path(target),
                    None => {
                        let fallback = format!("xl/worksheets/sheet{}.xml", position + 1);
                        log::warn!(
                            "No relationship for sheet '{}', assuming '{}'",
                            declared.name,
                            fallback
                        );
                        fallback
                    }
                };
                SheetInfo {
                    name: declared.name,
                    path,
                    visibility: declared.visibility,
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Workbook declares {} sheets (1904 epoch: {})",
            sheets.len(),
            properties.is_1904()
        );

        Ok((properties, sheets))
    }

    /// 共有文字列テーブルを読み込む（パーツがない場合は空）
    pub fn shared_strings(&mut self) -> Result<SharedStrings, XlsxStreamError> {
        let table = match self.read_part(SHARED_STRINGS_PART)? {
            Some(xml) => SharedStrings::from_xml(&xml)?,
            None => SharedStrings::default(),
        };
        log::debug!("Loaded {} shared strings", table.len());
        Ok(table)
    }

    /// スタイルテーブルを読み込む（パーツがない場合は空）
    pub fn styles(&mut self) -> Result<StyleTable, XlsxStreamError> {
        let table = match self.read_part(STYLES_PART)? {
            Some(xml) => StyleTable::from_xml(&xml)?,
            None => StyleTable::default(),
        };
        log::debug!("Loaded {} cell styles", table.len());
        Ok(table)
    }

    /// ワークシートパーツをストリームとして開く
    pub fn worksheet_reader(
        &mut self,
        sheet: &SheetInfo,
    ) -> Result<SizeLimited<ZipFile<'_>>, XlsxStreamError> {
        self.part_reader(&sheet.path)?
            .ok_or_else(|| missing_worksheet(sheet))
    }

    /// アーカイブを消費し、ワークシートパーツを所有権付きのストリームとして開く
    pub fn into_worksheet_reader<'a>(
        self,
        sheet: &SheetInfo,
    ) -> Result<Box<dyn Read + 'a>, XlsxStreamError>
    where
        R: 'a,
    {
        self.into_part_reader(&sheet.path)?
            .ok_or_else(|| missing_worksheet(sheet))
    }
}

fn missing_worksheet(sheet: &SheetInfo) -> XlsxStreamError {
    XlsxStreamError::MalformedDocument(format!(
        "Worksheet part '{}' for sheet '{}' is missing",
        sheet.path, sheet.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn package(parts: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    const WORKBOOK: &str = r#"<workbook xmlns:r="urn:r"><workbookPr date1904="1"/><sheets>
        <sheet name="First" sheetId="1" r:id="rId7"/>
        <sheet name="Second" sheetId="2" r:id="rId9"/>
    </sheets></workbook>"#;

    const RELS: &str = r#"<Relationships>
        <Relationship Id="rId7" Target="worksheets/sheet2.xml"/>
        <Relationship Id="rId8" Target="styles.xml"/>
    </Relationships>"#;

    #[test]
    fn test_workbook_sheets_resolved_through_relationships() {
        let mut package = Package::open(
            package(&[
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", RELS),
            ]),
            SecurityConfig::default(),
        )
        .unwrap();

        let (properties, sheets) = package.workbook().unwrap();
        assert!(properties.is_1904());
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "First");
        assert_eq!(sheets[0].path, "xl/worksheets/sheet2.xml");
        // rId9は存在しないため規約上のパスにフォールバック
        assert_eq!(sheets[1].path, "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_missing_workbook_is_malformed() {
        let mut package =
            Package::open(package(&[("xl/styles.xml", "<styleSheet/>")]), SecurityConfig::default())
                .unwrap();
        assert!(matches!(
            package.workbook(),
            Err(XlsxStreamError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_optional_tables_default_to_empty() {
        let mut package =
            Package::open(package(&[("xl/workbook.xml", WORKBOOK)]), SecurityConfig::default())
                .unwrap();
        assert!(package.shared_strings().unwrap().is_empty());
        assert!(package.styles().unwrap().is_empty());
    }

    #[test]
    fn test_part_lookup_ignores_case() {
        let mut package = Package::open(
            package(&[("xl/SharedStrings.xml", "<sst><si><t>x</t></si></sst>")]),
            SecurityConfig::default(),
        )
        .unwrap();
        assert_eq!(package.shared_strings().unwrap().get(0), Some("x"));
    }

    #[test]
    fn test_too_many_files() {
        let result = Package::open(
            package(&[("a.xml", "<a/>"), ("b.xml", "<b/>")]),
            SecurityConfig::new().with_max_file_count(1),
        );
        assert!(matches!(result, Err(XlsxStreamError::SecurityViolation(_))));
    }

    #[test]
    fn test_oversized_part() {
        let big = "x".repeat(64);
        let result = Package::open(
            package(&[("xl/workbook.xml", big.as_str())]),
            SecurityConfig::new().with_max_file_size(32),
        );
        assert!(matches!(result, Err(XlsxStreamError::SecurityViolation(_))));
    }

    #[test]
    fn test_path_traversal_entry() {
        let result = Package::open(
            package(&[("../evil.xml", "<a/>")]),
            SecurityConfig::default(),
        );
        assert!(matches!(result, Err(XlsxStreamError::SecurityViolation(_))));
    }

    #[test]
    fn test_owned_reader_streams_deflated_and_stored_parts() {
        let sheet = r#"<worksheet><sheetData><row r="1"/></sheetData></worksheet>"#;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("xl/deflated.xml", FileOptions::default())
            .unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
        zip.start_file(
            "xl/stored.xml",
            FileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
        let data = zip.finish().unwrap().into_inner();

        for name in ["xl/deflated.xml", "xl/stored.xml"] {
            let package = Package::open(Cursor::new(data.clone()), SecurityConfig::default())
                .unwrap();
            let mut reader = package.into_part_reader(name).unwrap().unwrap();
            let mut content = String::new();
            reader.read_to_string(&mut content).unwrap();
            assert_eq!(content, sheet);
        }

        let package = Package::open(Cursor::new(data), SecurityConfig::default()).unwrap();
        assert!(package.into_part_reader("xl/missing.xml").unwrap().is_none());
    }

    #[test]
    fn test_borrowed_reader_streams_part() {
        let mut package = Package::open(
            package(&[("xl/worksheets/sheet1.xml", "<worksheet/>")]),
            SecurityConfig::default(),
        )
        .unwrap();
        let sheet = SheetInfo {
            name: "S".to_string(),
            path: "xl/worksheets/sheet1.xml".to_string(),
            visibility: crate::types::SheetVisibility::Visible,
        };
        let mut content = String::new();
        package
            .worksheet_reader(&sheet)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<worksheet/>");
    }

    #[test]
    fn test_not_a_zip() {
        let result = Package::open(Cursor::new(b"not a zip".to_vec()), SecurityConfig::default());
        assert!(matches!(result, Err(XlsxStreamError::Zip(_))));
    }
}
