//! Security Module
//!
//! ZIPパッケージを開く際の制限値とパス検証。
//! ZIP bomb攻撃とパストラバーサル攻撃への対策を提供します。

use std::fmt;
use std::io::{self, Read};

use crate::error::XlsxStreamError;

/// セキュリティ設定
///
/// パッケージ処理時の制限を定義します。`ReaderBuilder::with_security_config`で変更できます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の合計最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一パーツの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600, // 100MB
        }
    }
}

impl SecurityConfig {
    /// デフォルトのセキュリティ設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_decompressed_size(mut self, bytes: u64) -> Self {
        self.max_decompressed_size = bytes;
        self
    }

    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = count;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// 設定値の検証（0の制限値は拒否する）
    pub(crate) fn validate(&self) -> Result<(), XlsxStreamError> {
        if self.max_decompressed_size == 0 {
            return Err(XlsxStreamError::Config(
                "max_decompressed_size must be greater than 0".to_string(),
            ));
        }
        if self.max_file_count == 0 {
            return Err(XlsxStreamError::Config(
                "max_file_count must be greater than 0".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(XlsxStreamError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 単一パーツのサイズを検証
    pub(crate) fn check_part_size(&self, name: &str, size: u64) -> Result<(), XlsxStreamError> {
        if size > self.max_file_size {
            return Err(XlsxStreamError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, self.max_file_size
            )));
        }
        Ok(())
    }
}

/// ZIP内のファイルパスの検証
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(XlsxStreamError::SecurityViolation)` - 空、絶対パス、`..`、`\`を含む場合
pub(crate) fn validate_zip_path(path: &str) -> Result<(), XlsxStreamError> {
    let reason = if path.is_empty() {
        Some("Empty path is not allowed".to_string())
    } else if path.starts_with('/') || is_windows_drive_path(path) {
        Some(format!("Absolute path is not allowed: {}", path))
    } else if path.split('/').any(|segment| segment == "..") {
        Some(format!("Path traversal detected: {}", path))
    } else if path.contains('\\') {
        Some(format!("Backslash in path is not allowed: {}", path))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(XlsxStreamError::SecurityViolation(format!(
            "Invalid ZIP path: {}",
            reason
        ))),
        None => Ok(()),
    }
}

/// 展開済みバイト数が上限を超えたことを示す`io::Error`の中身
///
/// `XlsxStreamError`への変換時に`SecurityViolation`として取り出されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartSizeExceeded {
    pub name: String,
    pub limit: u64,
}

impl fmt::Display for PartSizeExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File '{}' exceeds maximum size while decompressing (max: {} bytes)",
            self.name, self.limit
        )
    }
}

impl std::error::Error for PartSizeExceeded {}

/// 読み出し量に上限を課すリーダー
///
/// 中央ディレクトリのサイズ表記を信用せず、実際に展開されたバイト数で制限します。
/// 上限を超えると`PartSizeExceeded`を含む`io::Error`を返します。
pub(crate) struct SizeLimited<R> {
    inner: R,
    name: String,
    limit: u64,
    consumed: u64,
}

impl<R: Read> SizeLimited<R> {
    pub fn new(inner: R, name: &str, limit: u64) -> Self {
        Self {
            inner,
            name: name.to_string(),
            limit,
            consumed: 0,
        }
    }
}

impl<R: Read> Read for SizeLimited<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // 上限ちょうどまで読んだ後も1バイトだけ先読みし、超過を検出する
        let allowed = (self.limit - self.consumed.min(self.limit)).saturating_add(1);
        let window = buf.len().min(usize::try_from(allowed).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..window])?;
        self.consumed += n as u64;
        if self.consumed > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                PartSizeExceeded {
                    name: self.name.clone(),
                    limit: self.limit,
                },
            ));
        }
        Ok(n)
    }
}

fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("[Content_Types].xml").is_ok());
        // ".."を部分文字列として含むだけのファイル名は許可
        assert!(validate_zip_path("xl/media/image..png").is_ok());
    }

    #[test]
    fn test_validate_zip_path_rejected() {
        assert!(validate_zip_path("").is_err());
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("d:/xl/workbook.xml").is_err());
        assert!(validate_zip_path("../etc/passwd").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }

    #[test]
    fn test_validate_zip_path_error_kind() {
        assert!(matches!(
            validate_zip_path("xl/.."),
            Err(XlsxStreamError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(SecurityConfig::default().validate().is_ok());
        assert!(SecurityConfig::new()
            .with_max_file_count(0)
            .validate()
            .is_err());
        assert!(SecurityConfig::new()
            .with_max_file_size(0)
            .validate()
            .is_err());
        assert!(SecurityConfig::new()
            .with_max_decompressed_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_size_limited_reader() {
        let mut content = Vec::new();
        SizeLimited::new(&b"0123456789"[..], "xl/a.xml", 10)
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content.len(), 10);

        let mut content = Vec::new();
        let err = SizeLimited::new(&b"0123456789A"[..], "xl/a.xml", 10)
            .read_to_end(&mut content)
            .unwrap_err();
        assert!(matches!(
            XlsxStreamError::from(err),
            XlsxStreamError::SecurityViolation(_)
        ));
    }

    #[test]
    fn test_check_part_size() {
        let config = SecurityConfig::new().with_max_file_size(10);
        assert!(config.check_part_size("xl/a.xml", 10).is_ok());
        assert!(matches!(
            config.check_part_size("xl/a.xml", 11),
            Err(XlsxStreamError::SecurityViolation(_))
        ));
    }
}
