//! Date Conversion Module
//!
//! Excelのシリアル日付値（エポックからの経過日数）と日時の相互変換を提供します。
//!
//! # エポックシステム
//!
//! - 1900年システム（デフォルト）: 起点は1899年12月30日
//!   - Excelの1900年うるう年バグ（存在しない1900年2月29日をシリアル値60とする）を再現
//!   - シリアル値1 = 1900-01-01、シリアル値59 = 1900-02-28、シリアル値61 = 1900-03-01
//!   - シリアル値60（1900-02-29）は表現できないため1900-02-28として扱う
//! - 1904年システム: 起点は1904年1月1日
//!   - シリアル値0 = 1904-01-01

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::XlsxStreamError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 受け付けるシリアル値の上限（1900年システムで10000-01-01）
const MAX_SERIAL: f64 = 2_958_466.0;

/// 1900年システムで1900-03-01に対応するシリアル値
const FIRST_SERIAL_AFTER_LEAP_BUG: i64 = 61;

/// シリアル値から日時へ変換
///
/// 整数部はエポックからの日数、小数部は24時間に対する時刻の割合です。
/// 結果は秒単位に丸められます。
///
/// # 戻り値
///
/// * `Ok(NaiveDateTime)` - 変換された日時
/// * `Err(XlsxStreamError::Format)` - 負の値、非有限値、または表現可能範囲外の場合
pub fn serial_to_datetime(serial: f64, is_1904: bool) -> Result<NaiveDateTime, XlsxStreamError> {
    if !serial.is_finite() || !(0.0..MAX_SERIAL).contains(&serial) {
        return Err(XlsxStreamError::Format(format!(
            "Date serial out of range: {}",
            serial
        )));
    }

    let total_seconds = (serial * SECONDS_PER_DAY).round() as i64;
    let days = total_seconds.div_euclid(86_400);

    let epoch = if is_1904 {
        ymd(1904, 1, 1)?
    } else if days < 60 {
        // うるう年バグ以前の日付は1日ずれる
        ymd(1899, 12, 31)?
    } else {
        ymd(1899, 12, 30)?
    };

    let offset = Duration::try_seconds(total_seconds).ok_or_else(|| {
        XlsxStreamError::Format(format!("Date serial out of range: {}", serial))
    })?;

    epoch.checked_add_signed(offset).ok_or_else(|| {
        XlsxStreamError::Format(format!(
            "Date calculation overflow: serial_value={}, is_1904={}",
            serial, is_1904
        ))
    })
}

/// 日時からシリアル値へ変換（`serial_to_datetime`の逆変換）
///
/// 1900年システムでは、1900-03-01より前の日付に対してうるう年バグ分を差し引きます。
pub fn serial_from_datetime(datetime: NaiveDateTime, is_1904: bool) -> f64 {
    let (epoch, shift) = if is_1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1), 0)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30), 1)
    };
    let Some(epoch) = epoch.and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return 0.0;
    };

    let elapsed = datetime.signed_duration_since(epoch);
    let mut seconds = elapsed.num_seconds();
    if shift != 0 && elapsed.num_days() < FIRST_SERIAL_AFTER_LEAP_BUG {
        seconds -= 86_400;
    }
    seconds as f64 / SECONDS_PER_DAY
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDateTime, XlsxStreamError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| XlsxStreamError::Config("Invalid epoch date".to_string()))
}
