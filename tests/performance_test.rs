//! パフォーマンステスト
//!
//! 大きなワークシートを1行ずつ読み込む際の処理速度を検証するテストを提供します。
//! ワークブックはテスト内でメモリ上に生成するため、外部フィクスチャは不要です。
//!
//! 注意: メモリ使用量の正確な測定には、valgrindやheaptrackなどの外部ツールが必要です。

use rust_xlsxwriter::Workbook;
use std::io::Cursor;
use std::ops::ControlFlow;
use xlsxstream::{ReaderBuilder, Row};

/// 行数×列数の数値・文字列混在ワークブックを生成
fn generate_workbook(rows: u32, cols: u16) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for row in 0..rows {
        for col in 0..cols {
            if col % 2 == 0 {
                worksheet
                    .write_number(row, col, f64::from(row) + f64::from(col) / 10.0)
                    .unwrap();
            } else {
                worksheet
                    .write_string(row, col, format!("r{}c{}", row, col))
                    .unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// 大きなワークシートの読み込み速度
///
/// 20万行×10列を10秒以内に読み込むことを確認します。
#[test]
#[ignore] // 手動実行用（時間がかかる）
fn test_large_sheet_processing_speed() {
    let data = generate_workbook(200_000, 10);
    let reader = ReaderBuilder::new().build().unwrap();

    let start = std::time::Instant::now();
    let mut count = 0usize;
    for row in reader.open_reader(Cursor::new(&data)).unwrap() {
        let row = row.unwrap();
        assert_eq!(row.len(), 10);
        count += 1;
    }
    let duration = start.elapsed();

    println!("Read {} rows in {:?}", count, duration);
    println!(
        "Throughput: {:.0} rows/second",
        count as f64 / duration.as_secs_f64()
    );

    assert_eq!(count, 200_000);
    assert!(
        duration.as_secs() < 10,
        "Reading took too long: {:?} (target: < 10 seconds)",
        duration
    );
}

/// 先頭行だけを読む場合は全行を組み立てない
///
/// 先頭100行で打ち切った場合、全件読み込みより十分に短い時間で終わることを確認します。
#[test]
#[ignore] // 手動実行用
fn test_early_stop_is_cheap() {
    let data = generate_workbook(100_000, 4);
    let reader = ReaderBuilder::new().build().unwrap();

    let start = std::time::Instant::now();
    let full = reader.open_reader(Cursor::new(&data)).unwrap().count();
    let full_duration = start.elapsed();

    let start = std::time::Instant::now();
    let mut seen = 0usize;
    reader
        .for_each_row_from_reader(Cursor::new(&data), |_row: Row| {
            seen += 1;
            if seen == 100 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    let partial_duration = start.elapsed();

    println!(
        "Full: {} rows in {:?}, partial: {} rows in {:?}",
        full, full_duration, seen, partial_duration
    );

    assert_eq!(seen, 100);
    assert!(partial_duration < full_duration);
}
