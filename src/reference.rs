//! Cell Reference Module
//!
//! 列文字（`A`, `Z`, `AA`, ...）と1始まりの列インデックスの相互変換。
//! 列文字は「ゼロのない26進数」（bijective base-26）として扱います。

use crate::error::XlsxStreamError;

/// Excelの最大列数（`XFD`）
pub const MAX_COLUMN: u32 = 16_384;

/// 列文字を1始まりの列インデックスに変換
///
/// `A`→1, `Z`→26, `AA`→27, `AZ`→52, `BA`→53。
///
/// # 戻り値
///
/// * `Ok(u32)` - 列インデックス（1始まり）
/// * `Err(XlsxStreamError::InvalidReference)` - 空文字列、`A`-`Z`以外の文字を含む、
///   または`u32`に収まらない場合
pub fn letters_to_index(letters: &str) -> Result<u32, XlsxStreamError> {
    if letters.is_empty() {
        return Err(XlsxStreamError::InvalidReference(letters.to_string()));
    }

    letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_uppercase() {
            return Err(XlsxStreamError::InvalidReference(letters.to_string()));
        }
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(u32::from(b - b'A') + 1))
            .ok_or_else(|| XlsxStreamError::InvalidReference(letters.to_string()))
    })
}

/// 1始まりの列インデックスを列文字に変換（`letters_to_index`の逆変換）
///
/// 0は対応する列文字がないため`None`を返します。
pub fn index_to_letters(index: u32) -> Option<String> {
    if index == 0 {
        return None;
    }

    let mut result = Vec::new();
    let mut n = index;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    result.reverse();
    String::from_utf8(result).ok()
}

/// セル参照を列文字と行番号に分割（例: `"AB12"` -> `("AB", Some(12))`）
///
/// 末尾の数字列を取り除いた残りを列文字として返します。
/// 行番号がない場合（`"AB"`）は`None`です。列文字部分の検証は行いません。
pub fn split_reference(reference: &str) -> (&str, Option<u32>) {
    let letters = reference.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &reference[letters.len()..];
    (letters, digits.parse().ok())
}

/// セル参照（例: `"J5"`）から1始まりの列インデックスを取得
pub fn column_of(reference: &str) -> Result<u32, XlsxStreamError> {
    let (letters, _) = split_reference(reference);
    letters_to_index(letters)
        .map_err(|_| XlsxStreamError::InvalidReference(reference.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_to_index_known_values() {
        assert_eq!(letters_to_index("A").unwrap(), 1);
        assert_eq!(letters_to_index("Z").unwrap(), 26);
        assert_eq!(letters_to_index("AA").unwrap(), 27);
        assert_eq!(letters_to_index("AZ").unwrap(), 52);
        assert_eq!(letters_to_index("BA").unwrap(), 53);
        assert_eq!(letters_to_index("XFD").unwrap(), MAX_COLUMN);
    }

    #[test]
    fn test_letters_to_index_rejects_invalid() {
        assert!(letters_to_index("").is_err());
        assert!(letters_to_index("a").is_err());
        assert!(letters_to_index("A1").is_err());
        assert!(letters_to_index("Ä").is_err());
        assert!(letters_to_index("A-B").is_err());
        // u32に収まらない長さ
        assert!(letters_to_index("ZZZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_index_to_letters() {
        assert_eq!(index_to_letters(0), None);
        assert_eq!(index_to_letters(1).as_deref(), Some("A"));
        assert_eq!(index_to_letters(26).as_deref(), Some("Z"));
        assert_eq!(index_to_letters(27).as_deref(), Some("AA"));
        assert_eq!(index_to_letters(52).as_deref(), Some("AZ"));
        assert_eq!(index_to_letters(53).as_deref(), Some("BA"));
        assert_eq!(index_to_letters(MAX_COLUMN).as_deref(), Some("XFD"));
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("AB12"), ("AB", Some(12)));
        assert_eq!(split_reference("A1"), ("A", Some(1)));
        assert_eq!(split_reference("C"), ("C", None));
        assert_eq!(split_reference("12"), ("", Some(12)));
    }

    #[test]
    fn test_column_of() {
        assert_eq!(column_of("J5").unwrap(), 10);
        assert_eq!(column_of("A1048576").unwrap(), 1);
        match column_of("5") {
            Err(XlsxStreamError::InvalidReference(r)) => assert_eq!(r, "5"),
            other => panic!("Expected InvalidReference, got {:?}", other),
        }
        assert!(column_of("a1").is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_round_trip(index in 1u32..=100_000) {
                let letters = index_to_letters(index).unwrap();
                prop_assert_eq!(letters_to_index(&letters).unwrap(), index);
            }

            #[test]
            fn test_strictly_increasing_in_length_then_lexicographic_order(
                a in "[A-Z]{1,4}",
                b in "[A-Z]{1,4}"
            ) {
                let ia = letters_to_index(&a).unwrap();
                let ib = letters_to_index(&b).unwrap();
                let key_a = (a.len(), a.clone());
                let key_b = (b.len(), b.clone());
                prop_assert_eq!(key_a.cmp(&key_b), ia.cmp(&ib));
            }
        }
    }
}
