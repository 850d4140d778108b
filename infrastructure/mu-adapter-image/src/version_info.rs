//! VS_VERSIONINFO リソースの解析
//!
//! ブロックは `wLength, wValueLength, wType, szKey` の後に 4 バイト境界で
//! 値と子ブロックが続く。文字列表は Translation の先頭エントリに一致するものを優先し、
//! なければ最初の表を使う。

use mu_domain::model::VersionStrings;

const ROOT_KEY: &str = "VS_VERSION_INFO";
const HEADER_LEN: usize = 6;

struct Block<'a> {
    key: String,
    /// wType == 1（テキスト値）
    text: bool,
    value: &'a [u8],
    children: &'a [u8],
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// 先頭ブロックを読み、(ブロック, 宣言長) を返す
fn parse_block(data: &[u8]) -> Option<(Block<'_>, usize)> {
    let declared = read_u16(data, 0)? as usize;
    if declared < HEADER_LEN {
        return None;
    }
    let len = declared.min(data.len());
    let value_len = read_u16(data, 2)? as usize;
    let text = read_u16(data, 4)? == 1;

    let mut key_units = Vec::new();
    let mut pos = HEADER_LEN;
    loop {
        let unit = read_u16(&data[..len], pos)?;
        pos += 2;
        if unit == 0 {
            break;
        }
        key_units.push(unit);
    }
    let key = String::from_utf16_lossy(&key_units);

    let value_start = align4(pos).min(len);
    let value_bytes = if text { value_len * 2 } else { value_len };
    let value_end = (value_start + value_bytes).min(len);
    let children_start = align4(value_end).min(len);

    Some((
        Block {
            key,
            text,
            value: &data[value_start..value_end],
            children: &data[children_start..len],
        },
        declared,
    ))
}

fn children(data: &[u8]) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let Some((block, declared)) = parse_block(&data[offset..]) else {
            break;
        };
        blocks.push(block);
        offset += align4(declared);
    }
    blocks
}

fn text_value(block: &Block<'_>) -> String {
    let units: Vec<u16> = block
        .value
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Translation の先頭 (言語, コードページ) を `040904b0` 形式で
fn first_translation(var_file_info: &Block<'_>) -> Option<String> {
    let translation = children(var_file_info.children)
        .into_iter()
        .find(|b| b.key == "Translation")?;
    let lang = read_u16(translation.value, 0)?;
    let codepage = read_u16(translation.value, 2)?;
    Some(format!("{:04x}{:04x}", lang, codepage))
}

/// バージョン情報ブロックから製品名・製品バージョン・著作権表示を取り出す
pub fn parse_version_strings(data: &[u8]) -> Option<VersionStrings> {
    let (root, _) = parse_block(data)?;
    if root.key != ROOT_KEY {
        return None;
    }

    let sections = children(root.children);
    let preferred = sections
        .iter()
        .find(|b| b.key == "VarFileInfo")
        .and_then(first_translation);
    let tables = sections
        .iter()
        .find(|b| b.key == "StringFileInfo")
        .map(|b| children(b.children))
        .unwrap_or_default();

    let table = preferred
        .and_then(|code| tables.iter().find(|t| t.key.eq_ignore_ascii_case(&code)))
        .or_else(|| tables.first());
    let Some(table) = table else {
        return Some(VersionStrings::default());
    };

    let mut strings = VersionStrings::default();
    for entry in children(table.children) {
        let value = if entry.text || !entry.value.is_empty() {
            Some(text_value(&entry))
        } else {
            None
        };
        match entry.key.as_str() {
            "ProductName" => strings.product_name = value,
            "ProductVersion" => strings.product_version = value,
            "LegalCopyright" => strings.legal_copyright = value,
            _ => {}
        }
    }
    Some(strings)
}
