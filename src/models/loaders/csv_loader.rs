use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::InputError;
use crate::models::item::Item;

/// 从 CSV 文件加载全部证书
///
/// 表头需要包含 `id, download_link, verification_link, name`，多余的列会被忽略。
pub fn load_items(csv_file_path: &Path) -> Result<Vec<Item>, InputError> {
    let reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(csv_file_path)
        .map_err(|source| InputError::ReadFailed {
            path: csv_file_path.to_path_buf(),
            source,
        })?;

    let items = read_rows(reader)?;
    tracing::info!(
        "成功加载 {} 条证书记录: {}",
        items.len(),
        csv_file_path.display()
    );
    Ok(items)
}

/// 从任意输入流加载证书
pub fn load_items_from_reader<R: Read>(input: R) -> Result<Vec<Item>, InputError> {
    let reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);
    read_rows(reader)
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Item>, InputError> {
    let mut items = Vec::new();
    for (index, row) in reader.deserialize::<Item>().enumerate() {
        // 第 1 行是表头
        let row_number = index as u64 + 2;
        let item = row.map_err(|source| InputError::MalformedRow {
            row: source
                .position()
                .map(|p| p.line())
                .unwrap_or(row_number),
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}
