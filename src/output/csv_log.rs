//! Append-only CSV observation log
//!
//! The CSV is the human-facing artifact of a run: one row per colorway
//! observation, stable column order. On open, an existing file whose header
//! does not match the expected columns is rotated to a timestamped backup so
//! consumers never see mixed schemas in one file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use super::traits::{RowSink, SinkResult};
use crate::row::AggregatedRow;

/// Column order for the observation log. Changing this rotates existing
/// files on the next run.
pub const HEADER: [&str; 19] = [
    "crawl_ts",
    "locale",
    "category_path",
    "name",
    "sku",
    "product_url",
    "color",
    "list_price",
    "sale_price",
    "discount",
    "image_url",
    "inventory_amount",
    "size_quantities",
    "sizes_all",
    "sizes_in_stock",
    "sizes_out_of_stock",
    "num_sizes_in_stock",
    "hash_key",
    "source",
];

/// CSV-backed [`RowSink`].
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    /// Opens the log at `path`, rotating an incompatible existing file and
    /// writing the header when the file is new.
    pub fn open(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref().to_path_buf();
        rotate_if_incompatible(&path)?;
        if !path.exists() {
            let mut file = File::create(&path)?;
            writeln!(file, "{}", HEADER.join(","))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvLog {
    fn append(&mut self, rows: &[AggregatedRow]) -> SinkResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        for row in rows {
            writeln!(file, "{}", encode_row(row))?;
        }
        file.flush()?;
        Ok(())
    }
}

fn rotate_if_incompatible(path: &Path) -> SinkResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let first_line = {
        let mut reader = BufReader::new(File::open(path)?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        line
    };
    let current: Vec<&str> = first_line.trim().split(',').map(str::trim).collect();
    if current == HEADER {
        return Ok(());
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup = PathBuf::from(format!("{}.bak_{}", path.display(), stamp));
    std::fs::rename(path, &backup)?;
    tracing::info!(backup = %backup.display(), "rotated observation log with stale header");
    Ok(())
}

fn encode_row(row: &AggregatedRow) -> String {
    let inventory = row
        .inventory_amount
        .map(|v| v.to_string())
        .unwrap_or_default();
    let fields = [
        row.crawl_ts.as_str(),
        row.locale.as_str(),
        row.category_path.as_deref().unwrap_or(""),
        row.name.as_deref().unwrap_or(""),
        row.sku.as_deref().unwrap_or(""),
        row.product_url.as_str(),
        row.color.as_str(),
        row.list_price.as_deref().unwrap_or(""),
        row.sale_price.as_deref().unwrap_or(""),
        row.discount.as_deref().unwrap_or(""),
        row.image_url.as_deref().unwrap_or(""),
        inventory.as_str(),
        row.size_quantities.as_deref().unwrap_or(""),
        row.sizes_all.as_str(),
        row.sizes_in_stock.as_str(),
        row.sizes_out_of_stock.as_str(),
    ];
    let mut encoded: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    encoded.push(row.num_sizes_in_stock.to_string());
    encoded.push(escape_field(&row.hash_key));
    encoded.push(escape_field(&row.source));
    encoded.join(",")
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_row() -> AggregatedRow {
        AggregatedRow {
            crawl_ts: "2026-08-29T12:00:00+00:00".into(),
            locale: "us-en".into(),
            category_path: Some("Home / Men's / Jackets".into()),
            name: Some("Alpha Jacket, Gore-Tex".into()),
            sku: Some("ALPHA-1".into()),
            product_url: "https://shop.example.com/shop/alpha".into(),
            color: "Black Sapphire".into(),
            list_price: Some("$ 250.00".into()),
            sale_price: Some("$ 175.00".into()),
            discount: Some("30%".into()),
            image_url: None,
            inventory_amount: Some(3),
            size_quantities: Some("{\"S\":3}".into()),
            sizes_all: "M,S".into(),
            sizes_in_stock: "S".into(),
            sizes_out_of_stock: "M".into(),
            num_sizes_in_stock: 1,
            hash_key: "abc123".into(),
            source: "arcteryx-outlet".into(),
        }
    }

    #[test]
    fn escapes_commas_and_quotes() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn new_log_starts_with_header_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let mut log = CsvLog::open(&path).unwrap();
        log.append(&[sample_row()]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Alpha Jacket, Gore-Tex\""));
        assert!(row.contains("\"{\"\"S\"\":3}\""));
        assert!(row.contains("$ 175.00"));
    }

    #[test]
    fn matching_header_is_not_rotated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        {
            let mut log = CsvLog::open(&path).unwrap();
            log.append(&[sample_row()]).unwrap();
        }
        let mut log = CsvLog::open(&path).unwrap();
        log.append(&[sample_row()]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn stale_header_rotates_to_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "old,columns\n1,2\n").unwrap();

        let mut log = CsvLog::open(&path).unwrap();
        log.append(&[sample_row()]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("crawl_ts,"));
        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".bak_"))
            .collect();
        assert_eq!(backups.len(), 1);
        let backed_up = std::fs::read_to_string(backups[0].path()).unwrap();
        assert!(backed_up.starts_with("old,columns"));
    }
}
