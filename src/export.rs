use crate::normalizer::value_to_text;
use crate::table::LogTable;
use serde_json::Value;
use std::io::{self, Write};

/// Write a table as comma-separated UTF-8 text with a header row.
pub fn write_csv<W: Write>(table: &LogTable, mut w: W) -> io::Result<()> {
    write_record(&mut w, table.columns().iter().map(String::as_str))?;
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        write_record(&mut w, cells.iter().map(String::as_str))?;
    }
    w.flush()
}

pub fn to_csv_string(table: &LogTable) -> String {
    let mut buf = Vec::new();
    write_csv(table, &mut buf).expect("writing to a Vec");
    String::from_utf8_lossy(&buf).into_owned()
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        other => value_to_text(other),
    }
}

fn write_record<'a, W: Write>(w: &mut W, cells: impl Iterator<Item = &'a str>) -> io::Result<()> {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if cell.contains([',', '"', '\r', '\n']) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_only_when_needed() {
        let mut t = LogTable::new(["a", "b"]);
        t.push_row(vec![json!("plain"), json!("has, comma and \"quote\"")]);
        t.push_row(vec![json!(3), Value::Null]);
        assert_eq!(to_csv_string(&t), "a,b\nplain,\"has, comma and \"\"quote\"\"\"\n3,\n");
    }
}
