use crate::table::{LogTable, DEFAULT_TEXT_COLUMN};

pub const SAMPLE_LINES: [&str; 8] = [
    "2023-01-01 10:00:00 Error: Connection failed",
    "2023-01-01 10:01:00 Error: Connection failed",
    "2023-01-01 10:02:00 Info: User logged in",
    "2023-01-01 10:03:00 Warning: Disk space low",
    "2023-01-01 10:04:00 Error: Connection failed at 192.168.1.1",
    "2023-01-01 10:05:00 Error: Connection failed at 192.168.1.2",
    "2023-01-01 10:06:00 Info: User logged out",
    "2023-01-01 10:07:00 Warning: Disk space low on /dev/sda1",
];

/// Small demo corpus with a single `Log Message` column.
pub fn sample_table() -> LogTable {
    LogTable::from_lines(DEFAULT_TEXT_COLUMN, &SAMPLE_LINES)
}
