use colored::Colorize;

/// Format a points balance with color: green when positive, red when negative
pub fn format_points(points: i64) -> String {
    let text = format!("{} pts", points);
    if points > 0 {
        text.green().to_string()
    } else if points < 0 {
        text.red().to_string()
    } else {
        text
    }
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_flag(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", table_row(columns, widths));
}

fn table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut row = String::new();
    for (col, width) in columns.iter().zip(widths) {
        row.push_str(&format!("{:<width$}  ", col, width = width));
    }
    row.trim_end().to_string()
}
