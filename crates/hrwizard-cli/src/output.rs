use hrwizard_core::gating::Progress;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

pub fn mark(flag: bool) -> String {
    if flag { "yes" } else { "-" }.to_string()
}

/// `[#####.....] 3/6 (50%)`
pub fn progress_bar(progress: Progress) -> String {
    const WIDTH: usize = 20;
    let filled = if progress.total == 0 {
        0
    } else {
        progress.completed * WIDTH / progress.total
    };
    format!(
        "[{}{}] {}/{} ({}%)",
        "#".repeat(filled),
        ".".repeat(WIDTH - filled),
        progress.completed,
        progress.total,
        progress.percent()
    )
}
