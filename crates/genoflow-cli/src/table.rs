//! Plain-text tables for operator output.

/// Render `rows` under `headers` with columns padded to the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+", separator);

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!(" {:<width$} ", cell, width = width))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![separator.clone(), line(headers.to_vec()), separator.clone()];
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.push(separator);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_fit_the_widest_cell() {
        let table = render_table(
            &["User ID", "Valid"],
            &[vec!["u-000001".to_string(), "true".to_string()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+----------+-------+");
        assert_eq!(lines[1], "| User ID  | Valid |");
        assert_eq!(lines[3], "| u-000001 | true  |");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn empty_table_has_only_headers() {
        let table = render_table(&["A"], &[]);
        assert_eq!(table, "+---+\n| A |\n+---+\n+---+");
    }
}
