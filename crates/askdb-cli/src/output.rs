//! Terminal rendering of answers

use askdb_ai::Answer;
use askdb_core::{QueryResult, Value};
use comfy_table::{Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

pub fn result_table(result: &QueryResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            result
                .column_names()
                .into_iter()
                .map(|name| Cell::new(name).fg(Color::Cyan)),
        );

    for row in &result.rows {
        table.add_row(row.values.iter().map(value_cell));
    }
    table
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::new("NULL").fg(Color::DarkGrey),
        other => Cell::new(other.to_string()),
    }
}

/// Question, generated SQL and either the result table or the failure
pub fn render_answer(answer: &Answer) -> String {
    let mut out = format!("Question: {}\nSQL:\n{}\n", answer.question, answer.sql);
    match &answer.outcome {
        Ok(result) if result.has_rows() => {
            out.push_str(&result_table(result).to_string());
            out.push_str(&format!("\n({} rows)\n", result.row_count()));
        }
        Ok(_) => out.push_str("(no rows)\n"),
        Err(e) => out.push_str(&format!("Query failed: {}\n", e)),
    }
    out
}
