//! HTML report rendering.
//!
//! Produces a self-contained page: inline CSS, the four report tables and,
//! when requested, the input documents embedded as JSON script tags.

use super::table::Table;
use super::Report;
use crate::format::Sign;
use crate::models::ReportMetadata;

/// Render the complete HTML document.
pub fn render_html(report: &Report) -> String {
    let tables: String = report.tables.iter().map(render_table).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <h1>{title}</h1>
{toc}{metadata}{tables}{data}</body>
</html>
"#,
        title = esc(&report.metadata.title),
        css = inline_css(),
        toc = render_toc(report),
        metadata = render_metadata(&report.metadata),
        tables = tables,
        data = render_embedded(report),
    )
}

fn render_toc(report: &Report) -> String {
    let mut toc = String::from("    <nav id=\"TOC\">\n        <ul>\n");
    for table in report.tables.iter() {
        toc.push_str(&format!(
            "            <li><a href=\"#{}\">{}</a></li>\n",
            esc(&table.id),
            esc(&table.title)
        ));
    }
    toc.push_str("        </ul>\n    </nav>\n");
    toc
}

fn render_metadata(metadata: &ReportMetadata) -> String {
    format!(
        r#"    <ul class="metadata">
        <li>Generated: {date}</li>
        <li>Services: {services}</li>
        <li>Parcels selected: {selected} of {total}</li>
        <li>Municipalities tracked: {munis}</li>
    </ul>
"#,
        date = metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        services = esc(&metadata.services.join(", ")),
        selected = metadata.parcels_selected,
        total = metadata.parcels_total,
        munis = metadata.municipalities_tracked,
    )
}

/// Render one table with its header, data rows and footer rows.
pub fn render_table(table: &Table) -> String {
    let mut html = String::new();

    html.push_str(&format!("    <h2 id=\"{}\">{}</h2>\n", esc(&table.id), esc(&table.title)));
    html.push_str(&format!("    <table id=\"{}\">\n", esc(&table.id)));

    html.push_str("        <thead><tr>");
    for column in &table.columns {
        let class = if !column.class.is_empty() {
            column.class.as_str()
        } else if column.centered {
            "tdcenter"
        } else {
            ""
        };
        if class.is_empty() {
            html.push_str(&format!("<th>{}</th>", esc(&column.label)));
        } else {
            html.push_str(&format!(
                "<th class=\"{}\">{}</th>",
                esc(class),
                esc(&column.label)
            ));
        }
    }
    html.push_str("</tr></thead>\n        <tbody>\n");

    for row in &table.rows {
        html.push_str("            <tr>");
        for (i, cell) in row.cells.iter().enumerate() {
            let text = table.display(i, cell);
            let classes = cell_classes(table, i, table.sign(i, cell));
            if table.checkbox && i == 0 {
                let checked = if text == "1" { " checked" } else { "" };
                html.push_str(&format!(
                    "<td{}><input type=\"checkbox\" name=\"cb\" value=\"{}\"{}></td>",
                    classes,
                    esc(&text),
                    checked
                ));
            } else {
                html.push_str(&format!("<td{}>{}</td>", classes, esc(&text)));
            }
        }
        html.push_str("</tr>\n");
    }

    for row in &table.footer {
        html.push_str("            <tr class=\"totals\">");
        for (i, cell) in row.cells.iter().enumerate() {
            let classes = cell_classes(table, i, table.sign(i, cell));
            html.push_str(&format!("<td{}>{}</td>", classes, esc(&table.display(i, cell))));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("        </tbody>\n    </table>\n");
    html
}

fn cell_classes(table: &Table, column: usize, sign: Sign) -> String {
    let mut classes = Vec::new();
    if table.columns.get(column).map(|c| c.centered).unwrap_or(false) {
        classes.push("center");
    }
    if let Some(class) = sign.css_class() {
        classes.push(class);
    }

    if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", classes.join(" "))
    }
}

fn render_embedded(report: &Report) -> String {
    match report.embedded {
        Some(ref docs) => format!(
            concat!(
                "    <script type=\"application/json\" id=\"muni-data\">{}</script>\n",
                "    <script type=\"application/json\" id=\"impact-data\">{}</script>\n",
            ),
            escape_script(&docs.parcel_data),
            escape_script(&docs.muni_data)
        ),
        None => String::new(),
    }
}

/// Escape text for HTML.
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Keep embedded JSON from closing its script element.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn inline_css() -> &'static str {
    r#"
body { font-family: sans-serif; margin: 2em; color: #222; }
table { border-collapse: collapse; margin-bottom: 2em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }
th { background: #f0f0f0; }
td.center, th.tdcenter { text-align: center; }
tr.totals td { font-weight: bold; border-top: 2px solid #888; }
td.negative { color: #b00020; }
td.positive { color: #1b6e20; }
ul.metadata { list-style: none; padding: 0; }
"#
}
