use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use llmctx_core::{GeneratedContext, PromptKey, PromptTemplate};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::commands::stats::StatsReport;

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data)
        .map_err(llmctx_core::AppError::JsonSerialize)?;
    write_to_stdout(&content)
}

fn readable_size(bytes: usize) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

fn category_table(categories: &indexmap::IndexMap<String, usize>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Category").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
    ]);
    for (category, count) in categories {
        table.add_row(vec![
            Cell::new(category),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_generation_summary(generated: &GeneratedContext, written: &Path, project_name: &str) {
    let stats = &generated.stats;
    println!(
        "{} Context saved to: {}",
        "✅".green(),
        written.display().to_string().blue()
    );
    println!();
    println!("{}", " Context Summary ".green().bold().underline());
    println!("{:<20} {}", "Project:".green(), project_name.cyan());
    println!(
        "{:<20} {}",
        "Format:".green(),
        generated.format.as_str().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        stats.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        stats.total_tokens.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        readable_size(stats.total_size).cyan()
    );
    if !stats.categories.is_empty() {
        println!("\n{}", category_table(&stats.categories));
    }
}

pub fn print_stats_table(report: &StatsReport) -> Result<()> {
    println!();
    println!("{}", " Project Stats ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        report.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        report.total_tokens.to_string().cyan()
    );
    if let Some(exact) = report.exact_tokens {
        println!(
            "{:<20} {}",
            "cl100k Tokens:".green(),
            exact.to_string().cyan()
        );
    }
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        report.total_size_readable.cyan()
    );

    println!("\n{}", " File Details ".green().bold().underline());
    let show_exact = report.exact_tokens.is_some();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Category").fg(Color::Green),
        Cell::new("Priority").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Est. Tokens").fg(Color::Green),
    ];
    if show_exact {
        header.push(Cell::new("cl100k").fg(Color::Green));
    }
    table.set_header(header);

    for file in &report.files {
        let mut row = vec![
            Cell::new(&file.path),
            Cell::new(&file.category),
            Cell::new(file.priority).set_alignment(CellAlignment::Right),
            Cell::new(&file.size_readable).set_alignment(CellAlignment::Right),
            Cell::new(file.tokens).set_alignment(CellAlignment::Right),
        ];
        if let Some(exact) = file.exact_tokens {
            row.push(Cell::new(exact).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }
    println!("{table}");

    println!("\n{}", " Categories ".green().bold().underline());
    println!("{}", category_table(&report.categories));
    Ok(())
}

pub fn print_prompt_list<'a, I>(entries: I)
where
    I: IntoIterator<Item = (PromptKey, &'a PromptTemplate)>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Key").fg(Color::Green),
        Cell::new("Title").fg(Color::Green),
        Cell::new("Description").fg(Color::Green),
    ]);
    for (key, template) in entries {
        table.add_row(vec![
            Cell::new(key.as_str()).fg(Color::Cyan),
            Cell::new(&template.title),
            Cell::new(&template.description),
        ]);
    }
    println!("{table}");
}
