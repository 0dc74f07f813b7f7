//! Format listings, usage, file details and validation results as text.

use crate::disk::DiskUsage;
use crate::engine::{BatchReport, InvariantReport};
use crate::snapshot::RepairReport;
use crate::types::BlockIndex;
use crate::views::{BlockState, FileDetails};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Blocks per row in the block map grid.
const BLOCK_MAP_WIDTH: usize = 50;

/// One row of `ls`.
#[derive(Debug, Clone, Serialize)]
pub struct ListingEntry {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub size: u64,
    pub method: Option<String>,
    pub blocks: usize,
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_listing(path: &str, entries: &[ListingEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(path)));
    if entries.is_empty() {
        out.push_str("(empty folder)\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "Size", "Method", "Blocks", "Id"]);
    for entry in entries {
        let name = if entry.kind == "folder" {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        table.add_row(vec![
            name,
            entry.kind.to_string(),
            format_size(entry.size),
            entry.method.clone().unwrap_or_else(|| "-".to_string()),
            entry.blocks.to_string(),
            entry.id.get(..7).unwrap_or(&entry.id).to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// Used, free and percent, with a warning once the disk is nearly full.
pub fn format_usage(usage: &DiskUsage, block_size: u32) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Disk Usage")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Used", "Free", "Total", "Block size", "Usage"]);
    table.add_row(vec![
        usage.used.to_string(),
        usage.free.to_string(),
        usage.total.to_string(),
        format_size(u64::from(block_size)),
        format!("{:.1}%", usage.percent),
    ]);
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!("  {}\n", usage_bar(usage.percent, 40)));
    if usage.is_nearly_full() {
        out.push_str(&format!(
            "\n{}\n",
            "Warning: disk is over 90% full".yellow().bold()
        ));
    }
    out
}

fn usage_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn format_file_details(
    details: &FileDetails,
    block_map: &[BlockState],
    chain: Option<&[(BlockIndex, Option<BlockIndex>)]>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&details.path)));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.add_row(vec!["Id".to_string(), details.id.to_hex()]);
    table.add_row(vec!["Size".to_string(), format_size(details.size)]);
    let extension = if details.extension.is_empty() {
        "-".to_string()
    } else {
        details.extension.clone()
    };
    table.add_row(vec!["Extension".to_string(), extension]);
    table.add_row(vec![
        "Text".to_string(),
        if details.is_text { "yes" } else { "no" }.to_string(),
    ]);
    table.add_row(vec![
        "Allocation".to_string(),
        details.allocation_method.to_string(),
    ]);
    table.add_row(vec!["Blocks".to_string(), format_block_list(&details.blocks)]);
    if let Some(index) = details.index_block {
        table.add_row(vec!["Index block".to_string(), index.to_string()]);
    }
    if let Some(next) = details.next_block {
        table.add_row(vec!["First block".to_string(), next.to_string()]);
    }
    table.add_row(vec![
        "Created".to_string(),
        details.created_at.to_rfc3339(),
    ]);
    table.add_row(vec![
        "Modified".to_string(),
        details.modified_at.to_rfc3339(),
    ]);
    out.push_str(&format!("{}\n\n", table));

    if let Some(chain) = chain {
        out.push_str(&format!("{}\n\n", format_section_heading("Chain")));
        let links: Vec<String> = chain
            .iter()
            .map(|(block, next)| match next {
                Some(next) => format!("{} -> {}", block, next),
                None => format!("{} -> end", block),
            })
            .collect();
        out.push_str(&format!("  {}\n\n", links.join(", ")));
    }

    out.push_str(&format!("{}\n\n", format_section_heading("Block Map")));
    out.push_str(&format_block_map(block_map));
    out.push_str("\n  # file data   I index   x other file   . free\n");
    out
}

/// Grid of block states, one character per block.
pub fn format_block_map(block_map: &[BlockState]) -> String {
    let mut out = String::new();
    for (row, chunk) in block_map.chunks(BLOCK_MAP_WIDTH).enumerate() {
        out.push_str(&format!("  {:>5} ", row * BLOCK_MAP_WIDTH));
        for state in chunk {
            let cell = match state {
                BlockState::FileData => format!("{}", "#".green()),
                BlockState::Index => format!("{}", "I".cyan()),
                BlockState::OtherUsed => format!("{}", "x".red()),
                BlockState::Free => ".".to_string(),
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

fn format_block_list(blocks: &[BlockIndex]) -> String {
    if blocks.is_empty() {
        return "-".to_string();
    }
    let contiguous = blocks.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]));
    if contiguous && blocks.len() > 2 {
        return format!("{}..={} ({})", blocks[0], blocks[blocks.len() - 1], blocks.len());
    }
    let shown: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
    format!("{} ({})", shown.join(", "), blocks.len())
}

pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_validation(report: &InvariantReport, repair: Option<&RepairReport>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Validation")));
    out.push_str(&format!("  Nodes: {}\n", report.node_count));
    out.push_str(&format!("  Files: {}\n", report.file_count));
    out.push_str(&format!("  Used blocks: {}\n\n", report.used_blocks));
    if let Some(repair) = repair {
        if repair.is_clean() {
            out.push_str("  No repairs needed.\n\n");
        } else {
            out.push_str(&format!("{}\n\n", format_section_heading("Repairs")));
            for action in &repair.actions {
                out.push_str(&format!("  - {}\n", action));
            }
            out.push('\n');
        }
    }
    if report.is_valid() {
        out.push_str(&format!("{}\n", "State is valid".green()));
    } else {
        out.push_str(&format!(
            "{}\n",
            format!("{} violation(s)", report.errors.len()).red()
        ));
        for error in &report.errors {
            out.push_str(&format!("  - {}\n", error));
        }
    }
    out
}

pub fn format_batch_report(report: &BatchReport, names: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Import")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["File", "Result"]);
    let name_of = |index: usize| names.get(index).cloned().unwrap_or_else(|| index.to_string());
    for (index, id) in &report.accepted {
        let result = id
            .map(|id| format!("created {}", id.short()))
            .unwrap_or_else(|| "created".to_string());
        table.add_row(vec![name_of(*index), result]);
    }
    for (index, error) in &report.rejected {
        table.add_row(vec![name_of(*index), format!("rejected: {}", error)]);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!(
        "  {} created, {} rejected\n",
        report.accepted.len(),
        report.rejected.len()
    ));
    out
}
